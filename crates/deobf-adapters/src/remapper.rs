//! Remapper de fuentes guiado por range map.
//!
//! Sólo reescribe spans resueltos del range map extraído de ese mismo
//! árbol. Un mapa que no corresponde byte a byte al árbol
//! (`StaleRangeMapUsage`) se rechaza antes de escribir nada.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use deobf_mapping::range::content_hash;
use deobf_mapping::{AccessTransformerSet, FileRanges, MappingTable, MemberTarget, RangeMap, Resolution, SymbolId,
                    SymbolKind};
use deobf_persistence::StagedDir;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bundle::{list_files, read_file, write_file};
use crate::error::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemapDirection {
    /// Intermedio -> legible.
    Dev,
    /// Legible -> intermedio.
    Retro,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenameRule {
    class: String,
    desc: Option<String>,
    to: String,
}

/// Renombres explícitos que prevalecen sobre la tabla (destinos de access
/// transformers con nombre nuevo).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapRules {
    renames: BTreeMap<String, Vec<RenameRule>>,
}

impl RemapRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ats(ats: &AccessTransformerSet) -> Self {
        let mut rules = Self::new();
        for at in ats.iter() {
            let Some(to) = &at.rename else {
                continue;
            };
            let (name, desc) = match &at.member {
                MemberTarget::Field(name) => (name.clone(), None),
                MemberTarget::Method { name, desc } => (name.clone(), Some(desc.clone())),
                _ => continue,
            };
            rules.renames.entry(name).or_default().push(RenameRule { class: at.class.clone(),
                                                                     desc,
                                                                     to: to.clone() });
        }
        rules
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn lookup(&self, symbol: &SymbolId) -> Option<&str> {
        if !matches!(symbol.kind, SymbolKind::Field | SymbolKind::Method) {
            return None;
        }
        self.renames
            .get(&symbol.name)?
            .iter()
            .find(|r| {
                symbol.owner.as_deref().map_or(true, |o| o == r.class)
                && (r.desc.is_some() == (symbol.kind == SymbolKind::Method))
                && match (&r.desc, &symbol.descriptor) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
            })
            .map(|r| r.to.as_str())
    }

    /// Agrega a una tabla legible -> intermedio las entradas inversas de los
    /// renombres, para que el retromapeo los reconozca.
    pub fn extend_retro_table(&self, table: &mut MappingTable) {
        for (from, rules) in &self.renames {
            for r in rules {
                match &r.desc {
                    Some(desc) => table.insert_method(&r.class, &r.to, desc, from),
                    None => table.insert_field(&r.class, &r.to, from),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapReport {
    pub files: usize,
    pub rewritten: usize,
    pub unresolved: usize,
    pub copied: usize,
}

pub struct SymbolRemapper<'a> {
    table: &'a MappingTable,
    rules: &'a RemapRules,
    direction: RemapDirection,
}

fn stale(file: &str, reason: impl Into<String>) -> AdapterError {
    AdapterError::StaleRangeMapUsage { file: file.to_string(),
                                       reason: reason.into() }
}

impl<'a> SymbolRemapper<'a> {
    pub fn new(table: &'a MappingTable, rules: &'a RemapRules, direction: RemapDirection) -> Self {
        Self { table,
               rules,
               direction }
    }

    fn target(&self, symbol: &SymbolId) -> Option<&str> {
        let rule = match self.direction {
            RemapDirection::Dev => self.rules.lookup(symbol),
            RemapDirection::Retro => None,
        };
        rule.or_else(|| self.table.lookup(symbol))
    }

    /// Reescribe un fichero. Devuelve el texto nuevo y el número de spans
    /// cambiados.
    pub fn remap_source(&self, path: &str, source: &str, ranges: &FileRanges) -> Result<(String, usize), AdapterError> {
        if content_hash(source.as_bytes()) != ranges.content_hash {
            return Err(stale(path, "content hash differs from the one the range map was extracted from"));
        }
        let mut out = source.to_string();
        let mut rewritten = 0;
        for record in ranges.records.iter().rev() {
            let span = record.span;
            if source.get(span.start..span.end) != Some(record.text.as_str()) {
                return Err(stale(path, format!("span {}..{} does not contain '{}'", span.start, span.end, record.text)));
            }
            let Resolution::Resolved { symbol } = &record.resolution else {
                continue;
            };
            if let Some(new) = self.target(symbol).filter(|n| *n != record.text) {
                out.replace_range(span.start..span.end, new);
                rewritten += 1;
            }
        }
        Ok((out, rewritten))
    }

    /// Remapea `tree` completo en `output` (staging + promoción). Los
    /// ficheros que no son `.java` se copian sin cambios.
    pub fn remap_tree(&self, tree: &Path, map: &RangeMap, output: &Path) -> Result<RemapReport, AdapterError> {
        let files = list_files(tree)?;
        let java: BTreeSet<&str> = files.iter()
                                        .map(|(rel, _)| rel.as_str())
                                        .filter(|rel| rel.ends_with(".java"))
                                        .collect();
        if let Some(missing) = map.files.keys().find(|k| !java.contains(k.as_str())) {
            return Err(stale(missing, "file listed in the range map is missing from the tree"));
        }

        let staged = StagedDir::new(output)?;
        let mut report = RemapReport::default();
        for (rel, path) in &files {
            if !rel.ends_with(".java") {
                write_file(staged.path(), rel, &read_file(path)?)?;
                report.copied += 1;
                continue;
            }
            let ranges = map.file(rel)
                            .ok_or_else(|| stale(rel, "file is not present in the range map"))?;
            let source = fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))?;
            let (text, rewritten) = self.remap_source(rel, &source, ranges)?;
            write_file(staged.path(), rel, text.as_bytes())?;
            report.files += 1;
            report.rewritten += rewritten;
            report.unresolved += ranges.records
                                       .iter()
                                       .filter(|r| matches!(r.resolution, Resolution::Unresolved { .. }))
                                       .count();
            debug!("remap {:?} file={rel} rewritten={rewritten}", self.direction);
        }
        staged.promote()?;
        info!("remapped {} files ({:?}) into {}: {} spans rewritten, {} unresolved left as-is",
              report.files,
              self.direction,
              output.display(),
              report.rewritten,
              report.unresolved);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use deobf_mapping::{RangeRecord, Span};

    use super::*;

    fn record(source: &str, needle: &str, symbol: SymbolId) -> RangeRecord {
        let start = source.find(needle).unwrap();
        RangeRecord { span: Span { start,
                                   end: start + needle.len(),
                                   line: 1,
                                   column: start as u32 + 1 },
                      text: needle.to_string(),
                      resolution: Resolution::Resolved { symbol } }
    }

    #[test]
    fn rewrites_resolved_spans_and_keeps_unmapped() {
        let source = "int field_1_a = func_2_b(p_3_1_) + other;";
        let mut map = RangeMap::new();
        map.insert_file("A.java",
                        source.as_bytes(),
                        vec![record(source, "field_1_a", SymbolId::field(None, "field_1_a")),
                             record(source, "func_2_b", SymbolId::method(None, "func_2_b", None)),
                             record(source, "p_3_1_", SymbolId::param("p_3_1_"))]);
        let mut table = MappingTable::new();
        table.insert_member("field_1_a", "count");
        table.insert_member("func_2_b", "compute");
        let rules = RemapRules::new();
        let (out, n) = SymbolRemapper::new(&table, &rules, RemapDirection::Dev).remap_source("A.java",
                                                                                         source,
                                                                                         map.file("A.java")
                                                                                            .unwrap())
                                                                           .unwrap();
        assert_eq!(out, "int count = compute(p_3_1_) + other;");
        assert_eq!(n, 2);
    }

    #[test]
    fn edited_source_is_stale() {
        let source = "int field_1_a;";
        let mut map = RangeMap::new();
        map.insert_file("A.java", source.as_bytes(), vec![record(source, "field_1_a", SymbolId::field(None, "field_1_a"))]);
        let table = MappingTable::new();
        let rules = RemapRules::new();
        let err = SymbolRemapper::new(&table, &rules, RemapDirection::Dev).remap_source("A.java",
                                                                                    "long field_1_a;",
                                                                                    map.file("A.java").unwrap())
                                                                      .unwrap_err();
        assert!(matches!(err, AdapterError::StaleRangeMapUsage { .. }));
    }

    #[test]
    fn at_renames_win_in_dev_and_feed_the_retro_table() {
        let ats = AccessTransformerSet::parse("public net.minecraft.Foo field_1_a exposed\n".as_bytes(), "x_at.cfg").unwrap();
        let rules = RemapRules::from_ats(&ats);
        assert_eq!(rules.lookup(&SymbolId::field(None, "field_1_a")), Some("exposed"));
        assert_eq!(rules.lookup(&SymbolId::field(Some("net/minecraft/Other"), "field_1_a")), None);
        assert_eq!(rules.lookup(&SymbolId::method(None, "field_1_a", None)), None);

        let mut retro = MappingTable::new();
        rules.extend_retro_table(&mut retro);
        assert_eq!(retro.map_field("net/minecraft/Foo", "exposed"), Some("field_1_a"));
    }
}
