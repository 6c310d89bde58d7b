//! Modelo del range map: por cada fichero de un árbol concreto, las
//! ocurrencias de símbolos con su span y su resolución.
//!
//! Un range map describe exactamente un árbol. Cada fichero guarda el hash del
//! contenido del que se extrajo; el remapper rechaza el mapa si el contenido
//! actual no coincide.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MappingError;
use crate::symbol::SymbolId;

/// Rango de bytes `[start, end)` dentro del fichero, con línea/columna
/// (1-based) del inicio para diagnósticos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
    Resolved { symbol: SymbolId },
    /// Varios candidatos posibles; la ocurrencia no se reescribe.
    Unresolved { candidates: Vec<SymbolId> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub span: Span,
    pub text: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRanges {
    pub content_hash: String,
    pub records: Vec<RangeRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeMap {
    /// Ruta relativa (con `/`) -> ocurrencias, en orden de ruta.
    pub files: BTreeMap<String, FileRanges>,
}

/// Hash sha256 hex de un contenido.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl RangeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(&mut self, path: &str, content: &[u8], mut records: Vec<RangeRecord>) {
        records.sort_by_key(|r| r.span);
        self.files.insert(path.to_string(),
                          FileRanges { content_hash: content_hash(content),
                                       records });
    }

    pub fn file(&self, path: &str) -> Option<&FileRanges> {
        self.files.get(path)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &RangeRecord)> {
        self.files
            .iter()
            .flat_map(|(p, f)| f.records.iter().map(move |r| (p.as_str(), r)))
    }

    pub fn resolved_count(&self) -> usize {
        self.records()
            .filter(|(_, r)| matches!(r.resolution, Resolution::Resolved { .. }))
            .count()
    }

    pub fn unresolved(&self) -> Vec<(&str, &RangeRecord)> {
        self.records()
            .filter(|(_, r)| matches!(r.resolution, Resolution::Unresolved { .. }))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, MappingError> {
        serde_json::to_string_pretty(self).map_err(|e| MappingError::RangeMap(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, MappingError> {
        serde_json::from_str(text).map_err(|e| MappingError::RangeMap(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), MappingError> {
        fs::write(path, self.to_json()?).map_err(|e| MappingError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let text = fs::read_to_string(path).map_err(|e| MappingError::io(path, e))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(content_hash(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn records_sorted_and_counted() {
        let mut map = RangeMap::new();
        let rec = |start, text: &str, res| RangeRecord { span: Span { start,
                                                                      end: start + text.len(),
                                                                      line: 1,
                                                                      column: start as u32 + 1 },
                                                         text: text.to_string(),
                                                         resolution: res };
        map.insert_file("a/Foo.java",
                        b"int field_1_a; void func_2_b() {}",
                        vec![rec(20, "func_2_b", Resolution::Unresolved { candidates: vec![] }),
                             rec(4, "field_1_a", Resolution::Resolved { symbol: SymbolId::field(None, "field_1_a") })]);
        let f = map.file("a/Foo.java").unwrap();
        assert_eq!(f.records[0].text, "field_1_a");
        assert_eq!(map.resolved_count(), 1);
        assert_eq!(map.unresolved().len(), 1);
        assert_eq!(f.content_hash, content_hash(b"int field_1_a; void func_2_b() {}"));
    }
}
