//! Diffs unificados: parser y aplicador con contexto estricto.
//!
//! Un hunk se aplica sólo si todas sus líneas de contexto y de borrado
//! coinciden exactamente; la posición puede desplazarse respecto a la
//! cabecera `@@` (offset), nunca el contenido (sin fuzz).

use std::fs;
use std::path::Path;

use log::debug;
use serde_json::{json, Value};

use crate::bundle::list_files;
use crate::error::AdapterError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Línea de inicio (1-based) en el fichero original.
    pub old_start: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    fn old_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
                HunkLine::Add(_) => None,
            })
            .collect()
    }

    fn new_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Add(s) => Some(s.as_str()),
                HunkLine::Remove(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Ruta relativa del fichero destino, con `/`.
    pub path: String,
    pub creates: bool,
    pub deletes: bool,
    pub hunks: Vec<Hunk>,
}

/// Fallo de aplicación de un hunk (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkFailure {
    pub hunk: usize,
    pub context: String,
}

fn parse_error(origin: &str, line: usize, message: impl Into<String>) -> AdapterError {
    AdapterError::PatchApplicationFailure { file: origin.to_string(),
                                            hunk: 0,
                                            context: format!("line {line}: {}", message.into()) }
}

fn strip_path(raw: &str) -> Option<&str> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix("a/").or_else(|| raw.strip_prefix("b/")).unwrap_or(raw))
}

fn parse_range(spec: &str) -> Option<(usize, usize)> {
    let spec = &spec[1..];
    match spec.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((spec.parse().ok()?, 1)),
    }
}

pub fn parse_unified_diff(text: &str, origin: &str) -> Result<Vec<FilePatch>, AdapterError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut patches = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(old) = lines[i].strip_prefix("--- ") else {
            i += 1;
            continue;
        };
        let new = lines.get(i + 1)
                       .and_then(|l| l.strip_prefix("+++ "))
                       .ok_or_else(|| parse_error(origin, i + 2, "expected '+++' after '---'"))?;
        let old_path = strip_path(old);
        let new_path = strip_path(new);
        let path = new_path.or(old_path)
                           .ok_or_else(|| parse_error(origin, i + 1, "both sides are /dev/null"))?;
        let mut patch = FilePatch { path: path.to_string(),
                                    creates: old_path.is_none(),
                                    deletes: new_path.is_none(),
                                    hunks: Vec::new() };
        i += 2;
        while i < lines.len() && lines[i].starts_with("@@") {
            let header: Vec<&str> = lines[i].split_whitespace().collect();
            let (old_start, mut old_len, mut new_len) = match header.as_slice() {
                [_, old, new, ..] if old.starts_with('-') && new.starts_with('+') => {
                    let (os, ol) = parse_range(old).ok_or_else(|| parse_error(origin, i + 1, "bad hunk range"))?;
                    let (_, nl) = parse_range(new).ok_or_else(|| parse_error(origin, i + 1, "bad hunk range"))?;
                    (os, ol, nl)
                }
                _ => return Err(parse_error(origin, i + 1, "bad hunk header")),
            };
            i += 1;
            let mut hunk = Hunk { old_start,
                                  lines: Vec::new() };
            while old_len > 0 || new_len > 0 {
                let Some(line) = lines.get(i) else {
                    return Err(parse_error(origin, i + 1, "hunk ends early"));
                };
                match line.chars().next() {
                    Some('+') => {
                        hunk.lines.push(HunkLine::Add(line[1..].to_string()));
                        new_len = new_len.saturating_sub(1);
                    }
                    Some('-') => {
                        hunk.lines.push(HunkLine::Remove(line[1..].to_string()));
                        old_len = old_len.saturating_sub(1);
                    }
                    Some(' ') | None => {
                        hunk.lines.push(HunkLine::Context(line.get(1..).unwrap_or("").to_string()));
                        old_len = old_len.saturating_sub(1);
                        new_len = new_len.saturating_sub(1);
                    }
                    Some('\\') => {}
                    Some(_) => return Err(parse_error(origin, i + 1, format!("unexpected hunk line '{line}'"))),
                }
                i += 1;
            }
            while lines.get(i).is_some_and(|l| l.starts_with('\\')) {
                i += 1;
            }
            patch.hunks.push(hunk);
        }
        patches.push(patch);
    }
    Ok(patches)
}

/// Conjunto de parches: todos los `*.patch` de un directorio, en orden de
/// ruta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    pub patches: Vec<FilePatch>,
}

impl PatchSet {
    pub fn load(dir: &Path) -> Result<Self, AdapterError> {
        let mut patches = Vec::new();
        for (rel, path) in list_files(dir)? {
            if !rel.ends_with(".patch") {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|e| AdapterError::io(&path, e))?;
            let parsed = parse_unified_diff(&text, &rel)?;
            debug!("patch set: {rel} -> {} file patches", parsed.len());
            patches.extend(parsed);
        }
        Ok(Self { patches })
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Frontera con la herramienta de parcheo.
pub trait PatchApplier: Send + Sync {
    /// Aplica `patch` sobre `original` y devuelve el contenido nuevo.
    fn apply(&self, original: &str, patch: &FilePatch) -> Result<String, HunkFailure>;

    fn describe(&self) -> Value;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedDiffApplier;

impl PatchApplier for UnifiedDiffApplier {
    fn apply(&self, original: &str, patch: &FilePatch) -> Result<String, HunkFailure> {
        let mut lines: Vec<String> = original.lines().map(str::to_string).collect();
        let trailing_newline = original.is_empty() || original.ends_with('\n');
        // desplazamiento acumulado por hunks anteriores
        let mut delta: isize = 0;
        let mut floor = 0;
        for (n, hunk) in patch.hunks.iter().enumerate() {
            let expected = hunk.old_lines();
            let hint = (hunk.old_start.saturating_sub(1) as isize + delta).max(0) as usize;
            let Some(at) = find_block(&lines, &expected, hint, floor) else {
                return Err(HunkFailure { hunk: n + 1,
                                         context: expected.iter().take(3).copied().collect::<Vec<_>>().join("\n") });
            };
            let replacement: Vec<String> = hunk.new_lines().into_iter().map(str::to_string).collect();
            let added = replacement.len();
            lines.splice(at..at + expected.len(), replacement);
            delta += added as isize - expected.len() as isize;
            floor = at + added;
        }
        let mut out = lines.join("\n");
        if trailing_newline && !lines.is_empty() {
            out.push('\n');
        }
        Ok(out)
    }

    fn describe(&self) -> Value {
        json!({"applier": "unified-diff", "fuzz": 0})
    }
}

/// Posición de `block` en `lines` más cercana a `hint`, no antes de `floor`.
fn find_block(lines: &[String], block: &[&str], hint: usize, floor: usize) -> Option<usize> {
    if block.is_empty() {
        return Some(hint.clamp(floor, lines.len()));
    }
    if block.len() > lines.len() {
        return None;
    }
    let last = lines.len() - block.len();
    let matches = |at: usize| lines[at..at + block.len()].iter().zip(block).all(|(a, b)| a == b);
    let hint = hint.clamp(floor, last.max(floor));
    for dist in 0..=lines.len() {
        let below = hint.checked_sub(dist).filter(|p| *p >= floor && *p <= last);
        if let Some(p) = below.filter(|p| matches(*p)) {
            return Some(p);
        }
        let above = Some(hint + dist).filter(|p| *p <= last);
        if let Some(p) = above.filter(|p| matches(*p)) {
            return Some(p);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "class Foo {\n    int a;\n    int b;\n    void run() {\n    }\n}\n";

    const PATCH: &str = "--- a/net/minecraft/Foo.java\n\
                         +++ b/net/minecraft/Foo.java\n\
                         @@ -2,2 +2,3 @@\n\
                         \x20    int a;\n\
                         -    int b;\n\
                         +    int b = 1;\n\
                         +    int c;\n";

    #[test]
    fn parses_paths_and_hunks() {
        let patches = parse_unified_diff(PATCH, "Foo.java.patch").unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].path, "net/minecraft/Foo.java");
        assert_eq!(patches[0].hunks[0].old_start, 2);
        assert_eq!(patches[0].hunks[0].lines.len(), 4);
    }

    #[test]
    fn applies_with_offset() {
        let patch = &parse_unified_diff(PATCH, "p").unwrap()[0];
        let shifted = format!("// header\n{ORIGINAL}");
        let out = UnifiedDiffApplier.apply(&shifted, patch).unwrap();
        assert!(out.contains("    int b = 1;\n    int c;\n"));
        assert!(out.starts_with("// header\n"));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn mismatched_context_names_the_hunk() {
        let patch = &parse_unified_diff(PATCH, "p").unwrap()[0];
        let err = UnifiedDiffApplier.apply("class Foo {\n    long a;\n}\n", patch).unwrap_err();
        assert_eq!(err.hunk, 1);
        assert!(err.context.contains("int a;"));
    }

    #[test]
    fn creation_patch_from_dev_null() {
        let text = "--- /dev/null\n+++ b/net/minecraft/New.java\n@@ -0,0 +1,2 @@\n+class New {\n+}\n";
        let patch = &parse_unified_diff(text, "p").unwrap()[0];
        assert!(patch.creates);
        assert_eq!(UnifiedDiffApplier.apply("", patch).unwrap(), "class New {\n}\n");
    }

    #[test]
    fn truncated_hunk_is_parse_error() {
        let text = "--- a/Foo.java\n+++ b/Foo.java\n@@ -1,3 +1,3 @@\n class Foo {\n";
        assert!(matches!(parse_unified_diff(text, "Foo.java.patch"),
                         Err(AdapterError::PatchApplicationFailure { .. })));
    }
}
