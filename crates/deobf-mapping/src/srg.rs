//! Parser y writer del formato SRG.
//!
//! ```text
//! PK: ./ net/minecraft/src
//! CL: a net/minecraft/Foo
//! FD: a/b net/minecraft/Foo/field_100_b
//! MD: a/c (La;)V net/minecraft/Foo/func_200_c (Lnet/minecraft/Foo;)V
//! ```
//!
//! Tipos de registro desconocidos se ignoran; un registro conocido mal formado
//! es un error con fichero y línea.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::error::MappingError;
use crate::table::MappingTable;

pub fn load_srg(path: &Path) -> Result<MappingTable, MappingError> {
    let file = File::open(path).map_err(|e| MappingError::io(path, e))?;
    parse_srg(BufReader::new(file), &path.display().to_string())
}

pub fn parse_srg<R: BufRead>(reader: R, file: &str) -> Result<MappingTable, MappingError> {
    let mut table = MappingTable::new();
    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.map_err(|e| MappingError::parse(file, lineno, e.to_string()))?;
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(kind) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();
        match kind {
            "PK:" => {}
            "CL:" => {
                let [from, to] = args[..] else {
                    return Err(MappingError::parse(file, lineno, format!("CL expects 2 names, got {}", args.len())));
                };
                table.insert_class(from, to);
            }
            "FD:" => {
                // forma corta (2 tokens) o con descriptores (4 tokens)
                let (from, to) = match args[..] {
                    [from, to] | [from, _, to, _] => (from, to),
                    _ => {
                        return Err(MappingError::parse(file,
                                                       lineno,
                                                       format!("FD expects 2 or 4 tokens, got {}", args.len())))
                    }
                };
                let (owner, name) = split_member(from, file, lineno)?;
                let (_, new_name) = split_member(to, file, lineno)?;
                table.insert_field(owner, name, new_name);
            }
            "MD:" => {
                let [from, desc, to, _new_desc] = args[..] else {
                    return Err(MappingError::parse(file, lineno, format!("MD expects 4 tokens, got {}", args.len())));
                };
                if !desc.starts_with('(') {
                    return Err(MappingError::parse(file, lineno, format!("invalid method descriptor '{desc}'")));
                }
                let (owner, name) = split_member(from, file, lineno)?;
                let (_, new_name) = split_member(to, file, lineno)?;
                table.insert_method(owner, name, desc, new_name);
            }
            other => debug!("{file}:{lineno}: ignoring record type {other}"),
        }
    }
    Ok(table)
}

fn split_member<'a>(qualified: &'a str, file: &str, line: usize) -> Result<(&'a str, &'a str), MappingError> {
    qualified.rsplit_once('/')
             .filter(|(o, n)| !o.is_empty() && !n.is_empty())
             .ok_or_else(|| MappingError::parse(file, line, format!("expected owner/name, got '{qualified}'")))
}

/// Serializa la tabla en formato SRG (sólo entradas con owner).
pub fn write_srg(table: &MappingTable) -> String {
    let mut out = String::new();
    for (from, to) in table.classes() {
        let _ = writeln!(out, "CL: {from} {to}");
    }
    for (owner, from, to) in table.fields() {
        let _ = writeln!(out, "FD: {owner}/{from} {}/{to}", table.remap_class(owner));
    }
    for (owner, from, desc, to) in table.methods() {
        let _ = writeln!(out,
                         "MD: {owner}/{from} {desc} {}/{to} {}",
                         table.remap_class(owner),
                         table.remap_descriptor(desc));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "PK: ./ net/minecraft/src\n\
                          CL: a net/minecraft/Foo\n\
                          XX: whatever this is\n\
                          FD: a/b net/minecraft/Foo/field_100_b\n\
                          MD: a/c (La;)V net/minecraft/Foo/func_200_c (Lnet/minecraft/Foo;)V\n";

    #[test]
    fn parses_known_records_and_ignores_unknown() {
        let t = parse_srg(SAMPLE.as_bytes(), "notch-srg.srg").unwrap();
        assert_eq!(t.map_class("a"), Some("net/minecraft/Foo"));
        assert_eq!(t.map_field("a", "b"), Some("field_100_b"));
        assert_eq!(t.map_method("a", "c", "(La;)V"), Some("func_200_c"));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn malformed_record_reports_file_and_line() {
        let src = "CL: a net/minecraft/Foo\nFD: a/b\n";
        match parse_srg(src.as_bytes(), "broken.srg") {
            Err(MappingError::Parse { file, line, .. }) => {
                assert_eq!(file, "broken.srg");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn written_srg_parses_back() {
        let t = parse_srg(SAMPLE.as_bytes(), "x").unwrap();
        let again = parse_srg(write_srg(&t).as_bytes(), "y").unwrap();
        assert_eq!(t, again);
    }
}
