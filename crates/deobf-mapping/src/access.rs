//! Access transformers (`*_at.cfg`).
//!
//! ```text
//! # comentario
//! public net.minecraft.Foo                      # clase
//! public-f net.minecraft.Foo field_100_b        # campo, quita final
//! protected net.minecraft.Foo func_200_c(I)V    # método
//! public net.minecraft.Foo *                    # todos los campos
//! public net.minecraft.Foo *()                  # todos los métodos
//! public net.minecraft.Foo field_100_b renamed  # con nombre nuevo
//! ```
//!
//! Las reglas sólo ensanchan visibilidad: aplicar un conjunto dos veces da el
//! mismo resultado que aplicarlo una.

use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::is_method_descriptor;
use crate::error::MappingError;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_FINAL: u16 = 0x0010;
const VISIBILITY_MASK: u16 = ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED;

/// Ordenado de menos a más visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Visibility {
    Private,
    Package,
    Protected,
    Public,
}

impl Visibility {
    pub fn from_flags(flags: u16) -> Self {
        if flags & ACC_PUBLIC != 0 {
            Visibility::Public
        } else if flags & ACC_PROTECTED != 0 {
            Visibility::Protected
        } else if flags & ACC_PRIVATE != 0 {
            Visibility::Private
        } else {
            Visibility::Package
        }
    }

    fn flag(self) -> u16 {
        match self {
            Visibility::Private => ACC_PRIVATE,
            Visibility::Package => 0,
            Visibility::Protected => ACC_PROTECTED,
            Visibility::Public => ACC_PUBLIC,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Package => "default",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FinalChange {
    Keep,
    Remove,
    Add,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberTarget {
    Class,
    Field(String),
    Method { name: String, desc: String },
    AllFields,
    AllMethods,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessTransformer {
    /// Nombre interno con `/`.
    pub class: String,
    pub member: MemberTarget,
    pub visibility: Visibility,
    pub final_change: FinalChange,
    pub rename: Option<String>,
}

impl AccessTransformer {
    /// Nuevos flags tras aplicar esta regla. Idempotente.
    pub fn apply(&self, flags: u16) -> u16 {
        let mut out = flags;
        if self.visibility > Visibility::from_flags(flags) {
            out = (out & !VISIBILITY_MASK) | self.visibility.flag();
        }
        match self.final_change {
            FinalChange::Keep => {}
            FinalChange::Remove => out &= !ACC_FINAL,
            FinalChange::Add => out |= ACC_FINAL,
        }
        out
    }

    pub fn targets_field(&self, class: &str, name: &str) -> bool {
        self.class == class
        && match &self.member {
            MemberTarget::Field(n) => n == name,
            MemberTarget::AllFields => true,
            _ => false,
        }
    }

    pub fn targets_method(&self, class: &str, name: &str, desc: &str) -> bool {
        self.class == class
        && match &self.member {
            MemberTarget::Method { name: n, desc: d } => n == name && d == desc,
            MemberTarget::AllMethods => true,
            _ => false,
        }
    }

    pub fn targets_class(&self, class: &str) -> bool {
        self.class == class && self.member == MemberTarget::Class
    }
}

impl fmt::Display for AccessTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.visibility.keyword())?;
        match self.final_change {
            FinalChange::Keep => {}
            FinalChange::Remove => f.write_str("-f")?,
            FinalChange::Add => f.write_str("+f")?,
        }
        write!(f, " {}", self.class.replace('/', "."))?;
        match &self.member {
            MemberTarget::Class => {}
            MemberTarget::Field(n) => write!(f, " {n}")?,
            MemberTarget::Method { name, desc } => write!(f, " {name}{desc}")?,
            MemberTarget::AllFields => f.write_str(" *")?,
            MemberTarget::AllMethods => f.write_str(" *()")?,
        }
        if let Some(r) = &self.rename {
            write!(f, " {r}")?;
        }
        Ok(())
    }
}

/// Conjunto de reglas; duplicados colapsan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTransformerSet {
    entries: BTreeSet<AccessTransformer>,
}

impl AccessTransformerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let file = File::open(path).map_err(|e| MappingError::io(path, e))?;
        Self::parse(BufReader::new(file), &path.display().to_string())
    }

    pub fn parse<R: BufRead>(reader: R, file: &str) -> Result<Self, MappingError> {
        let mut set = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let lineno = idx + 1;
            let line = line.map_err(|e| MappingError::parse(file, lineno, e.to_string()))?;
            let body = line.split('#').next().unwrap_or("").trim();
            if body.is_empty() {
                continue;
            }
            set.insert(parse_line(body, file, lineno)?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, at: AccessTransformer) -> bool {
        self.entries.insert(at)
    }

    pub fn merge(&mut self, other: &AccessTransformerSet) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessTransformer> {
        self.entries.iter()
    }

    pub fn class_access(&self, class: &str, flags: u16) -> u16 {
        self.entries
            .iter()
            .filter(|e| e.targets_class(class))
            .fold(flags, |acc, e| e.apply(acc))
    }

    pub fn field_access(&self, class: &str, name: &str, flags: u16) -> u16 {
        self.entries
            .iter()
            .filter(|e| e.targets_field(class, name))
            .fold(flags, |acc, e| e.apply(acc))
    }

    pub fn method_access(&self, class: &str, name: &str, desc: &str, flags: u16) -> u16 {
        self.entries
            .iter()
            .filter(|e| e.targets_method(class, name, desc))
            .fold(flags, |acc, e| e.apply(acc))
    }

    pub fn field_rename(&self, class: &str, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.member, MemberTarget::Field(_)) && e.targets_field(class, name))
            .find_map(|e| e.rename.as_deref())
    }

    pub fn method_rename(&self, class: &str, name: &str, desc: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.member, MemberTarget::Method { .. }) && e.targets_method(class, name, desc))
            .find_map(|e| e.rename.as_deref())
    }

    /// Texto `*_at.cfg` equivalente (una regla por línea, orden estable).
    pub fn to_cfg_string(&self) -> String {
        self.entries.iter().map(|e| format!("{e}\n")).collect()
    }
}

fn parse_line(body: &str, file: &str, line: usize) -> Result<AccessTransformer, MappingError> {
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.len() < 2 || tokens.len() > 4 {
        return Err(MappingError::parse(file, line, format!("expected 2 to 4 tokens, got {}", tokens.len())));
    }
    let (access, final_change) = match tokens[0].strip_suffix("-f") {
        Some(a) => (a, FinalChange::Remove),
        None => match tokens[0].strip_suffix("+f") {
            Some(a) => (a, FinalChange::Add),
            None => (tokens[0], FinalChange::Keep),
        },
    };
    let visibility = match access {
        "public" => Visibility::Public,
        "protected" => Visibility::Protected,
        "private" => Visibility::Private,
        "default" => Visibility::Package,
        other => return Err(MappingError::parse(file, line, format!("unknown access modifier '{other}'"))),
    };
    let class = tokens[1].replace('.', "/");
    if class.is_empty() || class.contains(['(', ')', '*']) {
        return Err(MappingError::parse(file, line, format!("invalid class name '{}'", tokens[1])));
    }
    let member = match tokens.get(2) {
        None => MemberTarget::Class,
        Some(&"*") => MemberTarget::AllFields,
        Some(&"*()") => MemberTarget::AllMethods,
        Some(m) => match m.find('(') {
            Some(i) => {
                let (name, desc) = m.split_at(i);
                if name.is_empty() || !is_method_descriptor(desc) {
                    return Err(MappingError::parse(file, line, format!("invalid method target '{m}'")));
                }
                MemberTarget::Method { name: name.to_string(),
                                       desc: desc.to_string() }
            }
            None => MemberTarget::Field(m.to_string()),
        },
    };
    let rename = tokens.get(3).map(|s| s.to_string());
    if rename.is_some() && matches!(member, MemberTarget::AllFields | MemberTarget::AllMethods) {
        return Err(MappingError::parse(file, line, "wildcard targets cannot be renamed"));
    }
    Ok(AccessTransformer { class,
                           member,
                           visibility,
                           final_change,
                           rename })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: &str = "# test\n\
                       public net.minecraft.Foo\n\
                       public-f net.minecraft.Foo field_100_b\n\
                       protected net.minecraft.Foo func_200_c(I)V # inline\n\
                       public net.minecraft.Bar *()\n\
                       public net.minecraft.Foo field_101_x exposed\n";

    fn set() -> AccessTransformerSet {
        AccessTransformerSet::parse(CFG.as_bytes(), "test_at.cfg").unwrap()
    }

    #[test]
    fn parses_all_target_kinds() {
        let s = set();
        assert_eq!(s.len(), 5);
        assert_eq!(s.field_rename("net/minecraft/Foo", "field_101_x"), Some("exposed"));
        assert!(s.iter().any(|e| e.member == MemberTarget::AllMethods));
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let s = set();
        let flags = ACC_PRIVATE | ACC_FINAL;
        let once = s.field_access("net/minecraft/Foo", "field_100_b", flags);
        assert_eq!(once, ACC_PUBLIC);
        assert_eq!(s.field_access("net/minecraft/Foo", "field_100_b", once), once);

        let m = s.method_access("net/minecraft/Foo", "func_200_c", "(I)V", 0);
        assert_eq!(m, ACC_PROTECTED);
        // nunca reduce visibilidad
        assert_eq!(s.method_access("net/minecraft/Foo", "func_200_c", "(I)V", ACC_PUBLIC), ACC_PUBLIC);
    }

    #[test]
    fn merge_collapses_duplicates() {
        let mut a = set();
        let b = set();
        a.merge(&b);
        assert_eq!(a, set());
        assert_eq!(AccessTransformerSet::parse(a.to_cfg_string().as_bytes(), "again").unwrap(), a);
    }

    #[test]
    fn malformed_line_is_error_with_location() {
        let cfg = "public net.minecraft.Foo\nsometimes net.minecraft.Foo bar\n";
        match AccessTransformerSet::parse(cfg.as_bytes(), "bad_at.cfg") {
            Err(MappingError::Parse { line, file, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(file, "bad_at.cfg");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(AccessTransformerSet::parse("public a.B m(I\n".as_bytes(), "x").is_err());
    }
}
