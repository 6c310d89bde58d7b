use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Field,
    Method,
    Param,
}

/// Identidad canónica de un símbolo en un dominio de nombres.
///
/// - `Class`: `name` es el nombre interno (`net/minecraft/Foo`), sin owner.
/// - `Field` / `Method`: `owner` es la clase declarante cuando se conoce;
///   los métodos llevan además su descriptor JVM.
/// - `Param`: nombre globalmente único (`p_1234_1_`), sin owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId {
    pub kind: SymbolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
}

impl SymbolId {
    pub fn class(name: &str) -> Self {
        Self { kind: SymbolKind::Class,
               owner: None,
               name: name.to_string(),
               descriptor: None }
    }

    pub fn field(owner: Option<&str>, name: &str) -> Self {
        Self { kind: SymbolKind::Field,
               owner: owner.map(str::to_string),
               name: name.to_string(),
               descriptor: None }
    }

    pub fn method(owner: Option<&str>, name: &str, descriptor: Option<&str>) -> Self {
        Self { kind: SymbolKind::Method,
               owner: owner.map(str::to_string),
               name: name.to_string(),
               descriptor: descriptor.map(str::to_string) }
    }

    pub fn param(name: &str) -> Self {
        Self { kind: SymbolKind::Param,
               owner: None,
               name: name.to_string(),
               descriptor: None }
    }

    /// Nombre simple: para clases, el segmento tras el último `/` o `$`.
    pub fn simple_name(&self) -> &str {
        match self.kind {
            SymbolKind::Class => self.name.rsplit(['/', '$']).next().unwrap_or(&self.name),
            _ => &self.name,
        }
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "{owner}.")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(desc) = &self.descriptor {
            write!(f, "{desc}")?;
        }
        Ok(())
    }
}
