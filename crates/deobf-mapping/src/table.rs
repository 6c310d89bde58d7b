//! Tabla de mapeo entre dos dominios de nombres.
//!
//! La tabla es inmutable una vez construida (los `insert_*` sólo se usan al
//! parsear). Las búsquedas que no encuentran entrada devuelven `None` y el
//! llamador deja el símbolo sin cambios.
//!
//! Además de las entradas con owner (SRG), la tabla admite nombres de miembro
//! sin owner (`members`): así se representan las tablas CSV intermedio ->
//! legible, donde los nombres intermedios son globalmente únicos.

use std::collections::BTreeMap;

use crate::descriptor::remap_descriptor;
use crate::names::NameTables;
use crate::symbol::{SymbolId, SymbolKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    classes: BTreeMap<String, String>,
    fields: BTreeMap<(String, String), String>,
    methods: BTreeMap<(String, String, String), String>,
    members: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_class(&mut self, from: &str, to: &str) {
        self.classes.insert(from.to_string(), to.to_string());
    }

    pub fn insert_field(&mut self, owner: &str, from: &str, to: &str) {
        self.fields.insert((owner.to_string(), from.to_string()), to.to_string());
    }

    pub fn insert_method(&mut self, owner: &str, from: &str, desc: &str, to: &str) {
        self.methods
            .insert((owner.to_string(), from.to_string(), desc.to_string()), to.to_string());
    }

    /// Nombre de miembro sin owner (campo o método).
    pub fn insert_member(&mut self, from: &str, to: &str) {
        self.members.insert(from.to_string(), to.to_string());
    }

    pub fn insert_param(&mut self, from: &str, to: &str) {
        self.params.insert(from.to_string(), to.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.fields.len() + self.methods.len() + self.members.len() + self.params.len()
    }

    pub fn map_class(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }

    /// Nombre de clase mapeado, o el original si la tabla no lo cubre.
    /// Las clases anidadas sin entrada propia heredan el mapeo de su clase
    /// exterior (`a$1` -> `net/minecraft/Foo$1`).
    pub fn remap_class(&self, name: &str) -> String {
        if let Some(to) = self.classes.get(name) {
            return to.clone();
        }
        if let Some((outer, inner)) = name.rsplit_once('$') {
            let outer_mapped = self.remap_class(outer);
            if outer_mapped != outer {
                return format!("{outer_mapped}${inner}");
            }
        }
        name.to_string()
    }

    pub fn remap_descriptor(&self, desc: &str) -> String {
        remap_descriptor(desc, |c| {
            let mapped = self.remap_class(c);
            (mapped != c).then_some(mapped)
        })
    }

    pub fn map_field(&self, owner: &str, name: &str) -> Option<&str> {
        self.fields
            .get(&(owner.to_string(), name.to_string()))
            .or_else(|| self.members.get(name))
            .map(String::as_str)
    }

    pub fn map_method(&self, owner: &str, name: &str, desc: &str) -> Option<&str> {
        self.methods
            .get(&(owner.to_string(), name.to_string(), desc.to_string()))
            .or_else(|| self.members.get(name))
            .map(String::as_str)
    }

    pub fn map_param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Búsqueda genérica por identidad de símbolo.
    pub fn lookup(&self, symbol: &SymbolId) -> Option<&str> {
        match symbol.kind {
            SymbolKind::Class => self.map_class(&symbol.name),
            SymbolKind::Field => match &symbol.owner {
                Some(owner) => self.map_field(owner, &symbol.name),
                None => self.members.get(&symbol.name).map(String::as_str),
            },
            SymbolKind::Method => match (&symbol.owner, &symbol.descriptor) {
                (Some(owner), Some(desc)) => self.map_method(owner, &symbol.name, desc),
                _ => self.members.get(&symbol.name).map(String::as_str),
            },
            SymbolKind::Param => self.map_param(&symbol.name),
        }
    }

    /// Tabla inversa (destino -> origen). Owners y descriptores de la inversa
    /// se expresan en el dominio destino. Si dos orígenes colapsan al mismo
    /// destino, gana el primero en orden lexicográfico.
    pub fn inverse(&self) -> MappingTable {
        let mut inv = MappingTable::new();
        for (from, to) in &self.classes {
            inv.classes.entry(to.clone()).or_insert_with(|| from.clone());
        }
        for ((owner, from), to) in &self.fields {
            inv.fields
               .entry((self.remap_class(owner), to.clone()))
               .or_insert_with(|| from.clone());
        }
        for ((owner, from, desc), to) in &self.methods {
            inv.methods
               .entry((self.remap_class(owner), to.clone(), self.remap_descriptor(desc)))
               .or_insert_with(|| from.clone());
        }
        for (from, to) in &self.members {
            inv.members.entry(to.clone()).or_insert_with(|| from.clone());
        }
        for (from, to) in &self.params {
            inv.params.entry(to.clone()).or_insert_with(|| from.clone());
        }
        inv
    }

    /// Compone con las tablas CSV: cada nombre destino intermedio se
    /// sustituye por su nombre legible cuando existe
    /// (ofuscado -> intermedio  ==>  ofuscado -> legible).
    pub fn with_names(&self, names: &NameTables) -> MappingTable {
        let mut out = self.clone();
        for to in out.fields.values_mut() {
            if let Some(entry) = names.fields.get(to.as_str()) {
                *to = entry.name.clone();
            }
        }
        for to in out.methods.values_mut() {
            if let Some(entry) = names.methods.get(to.as_str()) {
                *to = entry.name.clone();
            }
        }
        for (from, to) in &names.params {
            out.params.insert(from.clone(), to.clone());
        }
        out
    }

    /// Tabla intermedio -> legible a partir de las tablas CSV (sin owners).
    pub fn from_names(names: &NameTables) -> MappingTable {
        let mut out = MappingTable::new();
        for (from, entry) in names.fields.iter().chain(names.methods.iter()) {
            out.insert_member(from, &entry.name);
        }
        for (from, to) in &names.params {
            out.insert_param(from, to);
        }
        out
    }

    /// Todos los símbolos origen de la tabla con su nombre destino, en orden
    /// determinista.
    pub fn symbols(&self) -> Vec<(SymbolId, &str)> {
        let mut out = Vec::with_capacity(self.len());
        for (from, to) in &self.classes {
            out.push((SymbolId::class(from), to.as_str()));
        }
        for ((owner, from), to) in &self.fields {
            out.push((SymbolId::field(Some(owner), from), to.as_str()));
        }
        for ((owner, from, desc), to) in &self.methods {
            out.push((SymbolId::method(Some(owner), from, Some(desc)), to.as_str()));
        }
        for (from, to) in &self.members {
            // sin descriptor no se distingue campo de método
            out.push((SymbolId::field(None, from), to.as_str()));
            out.push((SymbolId::method(None, from, None), to.as_str()));
        }
        for (from, to) in &self.params {
            out.push((SymbolId::param(from), to.as_str()));
        }
        out
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.fields.iter().map(|((o, a), b)| (o.as_str(), a.as_str(), b.as_str()))
    }

    pub fn methods(&self) -> impl Iterator<Item = (&str, &str, &str, &str)> {
        self.methods
            .iter()
            .map(|((o, a, d), b)| (o.as_str(), a.as_str(), d.as_str(), b.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::NameEntry;

    fn sample() -> MappingTable {
        let mut t = MappingTable::new();
        t.insert_class("a", "net/minecraft/Foo");
        t.insert_class("b", "net/minecraft/Bar");
        t.insert_field("a", "c", "field_100_c");
        t.insert_method("a", "d", "(Lb;)La;", "func_200_d");
        t
    }

    #[test]
    fn unmapped_lookups_return_none() {
        let t = sample();
        assert_eq!(t.map_field("a", "zz"), None);
        assert_eq!(t.map_class("zz"), None);
        assert_eq!(t.remap_class("zz"), "zz");
    }

    #[test]
    fn nested_classes_follow_outer_mapping() {
        assert_eq!(sample().remap_class("a$1"), "net/minecraft/Foo$1");
    }

    #[test]
    fn inverse_maps_back_with_target_domain_keys() {
        let t = sample();
        let inv = t.inverse();
        assert_eq!(inv.map_class("net/minecraft/Foo"), Some("a"));
        assert_eq!(inv.map_field("net/minecraft/Foo", "field_100_c"), Some("c"));
        assert_eq!(inv.map_method("net/minecraft/Foo", "func_200_d", "(Lnet/minecraft/Bar;)Lnet/minecraft/Foo;"),
                   Some("d"));
        assert_eq!(inv.inverse(), t);
    }

    #[test]
    fn with_names_replaces_intermediate_names() {
        let mut names = NameTables::default();
        names.fields.insert("field_100_c".into(), NameEntry::new("count"));
        names.params.insert("p_200_1_".into(), "other".into());
        let t = sample().with_names(&names);
        assert_eq!(t.map_field("a", "c"), Some("count"));
        assert_eq!(t.map_method("a", "d", "(Lb;)La;"), Some("func_200_d"));
        assert_eq!(t.map_param("p_200_1_"), Some("other"));

        let dev = MappingTable::from_names(&names);
        assert_eq!(dev.lookup(&SymbolId::field(Some("net/minecraft/Foo"), "field_100_c")), Some("count"));
    }
}
