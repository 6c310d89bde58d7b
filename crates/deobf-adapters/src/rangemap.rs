//! Extracción de range maps: por cada `.java` de un árbol, las ocurrencias de
//! símbolos mapeables con su span y su resolución.
//!
//! La resolución pasa por `SymbolResolver`. El resolver incluido
//! (`ScopedResolver`) es léxico: conoce paquete, imports, la pila de clases
//! contenedoras y la jerarquía `extends` declarada en el árbol y en el
//! classpath. Los identificadores que no corresponden a ningún símbolo de la
//! tabla no se registran.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use deobf_mapping::descriptor::method_arity;
use deobf_mapping::{MappingTable, RangeMap, RangeRecord, Resolution, Span, SymbolId, SymbolKind};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bundle::{list_files, read_file};
use crate::classfile::ClassFile;
use crate::error::AdapterError;
use crate::java::{tokenize, Token, TokenKind};

/// Frontera con el analizador de fuentes.
pub trait SymbolResolver: Send + Sync {
    /// Ocurrencias del fichero `path` (relativo al árbol) con su resolución.
    fn resolve_file(&self, path: &str, source: &str) -> Result<Vec<RangeRecord>, AdapterError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Modo validación: una ocurrencia sin resolver es un error.
    pub require_fully_resolved: bool,
}

pub struct RangeMapExtractor<'r> {
    resolver: &'r dyn SymbolResolver,
    options: ExtractOptions,
}

impl<'r> RangeMapExtractor<'r> {
    pub fn new(resolver: &'r dyn SymbolResolver, options: ExtractOptions) -> Self {
        Self { resolver, options }
    }

    pub fn extract(&self, tree: &Path) -> Result<RangeMap, AdapterError> {
        let mut map = RangeMap::new();
        for (rel, path) in list_files(tree)? {
            if !rel.ends_with(".java") {
                continue;
            }
            let bytes = read_file(&path)?;
            let source = std::str::from_utf8(&bytes).map_err(|e| AdapterError::SourceEncoding { file: rel.clone(),
                                                                                                  offset: e.valid_up_to() })?;
            let records = self.resolver.resolve_file(&rel, source)?;
            if self.options.require_fully_resolved {
                if let Some(r) = records.iter()
                                        .find(|r| matches!(r.resolution, Resolution::Unresolved { .. }))
                {
                    let candidates = match &r.resolution {
                        Resolution::Unresolved { candidates } => candidates.len(),
                        Resolution::Resolved { .. } => 0,
                    };
                    return Err(AdapterError::UnresolvedSymbolAmbiguity { file: rel,
                                                                         line: r.span.line,
                                                                         column: r.span.column,
                                                                         name: r.text.clone(),
                                                                         candidates });
                }
            }
            debug!("rangemap file={rel} records={}", records.len());
            map.insert_file(&rel, &bytes, records);
        }
        let unresolved = map.unresolved().len();
        if unresolved > 0 {
            warn!("{unresolved} ambiguous symbol occurrences left unresolved in {}", tree.display());
        }
        info!("extracted range map for {}: {} files, {} resolved",
              tree.display(),
              map.files.len(),
              map.resolved_count());
        Ok(map)
    }
}

/// Clases conocidas y su superclase (nombres internos).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassIndex {
    pub known: BTreeSet<String>,
    pub supers: BTreeMap<String, String>,
}

impl ClassIndex {
    /// `class` seguida de sus superclases conocidas.
    fn lineage(&self, class: &str) -> Vec<String> {
        let mut out = vec![class.to_string()];
        let mut cur = class;
        while let Some(next) = self.supers.get(cur) {
            if out.iter().any(|c| c == next) || out.len() > 64 {
                break;
            }
            out.push(next.clone());
            cur = next;
        }
        out
    }

    fn merge(&mut self, other: ClassIndex) {
        self.known.extend(other.known);
        for (k, v) in other.supers {
            self.supers.entry(k).or_insert(v);
        }
    }
}

/// Clases de los bundles binarios del classpath (directorios explotados).
/// Los class files ilegibles se omiten con un warning.
pub fn classpath_classes(classpath: &[PathBuf]) -> Result<ClassIndex, AdapterError> {
    let mut index = ClassIndex::default();
    for root in classpath.iter().filter(|p| p.is_dir()) {
        for (rel, path) in list_files(root)? {
            if !rel.ends_with(".class") {
                continue;
            }
            match ClassFile::parse(&read_file(&path)?) {
                Ok(class) => {
                    if let Some(name) = class.name() {
                        index.known.insert(name.to_string());
                        if let Some(sup) = class.super_name() {
                            index.supers.insert(name.to_string(), sup.to_string());
                        }
                    }
                }
                Err(e) => warn!("skipping unreadable class {}: {e}", path.display()),
            }
        }
    }
    Ok(index)
}

const KEYWORDS: &[&str] = &["abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
                            "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
                            "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
                            "long", "native", "new", "package", "private", "protected", "public", "return", "short",
                            "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
                            "transient", "try", "void", "volatile", "while", "true", "false", "null", "var",
                            "record", "yield"];

const TYPE_KEYWORDS: &[&str] = &["class", "interface", "enum", "record"];

fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Estado léxico de un fichero: paquete, imports y clases contenedoras.
#[derive(Debug, Clone, Default)]
struct FileScope {
    package: String,
    imports: BTreeMap<String, String>,
    wildcards: Vec<String>,
    depth: usize,
    classes: Vec<(String, usize)>,
    pending: Option<String>,
}

impl FileScope {
    fn enclosing(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().rev().map(|(c, _)| c.as_str())
    }

    fn internal_for(&self, simple: &str) -> String {
        match self.classes.last() {
            Some((outer, _)) => format!("{outer}${simple}"),
            None if self.package.is_empty() => simple.to_string(),
            None => format!("{}/{simple}", self.package),
        }
    }

    fn resolve_class(&self, index: &ClassIndex, simple: &str) -> Option<String> {
        for outer in self.enclosing() {
            for c in index.lineage(outer) {
                let nested = format!("{c}${simple}");
                if index.known.contains(&nested) {
                    return Some(nested);
                }
            }
        }
        if let Some(imported) = self.imports.get(simple) {
            return Some(imported.clone());
        }
        let local = if self.package.is_empty() {
            simple.to_string()
        } else {
            format!("{}/{simple}", self.package)
        };
        if index.known.contains(&local) {
            return Some(local);
        }
        self.wildcards
            .iter()
            .map(|w| format!("{w}/{simple}"))
            .chain([format!("java/lang/{simple}"), simple.to_string()])
            .find(|c| index.known.contains(c))
    }
}

/// Nombre con puntos a partir de `tokens[i]` (`a . b . c`); devuelve las
/// partes y el índice del primer token no consumido.
fn dotted_name(src: &str, tokens: &[Token], mut i: usize) -> (Vec<String>, usize) {
    let mut parts = Vec::new();
    while let Some(t) = tokens.get(i) {
        match t.kind {
            TokenKind::Ident => parts.push(t.text(src).to_string()),
            TokenKind::Symbol('*') => parts.push("*".to_string()),
            _ => break,
        }
        i += 1;
        if !tokens.get(i).is_some_and(|t| t.is_symbol('.')) {
            break;
        }
        i += 1;
    }
    (parts, i)
}

fn skip_to_semicolon(tokens: &[Token], mut i: usize) -> usize {
    while i < tokens.len() && !tokens[i].is_symbol(';') {
        i += 1;
    }
    i + 1
}

/// Recorre los identificadores de un fichero manteniendo el `FileScope`.
/// `visit` recibe cada identificador que no es palabra clave ni parte de
/// una declaración `package` / `import`.
fn walk<F>(src: &str, tokens: &[Token], mut visit: F)
    where F: FnMut(&FileScope, usize)
{
    let mut scope = FileScope::default();
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        match tok.kind {
            TokenKind::Symbol('{') => {
                scope.depth += 1;
                if let Some(class) = scope.pending.take() {
                    scope.classes.push((class, scope.depth));
                }
            }
            TokenKind::Symbol('}') => {
                if scope.classes.last().is_some_and(|(_, d)| *d == scope.depth) {
                    scope.classes.pop();
                }
                scope.depth = scope.depth.saturating_sub(1);
            }
            TokenKind::Symbol(';') => {
                // `class X;` no existe, pero un `record`/`enum` mal detectado no
                // debe quedar pendiente
                if scope.pending.is_some() && scope.depth == 0 {
                    scope.pending = None;
                }
            }
            TokenKind::Ident => {
                let text = tok.text(src);
                if scope.depth == 0 && scope.classes.is_empty() && text == "package" {
                    let (parts, next) = dotted_name(src, tokens, i + 1);
                    scope.package = parts.join("/");
                    i = skip_to_semicolon(tokens, next);
                    continue;
                }
                if scope.depth == 0 && text == "import" {
                    let is_static = tokens.get(i + 1).is_some_and(|t| t.text(src) == "static");
                    let start = if is_static { i + 2 } else { i + 1 };
                    let (parts, next) = dotted_name(src, tokens, start);
                    if !is_static {
                        match parts.split_last() {
                            Some((last, pkg)) if last == "*" => scope.wildcards.push(pkg.join("/")),
                            Some((last, _)) => {
                                scope.imports.insert(last.clone(), parts.join("/"));
                            }
                            None => {}
                        }
                    }
                    i = skip_to_semicolon(tokens, next);
                    continue;
                }
                let after_dot = i > 0 && tokens[i - 1].is_symbol('.');
                if TYPE_KEYWORDS.contains(&text) && !after_dot {
                    if let Some(name) = tokens.get(i + 1).filter(|t| t.kind == TokenKind::Ident) {
                        let name = name.text(src);
                        if !is_keyword(name) {
                            scope.pending = Some(scope.internal_for(name));
                        }
                    }
                }
                if !is_keyword(text) {
                    visit(&scope, i);
                }
            }
            _ => {}
        }
        i += 1;
    }
}

fn is_declaration_name(src: &str, tokens: &[Token], i: usize) -> bool {
    i > 0
    && tokens[i - 1].kind == TokenKind::Ident
    && TYPE_KEYWORDS.contains(&tokens[i - 1].text(src))
    && !(i > 1 && tokens[i - 2].is_symbol('.'))
}

/// Número de argumentos de la llamada / declaración cuyo `(` está en
/// `tokens[open]`.
fn call_arity(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut commas = 0;
    let mut empty = true;
    for tok in &tokens[open..] {
        match tok.kind {
            TokenKind::Symbol('(') | TokenKind::Symbol('[') | TokenKind::Symbol('{') => depth += 1,
            TokenKind::Symbol(')') | TokenKind::Symbol(']') | TokenKind::Symbol('}') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(if empty { 0 } else { commas + 1 });
                }
                continue;
            }
            TokenKind::Symbol(',') if depth == 1 => commas += 1,
            _ => {}
        }
        if depth > 1 || (depth == 1 && !tok.is_symbol('(')) {
            empty = false;
        }
    }
    None
}

/// Índice tras los argumentos de tipo que abren en `tokens[j]` (`<...>`), o
/// `None` si lo que sigue no tiene forma de lista de tipos.
fn skip_type_args(tokens: &[Token], mut j: usize) -> Option<usize> {
    let mut depth = 0usize;
    while let Some(t) = tokens.get(j) {
        match t.kind {
            TokenKind::Symbol('<') => depth += 1,
            TokenKind::Symbol('>') => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
            TokenKind::Ident | TokenKind::Symbol(',' | '.' | '?' | '[' | ']') => {}
            _ => return None,
        }
        j += 1;
    }
    None
}

/// Tipos declarados (`Tipo nombre`) de variables, parámetros y campos de un
/// fichero. Es léxico: no distingue bloques, gana la última declaración
/// anterior al uso.
#[derive(Debug, Default)]
struct DeclaredTypes<'s> {
    by_name: BTreeMap<&'s str, Vec<(usize, String)>>,
}

impl<'s> DeclaredTypes<'s> {
    fn scan(src: &'s str, tokens: &[Token]) -> Self {
        let mut out = Self::default();
        for (k, tok) in tokens.iter().enumerate() {
            if tok.kind != TokenKind::Ident || is_keyword(tok.text(src)) {
                continue;
            }
            let mut j = k + 1;
            if tokens.get(j).is_some_and(|t| t.is_symbol('<')) {
                let Some(next) = skip_type_args(tokens, j) else {
                    continue;
                };
                j = next;
            }
            while tokens.get(j).is_some_and(|t| t.is_symbol('[')) && tokens.get(j + 1).is_some_and(|t| t.is_symbol(']')) {
                j += 2;
            }
            let Some(name) = tokens.get(j).filter(|t| t.kind == TokenKind::Ident) else {
                continue;
            };
            let name = name.text(src);
            let ends_declarator = tokens.get(j + 1)
                                        .is_some_and(|t| matches!(t.kind, TokenKind::Symbol('=' | ';' | ',' | ')' | ':')));
            if is_keyword(name) || !ends_declarator {
                continue;
            }
            let mut parts = vec![tok.text(src)];
            let mut q = k;
            while q >= 2 && tokens[q - 1].is_symbol('.') && tokens[q - 2].kind == TokenKind::Ident {
                parts.push(tokens[q - 2].text(src));
                q -= 2;
            }
            parts.reverse();
            out.by_name.entry(name).or_default().push((j, parts.join("/")));
        }
        out
    }

    fn type_of(&self, name: &str, at: usize) -> Option<&str> {
        let decls = self.by_name.get(name)?;
        decls.iter()
             .rev()
             .find(|(k, _)| *k < at)
             .or_else(|| decls.first())
             .map(|(_, ty)| ty.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopedResolver {
    classes: ClassIndex,
    /// Clases del dominio origen de la tabla.
    mapped_classes: BTreeSet<String>,
    fields: BTreeMap<String, Vec<SymbolId>>,
    methods: BTreeMap<String, Vec<SymbolId>>,
    params: BTreeMap<String, SymbolId>,
}

impl ScopedResolver {
    /// Resolver sobre los símbolos origen de `table`.
    pub fn new(table: &MappingTable) -> Self {
        let mut resolver = Self::default();
        for (symbol, _) in table.symbols() {
            match symbol.kind {
                SymbolKind::Class => {
                    resolver.classes.known.insert(symbol.name.clone());
                    resolver.mapped_classes.insert(symbol.name);
                }
                SymbolKind::Field => resolver.fields.entry(symbol.name.clone()).or_default().push(symbol),
                SymbolKind::Method => resolver.methods.entry(symbol.name.clone()).or_default().push(symbol),
                SymbolKind::Param => {
                    resolver.params.insert(symbol.name.clone(), symbol);
                }
            }
        }
        resolver
    }

    pub fn with_classes(mut self, index: ClassIndex) -> Self {
        self.classes.merge(index);
        self
    }

    /// Registra las clases declaradas en `tree` y sus `extends`.
    pub fn index_tree(mut self, tree: &Path) -> Result<Self, AdapterError> {
        struct Decl {
            internal: String,
            extends: Option<Vec<String>>,
            scope: FileScope,
        }
        let mut decls = Vec::new();
        for (rel, path) in list_files(tree)? {
            if !rel.ends_with(".java") {
                continue;
            }
            let src = fs::read_to_string(&path).map_err(|e| AdapterError::io(&path, e))?;
            let tokens = tokenize(&src);
            walk(&src, &tokens, |scope, i| {
                if !is_declaration_name(&src, &tokens, i) {
                    return;
                }
                let Some(internal) = scope.pending.clone() else {
                    return;
                };
                let mut j = i + 1;
                // parámetros de tipo
                if tokens.get(j).is_some_and(|t| t.is_symbol('<')) {
                    let mut depth = 0;
                    while let Some(t) = tokens.get(j) {
                        if t.is_symbol('<') {
                            depth += 1;
                        } else if t.is_symbol('>') {
                            depth -= 1;
                            if depth == 0 {
                                j += 1;
                                break;
                            }
                        }
                        j += 1;
                    }
                }
                let extends = tokens.get(j)
                                    .filter(|t| t.text(&src) == "extends")
                                    .map(|_| dotted_name(&src, &tokens, j + 1).0);
                decls.push(Decl { internal,
                                  extends,
                                  scope: scope.clone() });
            });
        }
        for decl in &decls {
            self.classes.known.insert(decl.internal.clone());
        }
        for decl in decls {
            let Some(parts) = decl.extends.filter(|p| !p.is_empty()) else {
                continue;
            };
            let sup = if parts.len() == 1 {
                decl.scope.resolve_class(&self.classes, &parts[0])
            } else {
                Some(parts.join("/"))
            };
            if let Some(sup) = sup {
                self.classes.supers.insert(decl.internal, sup);
            }
        }
        Ok(self)
    }

    /// Dueños a considerar, en orden de prioridad, para un miembro en
    /// `tokens[i]`. Vacío si el calificador es una expresión desconocida.
    fn owner_chain(&self, src: &str, tokens: &[Token], i: usize, scope: &FileScope, vars: &DeclaredTypes<'_>) -> Vec<String> {
        let qualified = i > 0 && tokens[i - 1].is_symbol('.');
        if !qualified {
            return scope.enclosing().flat_map(|c| self.classes.lineage(c)).collect();
        }
        let Some(q) = i.checked_sub(2).map(|k| tokens[k]).filter(|t| t.kind == TokenKind::Ident) else {
            return Vec::new();
        };
        let unqualified_q = !(i > 2 && tokens[i - 3].is_symbol('.'));
        match q.text(src) {
            "this" => scope.enclosing()
                           .next()
                           .map(|c| self.classes.lineage(c))
                           .unwrap_or_default(),
            "super" => scope.enclosing()
                            .next()
                            .and_then(|c| self.classes.supers.get(c))
                            .map(|s| self.classes.lineage(s))
                            .unwrap_or_default(),
            name if unqualified_q => {
                let class = match vars.type_of(name, i - 2) {
                    Some(ty) if ty.contains('/') => Some(ty.to_string()),
                    Some(ty) => scope.resolve_class(&self.classes, ty),
                    None => scope.resolve_class(&self.classes, name),
                };
                class.map(|c| self.classes.lineage(&c)).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    /// Clase referida por un nombre completamente calificado que termina en
    /// `tokens[i]` (`net.minecraft.Foo`).
    fn qualified_class(&self, src: &str, tokens: &[Token], i: usize) -> Option<String> {
        let mut parts = vec![tokens[i].text(src)];
        let mut k = i;
        while k >= 2 && tokens[k - 1].is_symbol('.') && tokens[k - 2].kind == TokenKind::Ident {
            parts.push(tokens[k - 2].text(src));
            k -= 2;
        }
        if parts.len() < 2 {
            return None;
        }
        parts.reverse();
        let name = parts.join("/");
        self.mapped_classes.contains(&name).then_some(name)
    }

    fn resolve_occurrence(&self,
                          src: &str,
                          tokens: &[Token],
                          i: usize,
                          scope: &FileScope,
                          vars: &DeclaredTypes<'_>)
                          -> Option<Resolution> {
        let text = tokens[i].text(src);
        let is_call = tokens.get(i + 1).is_some_and(|t| t.is_symbol('('));
        let after_dot = i > 0 && tokens[i - 1].is_symbol('.');

        if !is_call {
            let class = if after_dot {
                self.qualified_class(src, tokens, i)
            } else {
                scope.resolve_class(&self.classes, text)
            };
            if let Some(class) = class.filter(|c| self.mapped_classes.contains(c)) {
                return Some(Resolution::Resolved { symbol: SymbolId::class(&class) });
            }
            if is_declaration_name(src, tokens, i) {
                return None;
            }
        }

        let mut candidates: Vec<SymbolId> = if is_call {
            self.methods.get(text).cloned().unwrap_or_default()
        } else {
            let mut c = self.fields.get(text).cloned().unwrap_or_default();
            if !after_dot {
                c.extend(self.params.get(text).cloned());
            }
            c
        };
        if candidates.is_empty() {
            return None;
        }
        // Con owner, el candidato tiene que pertenecer a la cadena del
        // receptor; sin owner (nombres intermedios únicos) basta el nombre.
        let (ownerless, owned): (Vec<SymbolId>, Vec<SymbolId>) = candidates.into_iter().partition(|c| c.owner.is_none());
        let mut unknown_receiver = false;
        candidates = if owned.is_empty() {
            ownerless
        } else {
            let chain = self.owner_chain(src, tokens, i, scope, vars);
            let hits = chain.iter()
                            .map(|owner| {
                                owned.iter()
                                     .filter(|c| c.owner.as_deref() == Some(owner.as_str()))
                                     .cloned()
                                     .collect::<Vec<SymbolId>>()
                            })
                            .find(|hits| !hits.is_empty());
            match hits {
                Some(hits) => hits,
                None if chain.is_empty() => {
                    unknown_receiver = true;
                    owned.into_iter().chain(ownerless).collect()
                }
                None if ownerless.is_empty() => return None,
                None => ownerless,
            }
        };
        if candidates.len() > 1 && is_call {
            if let Some(arity) = call_arity(tokens, i + 1) {
                let hits: Vec<SymbolId> = candidates.iter()
                                                    .filter(|c| c.descriptor.as_deref().and_then(method_arity) == Some(arity))
                                                    .cloned()
                                                    .collect();
                if !hits.is_empty() {
                    candidates = hits;
                }
            }
        }
        Some(if candidates.len() == 1 && !unknown_receiver {
                 Resolution::Resolved { symbol: candidates.remove(0) }
             } else {
                 Resolution::Unresolved { candidates }
             })
    }
}

impl SymbolResolver for ScopedResolver {
    fn resolve_file(&self, _path: &str, source: &str) -> Result<Vec<RangeRecord>, AdapterError> {
        let tokens = tokenize(source);
        let vars = DeclaredTypes::scan(source, &tokens);
        let mut records = Vec::new();
        walk(source, &tokens, |scope, i| {
            if let Some(resolution) = self.resolve_occurrence(source, &tokens, i, scope, &vars) {
                let tok = tokens[i];
                records.push(RangeRecord { span: Span { start: tok.start,
                                                        end: tok.end,
                                                        line: tok.line,
                                                        column: tok.column },
                                           text: tok.text(source).to_string(),
                                           resolution });
            }
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retro_table() -> MappingTable {
        let mut t = MappingTable::new();
        t.insert_field("net/minecraft/Foo", "count", "field_1_a");
        t.insert_field("net/minecraft/Bar", "count", "field_2_b");
        t.insert_method("net/minecraft/Foo", "tick", "()V", "func_3_c");
        t.insert_method("net/minecraft/Foo", "tick", "(I)V", "func_4_d");
        t.insert_method("net/minecraft/Bar", "tick", "()V", "func_5_e");
        t
    }

    fn resolve(resolver: &ScopedResolver, src: &str) -> Vec<(String, Resolution)> {
        resolver.resolve_file("x.java", src)
                .unwrap()
                .into_iter()
                .map(|r| (r.text, r.resolution))
                .collect()
    }

    fn owner(res: &Resolution) -> Option<&str> {
        match res {
            Resolution::Resolved { symbol } => symbol.owner.as_deref(),
            Resolution::Unresolved { .. } => None,
        }
    }

    #[test]
    fn same_literal_in_different_scopes_resolves_to_distinct_symbols() {
        let src = "package net.minecraft;\n\
                   class Foo { int count; void tick() { count++; } }\n\
                   class Bar { int count; void tick() { this.count = 1; } }\n";
        let records = resolve(&ScopedResolver::new(&retro_table()), src);
        let counts: Vec<Option<&str>> = records.iter()
                                               .filter(|(t, _)| t == "count")
                                               .map(|(_, r)| owner(r))
                                               .collect();
        assert_eq!(counts,
                   vec![Some("net/minecraft/Foo"), Some("net/minecraft/Foo"), Some("net/minecraft/Bar"), Some("net/minecraft/Bar")]);
    }

    #[test]
    fn arity_picks_overload() {
        let src = "package net.minecraft;\nclass Foo { void run() { tick(3); tick(); } }\n";
        let records = resolve(&ScopedResolver::new(&retro_table()), src);
        let descs: Vec<Option<String>> = records.iter()
                                                .map(|(_, r)| match r {
                                                    Resolution::Resolved { symbol } => symbol.descriptor.clone(),
                                                    _ => None,
                                                })
                                                .collect();
        assert_eq!(descs, vec![Some("(I)V".to_string()), Some("()V".to_string())]);
    }

    #[test]
    fn unknown_receiver_stays_unresolved() {
        let src = "package other;\nclass Baz { void run(Object o) { o.tick(); } }\n";
        let records = resolve(&ScopedResolver::new(&retro_table()), src);
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0].1, Resolution::Unresolved { candidates } if candidates.len() == 2));
    }

    #[test]
    fn single_candidate_on_unknown_receiver_is_not_guessed() {
        let mut table = MappingTable::new();
        table.insert_method("net/minecraft/Foo", "size", "()I", "func_1_a");
        let resolver = ScopedResolver::new(&table);

        let src = "class Mine { int f(List<String> l) { return l.size(); } }\n";
        let records = resolve(&resolver, src);
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0].1, Resolution::Unresolved { candidates } if candidates.len() == 1));

        let imported = "import java.util.List;\nclass Mine { int f(List<String> l) { return l.size(); } }\n";
        assert!(resolve(&resolver, imported).is_empty());
    }

    #[test]
    fn developer_names_outside_the_owner_chain_are_not_recorded() {
        let src = "package mod;\nclass Mine { int count; void run() { int tick = 0; count = tick; } }\n";
        assert!(resolve(&ScopedResolver::new(&retro_table()), src).is_empty());
    }

    #[test]
    fn typed_locals_and_parameters_give_the_receiver_owner() {
        let src = "package mod;\n\
                   import net.minecraft.Foo;\n\
                   class Mine { void run(Foo foo) { net.minecraft.Bar bar = null; foo.tick(); bar.count = 1; } }\n";
        let records = resolve(&ScopedResolver::new(&retro_table()), src);
        let owners: Vec<(&str, Option<&str>)> = records.iter().map(|(t, r)| (t.as_str(), owner(r))).collect();
        assert_eq!(owners, vec![("tick", Some("net/minecraft/Foo")), ("count", Some("net/minecraft/Bar"))]);
    }

    #[test]
    fn inherited_members_resolve_through_tree_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let src = "package net.minecraft;\nclass Sub extends Bar { void go() { tick(); count = 2; } }\n";
        fs::create_dir_all(dir.path().join("net/minecraft")).unwrap();
        fs::write(dir.path().join("net/minecraft/Sub.java"), src).unwrap();
        fs::write(dir.path().join("net/minecraft/Bar.java"), "package net.minecraft;\nclass Bar {}\n").unwrap();
        let resolver = ScopedResolver::new(&retro_table()).index_tree(dir.path()).unwrap();
        let records = resolve(&resolver, src);
        assert!(records.iter().all(|(_, r)| owner(r) == Some("net/minecraft/Bar")));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn comments_and_strings_are_not_occurrences() {
        let src = "package net.minecraft;\nclass Foo { String s = \"count\"; /* count */ }\n";
        assert!(resolve(&ScopedResolver::new(&retro_table()), src).is_empty());
    }

    #[test]
    fn validation_mode_rejects_ambiguity() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Baz.java"), "class Baz { void run(Object o) { o.tick(); } }\n").unwrap();
        let resolver = ScopedResolver::new(&retro_table());
        let lenient = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(dir.path())
                                                                                  .unwrap();
        assert_eq!(lenient.unresolved().len(), 1);
        let strict = RangeMapExtractor::new(&resolver,
                                            ExtractOptions { require_fully_resolved: true }).extract(dir.path());
        match strict {
            Err(AdapterError::UnresolvedSymbolAmbiguity { file, line, name, .. }) => {
                assert_eq!(file, "Baz.java");
                assert_eq!(line, 1);
                assert_eq!(name, "tick");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_utf8_sources_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Ok.java"), "class Ok {}\n").unwrap();
        fs::write(dir.path().join("Latin.java"), b"class Latin { String s = \"caf\xe9\"; }\n").unwrap();
        let resolver = ScopedResolver::new(&retro_table());
        let err = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(dir.path())
                                                                              .unwrap_err();
        match err {
            AdapterError::SourceEncoding { file, offset } => {
                assert_eq!(file, "Latin.java");
                assert_eq!(offset, 29);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arity_counts_nested_arguments() {
        let tokens = tokenize("f(a(b, c), new int[]{1, 2}, d)");
        assert_eq!(call_arity(&tokens, 1), Some(3));
        assert_eq!(call_arity(&tokenize("f()"), 1), Some(0));
    }
}
