//! Subpipeline de dependencias: deobfusca módulos de terceros y los publica
//! bajo coordenadas sintéticas `deobf.<group>:<name>:<version>`.

use std::fmt;
use std::path::{Path, PathBuf};

use deobf_core::hashing::{hash_path, hash_value};
use deobf_core::ArtifactStore;
use deobf_mapping::{AccessTransformerSet, MappingTable};
use deobf_persistence::FsArtifactStore;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bundle::{is_access_transformer, list_files};
use crate::deobfuscator::BinaryDeobfuscator;
use crate::error::AdapterError;
use crate::rangemap::{classpath_classes, ExtractOptions, RangeMapExtractor, ScopedResolver};
use crate::remapper::{RemapDirection, RemapRules, SymbolRemapper};

/// Configuraciones que admiten deobfuscación y su configuración resuelta.
pub const DEOBF_CONFIGURATIONS: &[(&str, &str)] =
    &[("deobfCompile", "deobfCompileResolved"), ("deobfProvided", "deobfProvidedResolved")];

pub const SOURCES_CLASSIFIER: &str = "sources";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    pub group: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
}

impl DependencyDescriptor {
    pub fn new(group: &str, name: &str, version: &str) -> Self {
        Self { group: group.to_string(),
               name: name.to_string(),
               version: version.to_string(),
               classifier: None }
    }

    /// `group:name:version[:classifier]`.
    pub fn parse(coordinate: &str) -> Option<Self> {
        let parts: Vec<&str> = coordinate.split(':').collect();
        match parts[..] {
            [g, n, v] if !g.is_empty() && !n.is_empty() && !v.is_empty() => Some(Self::new(g, n, v)),
            [g, n, v, c] if !g.is_empty() && !n.is_empty() && !v.is_empty() => {
                Some(Self::new(g, n, v).with_classifier(c))
            }
            _ => None,
        }
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = (!classifier.is_empty()).then(|| classifier.to_string());
        self
    }

    /// Coordenada publicada tras la deobfuscación.
    pub fn deobf(&self) -> Self {
        Self { group: format!("deobf.{}", self.group),
               name: self.name.clone(),
               version: self.version.clone(),
               classifier: self.classifier.clone() }
    }

    pub fn coordinate(&self) -> String {
        self.to_string()
    }

    /// Ruta estilo maven, relativa al repositorio:
    /// `<group/as/path>/<name>/<version>/<name>-<version>[-classifier]`.
    pub fn maven_path(&self) -> PathBuf {
        let mut path: PathBuf = self.group.split('.').collect();
        path.push(&self.name);
        path.push(&self.version);
        let file = match &self.classifier {
            Some(c) => format!("{}-{}-{c}", self.name, self.version),
            None => format!("{}-{}", self.name, self.version),
        };
        path.push(file);
        path
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{c}")?;
        }
        Ok(())
    }
}

/// Dependencia tal como se declaró en la configuración.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredDependency {
    Module(DependencyDescriptor),
    /// Fichero suelto, sin coordenadas.
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub descriptor: DependencyDescriptor,
    /// Bundle binario explotado.
    pub bundle: PathBuf,
}

/// Frontera con el resolvedor de dependencias de la build.
pub trait DependencyResolver: Send + Sync {
    fn declared(&self, configuration: &str) -> Vec<DeclaredDependency>;

    fn resolve(&self, configuration: &str) -> Result<Vec<ResolvedModule>, AdapterError>;

    /// Bundles de fuentes disponibles para un módulo, en el orden en que el
    /// resolvedor los entrega.
    fn sources(&self, module: &DependencyDescriptor) -> Vec<PathBuf>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedModule {
    pub descriptor: DependencyDescriptor,
    pub binary: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfiguration {
    pub name: String,
    pub modules: Vec<PublishedModule>,
}

impl ResolvedConfiguration {
    pub fn coordinates(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.descriptor.coordinate()).collect()
    }
}

pub fn resolved_configuration_name(configuration: &str) -> String {
    DEOBF_CONFIGURATIONS.iter()
                        .find(|(c, _)| *c == configuration)
                        .map(|(_, r)| r.to_string())
                        .unwrap_or_else(|| format!("{configuration}Resolved"))
}

pub struct DependencyRemapper<'a> {
    table: &'a MappingTable,
    /// Fingerprint de la tabla; forma parte del de cada módulo publicado.
    table_fingerprint: String,
    deps_dir: PathBuf,
    classpath: Vec<PathBuf>,
    store: FsArtifactStore,
}

impl<'a> DependencyRemapper<'a> {
    pub fn new(table: &'a MappingTable, table_fingerprint: &str, deps_dir: &Path) -> Self {
        Self { table,
               table_fingerprint: table_fingerprint.to_string(),
               deps_dir: deps_dir.to_path_buf(),
               classpath: Vec::new(),
               store: FsArtifactStore::new() }
    }

    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    /// Valida la configuración completa y después remapea cada módulo en
    /// paralelo.
    pub fn remap_configuration(&self, resolver: &dyn DependencyResolver, configuration: &str)
                               -> Result<ResolvedConfiguration, AdapterError> {
        for dep in resolver.declared(configuration) {
            if let DeclaredDependency::File(path) = dep {
                return Err(AdapterError::InvalidDependencySource { configuration: configuration.to_string(),
                                                                   dependency: path.display().to_string() });
            }
        }
        let modules = resolver.resolve(configuration)?;
        debug!("remap_configuration:start configuration={configuration} modules={}", modules.len());
        let published = modules.par_iter()
                               .map(|m| self.remap_module(resolver, m))
                               .collect::<Result<Vec<_>, _>>()?;
        let resolved = ResolvedConfiguration { name: resolved_configuration_name(configuration),
                                               modules: published };
        info!("{} -> {}: {:?}", configuration, resolved.name, resolved.coordinates());
        Ok(resolved)
    }

    fn remap_module(&self, resolver: &dyn DependencyResolver, module: &ResolvedModule)
                    -> Result<PublishedModule, AdapterError> {
        let descriptor = module.descriptor.deobf();
        let bundle_hash = hash_path(&module.bundle).map_err(|e| AdapterError::io(&module.bundle, e))?;
        let binary = self.deps_dir.join(descriptor.maven_path());
        let fingerprint = hash_value(&json!({"kind": "bin", "bundle": bundle_hash, "table": self.table_fingerprint}));
        if !self.store.is_fresh(&binary, &fingerprint) {
            let staging = self.store.begin(&binary)?;
            let ats = AccessTransformerSet::new();
            let result = BinaryDeobfuscator::new(self.table, &ats, false).deobfuscate_bundle(&module.bundle, &staging);
            self.finish(result.map(|_| ()), &staging, &binary, &fingerprint)?;
        }

        let candidates = resolver.sources(&module.descriptor);
        if candidates.len() > 1 {
            debug!("{}: {} sources artifacts, using the first", module.descriptor, candidates.len());
        }
        let sources = match candidates.into_iter().next() {
            Some(src) => Some(self.remap_sources(&descriptor, &src, &binary)?),
            None => None,
        };
        Ok(PublishedModule { descriptor,
                             binary,
                             sources })
    }

    fn remap_sources(&self, descriptor: &DependencyDescriptor, src: &Path, binary: &Path) -> Result<PathBuf, AdapterError> {
        let target = self.deps_dir
                         .join(descriptor.clone().with_classifier(SOURCES_CLASSIFIER).maven_path());
        let src_hash = hash_path(src).map_err(|e| AdapterError::io(src, e))?;
        let fingerprint = hash_value(&json!({"kind": "sources", "bundle": src_hash, "table": self.table_fingerprint}));
        if self.store.is_fresh(&target, &fingerprint) {
            return Ok(target);
        }
        let mut classpath = self.classpath.clone();
        classpath.push(binary.to_path_buf());
        let resolver = ScopedResolver::new(self.table).with_classes(classpath_classes(&classpath)?)
                                                      .index_tree(src)?;
        let map = RangeMapExtractor::new(&resolver, ExtractOptions::default()).extract(src)?;
        let rules = RemapRules::new();
        let staging = self.store.begin(&target)?;
        let result = SymbolRemapper::new(self.table, &rules, RemapDirection::Dev).remap_tree(src, &map, &staging);
        self.finish(result.map(|_| ()), &staging, &target, &fingerprint)?;
        Ok(target)
    }

    fn finish(&self, result: Result<(), AdapterError>, staging: &Path, target: &Path, fingerprint: &str) -> Result<(), AdapterError> {
        match result {
            Ok(()) => Ok(self.store.commit(staging, target, fingerprint)?),
            Err(e) => {
                self.store.abort(staging);
                Err(e)
            }
        }
    }
}

/// Reúne los `*_at.cfg` de la raíz y de `META-INF/` de cada bundle.
pub fn extract_dependency_ats(bundles: &[PathBuf]) -> Result<AccessTransformerSet, AdapterError> {
    let mut set = AccessTransformerSet::new();
    for bundle in bundles.iter().filter(|b| b.is_dir()) {
        for (rel, path) in list_files(bundle)? {
            let file_name = rel.strip_prefix("META-INF/").unwrap_or(&rel);
            if file_name.contains('/') || !is_access_transformer(file_name) {
                continue;
            }
            info!("Found AccessTransformer: {file_name}");
            set.merge(&AccessTransformerSet::load(&path)?);
        }
    }
    Ok(set)
}
