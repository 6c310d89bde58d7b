//! Driver de la build: traduce la configuración y una petición concreta en un
//! `StageGraph`, lo ejecuta y devuelve las ubicaciones de los artifacts.
//!
//! El subpipeline de dependencias no forma parte del grafo; se lanza aparte
//! con `remap_dependencies` una vez resueltas las configuraciones.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deobf_adapters::bundle::find_access_transformers;
use deobf_adapters::dependencies::DEOBF_CONFIGURATIONS;
use deobf_adapters::{add_retromap_with, build_pipeline, DependencyRemapper, DependencyResolver, ExtractOptions, ExternalTool,
                     PipelineInputs, ProcessTool, ResolvedConfiguration, SourcePatcher};
use deobf_core::hashing::hash_path;
use deobf_core::{ArtifactHandle, BuildContext, EventStore, PipelineBuilder};
use deobf_mapping::{MappingTable, NameTables};
use deobf_persistence::FsArtifactStore;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::BuildConfig;
use crate::errors::DeobfError;
use crate::version::check_version_string;

/// Directorios de un source set a retromapear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSetDirs {
    pub name: String,
    pub source_dir: PathBuf,
    /// Fuentes con tokens ya sustituidos.
    pub replaced_dir: PathBuf,
}

/// Entradas concretas de una build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub minecraft: PathBuf,
    pub srg: PathBuf,
    pub mcp_names: PathBuf,
    pub patches: PathBuf,
    pub inject: Option<PathBuf>,
    pub access_transformers: Vec<PathBuf>,
    /// Directorios de fuentes / recursos donde buscar `*_at.cfg`.
    pub at_source_dirs: Vec<PathBuf>,
    pub dependency_bundles: Vec<PathBuf>,
    pub classpath: Vec<PathBuf>,
    pub source_sets: Vec<SourceSetDirs>,
}

/// Ubicaciones de los artifacts producidos por una build completa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub run_id: Uuid,
    pub dev_binary: PathBuf,
    pub dev_sources: PathBuf,
    pub recompiled: PathBuf,
    /// `(stage id, directorio)` de cada salida retromapeada.
    pub retromapped: Vec<(String, PathBuf)>,
}

pub struct Driver {
    config: BuildConfig,
    decompiler: Arc<dyn ExternalTool>,
    compiler: Arc<dyn ExternalTool>,
}

impl Driver {
    pub fn new(config: BuildConfig) -> Self {
        let cmd = &config.decompiler;
        let mut decompiler = ProcessTool::new("decompiler", cmd.program.clone(), cmd.timeout).with_args(cmd.extra_args.clone());
        if let Some(main) = &cmd.main_class {
            decompiler = decompiler.with_main(cmd.forked_classpath.clone(), main);
        }
        let compiler = ProcessTool::new("javac", config.compiler.clone(), cmd.timeout);
        Self { decompiler: Arc::new(decompiler),
               compiler: Arc::new(compiler),
               config }
    }

    /// Sustituye las herramientas externas (tests, wrappers).
    pub fn with_tools(mut self, decompiler: Arc<dyn ExternalTool>, compiler: Arc<dyn ExternalTool>) -> Self {
        self.decompiler = decompiler;
        self.compiler = compiler;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// ATs explícitos seguidos de los encontrados en `at_source_dirs`, sin
    /// repetir.
    fn access_transformers(&self, request: &BuildRequest) -> Result<Vec<PathBuf>, DeobfError> {
        let mut all = request.access_transformers.clone();
        for found in find_access_transformers(&request.at_source_dirs)? {
            if !all.contains(&found) {
                all.push(found);
            }
        }
        Ok(all)
    }

    fn inputs(&self, request: &BuildRequest, access_transformers: Vec<PathBuf>) -> PipelineInputs {
        PipelineInputs { minecraft: request.minecraft.clone(),
                         srg: request.srg.clone(),
                         mcp_names: request.mcp_names.clone(),
                         patches: request.patches.clone(),
                         inject: request.inject.clone(),
                         access_transformers,
                         dependency_bundles: request.dependency_bundles.clone(),
                         use_dep_ats: self.config.use_dep_ats,
                         classpath: request.classpath.clone(),
                         decompiler: self.decompiler.clone(),
                         compiler: self.compiler.clone(),
                         patcher: SourcePatcher::default() }
    }

    fn retromap_dir(&self) -> PathBuf {
        self.config.cache.project_dir.join("build").join("retromapping")
    }

    /// Configura, finaliza y ejecuta el grafo completo. Cualquier stage
    /// fallido convierte el run entero en error.
    pub fn run<E: EventStore>(&self, request: &BuildRequest, events: &mut E) -> Result<BuildOutcome, DeobfError> {
        if let Some(version) = &self.config.project_version {
            check_version_string(version);
        }
        let patterns = self.config.cache.patterns("minecraft", &self.config.mc_version);
        let mut builder = PipelineBuilder::new(patterns);
        let transformers = self.access_transformers(request)?;
        let handles = build_pipeline(&mut builder, &self.inputs(request, transformers.clone()))?;

        let options = ExtractOptions { require_fully_resolved: self.config.strict_retromap };
        let mut retro = Vec::new();
        for set in &request.source_sets {
            if !set.source_dir.is_dir() || !set.replaced_dir.is_dir() {
                warn!("source set '{}' skipped: {} or {} does not exist",
                      set.name,
                      set.source_dir.display(),
                      set.replaced_dir.display());
                continue;
            }
            let (plain, replaced) = add_retromap_with(&mut builder,
                                                      &set.name,
                                                      &set.source_dir,
                                                      &set.replaced_dir,
                                                      &self.retromap_dir(),
                                                      &transformers,
                                                      options)?;
            retro.push(plain.retromapped);
            retro.push(replaced.retromapped);
        }

        let ctx = BuildContext::new();
        let graph = builder.finalize(&ctx)?;
        debug!("driver: {} stages, locality={:?}", graph.len(), graph.locality());
        let report = graph.execute(events, &FsArtifactStore::new()).into_result()?;

        let location = |handle: &ArtifactHandle| {
            report.artifact_for(handle)
                  .map(|a| a.location.clone())
                  .ok_or_else(|| DeobfError::Config(format!("no artifact for stage '{}'", handle.stage_id)))
        };
        let outcome = BuildOutcome { run_id: report.run_id,
                                     dev_binary: location(&handles.bin_deobf)?,
                                     dev_sources: location(&handles.dev_remapped)?,
                                     recompiled: location(&handles.recompiled)?,
                                     retromapped: retro.iter()
                                                       .map(|h| Ok((h.stage_id.clone(), location(h)?)))
                                                       .collect::<Result<_, DeobfError>>()? };
        info!("build {} finished: sources at {}", outcome.run_id, outcome.dev_sources.display());
        Ok(outcome)
    }

    /// Deobfusca `deobfCompile` y `deobfProvided` con la tabla intermedio ->
    /// legible de `mcp_names`.
    pub fn remap_dependencies(&self,
                              resolver: &dyn DependencyResolver,
                              mcp_names: &Path,
                              classpath: &[PathBuf])
                              -> Result<Vec<ResolvedConfiguration>, DeobfError> {
        let table = MappingTable::from_names(&NameTables::load_dir(mcp_names)?);
        let fingerprint = hash_path(mcp_names)?;
        let remapper = DependencyRemapper::new(&table, &fingerprint, &self.config.deps_dir).with_classpath(classpath.to_vec());
        DEOBF_CONFIGURATIONS.iter()
                            .map(|(configuration, _)| Ok(remapper.remap_configuration(resolver, configuration)?))
                            .collect()
    }
}
