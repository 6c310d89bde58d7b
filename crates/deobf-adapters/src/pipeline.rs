//! Cableado del DAG de deobfuscación sobre `PipelineBuilder`.
//!
//! Salidas por patrón `(appendage, classifier)`:
//! - `deobfMcMCP`     -> (`Bin`, "")
//! - `deobfMcSRG`     -> ("", `srgBin`)
//! - `decompileMc`    -> ("", `decomp`)
//! - `fixMcSources`   -> ("", `decompFixed`)
//! - `remapMcSources` -> (`Src`, `sources`)
//! - `recompileMc`    -> (`Src`, "")

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deobf_core::{ArtifactHandle, ArtifactStage, CoreEngineError, OutputSpec, PipelineBuilder, StageSpec};
use log::debug;

use crate::decompiler::{CompilerAdapter, DecompilerAdapter};
use crate::patcher::SourcePatcher;
use crate::rangemap::ExtractOptions;
use crate::steps::{content_hashes, ids, DecompileStage, DependencyAtStage, DeobfuscateStage, ExtractRangeMapStage,
                   GenerateSrgsStage, InputStage, PatchStage, RecompileStage, RemapStage, RetromapStage};
use crate::tool::ExternalTool;

/// Todo lo que el driver aporta para configurar el pipeline.
#[derive(Clone)]
pub struct PipelineInputs {
    /// Bundle binario ofuscado.
    pub minecraft: PathBuf,
    /// Fichero `notch-srg.srg`.
    pub srg: PathBuf,
    /// Directorio con `fields.csv`, `methods.csv` y `params.csv`.
    pub mcp_names: PathBuf,
    pub patches: PathBuf,
    pub inject: Option<PathBuf>,
    pub access_transformers: Vec<PathBuf>,
    /// Bundles de dependencias donde buscar `*_at.cfg`.
    pub dependency_bundles: Vec<PathBuf>,
    pub use_dep_ats: bool,
    pub classpath: Vec<PathBuf>,
    pub decompiler: Arc<dyn ExternalTool>,
    pub compiler: Arc<dyn ExternalTool>,
    pub patcher: SourcePatcher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineHandles {
    pub bin_deobf: ArtifactHandle,
    pub decomp_deobf: ArtifactHandle,
    pub decompiled: ArtifactHandle,
    pub patched: ArtifactHandle,
    pub dev_remapped: ArtifactHandle,
    pub recompiled: ArtifactHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetromapHandles {
    pub range_map: ArtifactHandle,
    pub retromapped: ArtifactHandle,
}

fn with_hashes(spec: StageSpec, key: &str, paths: &[PathBuf]) -> StageSpec {
    if paths.is_empty() {
        return spec;
    }
    spec.deferred(key, content_hashes(paths.to_vec()))
}

/// Registra todos los stages del pipeline principal. Las rutas de salida se
/// resuelven recién en `finalize`.
pub fn build_pipeline(builder: &mut PipelineBuilder, inputs: &PipelineInputs) -> Result<PipelineHandles, CoreEngineError> {
    builder.observe_transformers(!inputs.access_transformers.is_empty() || inputs.use_dep_ats);

    let input = |id: &str, stage: ArtifactStage, path: &Path| {
        StageSpec::new(InputStage::new(id, stage, path), OutputSpec::Fixed(path.to_path_buf()))
    };
    builder.register(input(ids::INPUT_MC, ArtifactStage::ObfBin, &inputs.minecraft))?;
    builder.register(input(ids::INPUT_SRG, ArtifactStage::Auxiliary, &inputs.srg))?;
    builder.register(input(ids::INPUT_MCP_NAMES, ArtifactStage::Auxiliary, &inputs.mcp_names))?;
    builder.register(input(ids::INPUT_PATCHES, ArtifactStage::Auxiliary, &inputs.patches))?;
    if let Some(inject) = &inputs.inject {
        builder.register(input(ids::INPUT_INJECTS, ArtifactStage::Auxiliary, inject))?;
    }

    builder.register(StageSpec::new(GenerateSrgsStage, OutputSpec::pattern("", "srgs")).input(ids::INPUT_SRG)
                                                                                      .input(ids::INPUT_MCP_NAMES))?;
    let dep_ats = DependencyAtStage::new(inputs.dependency_bundles.clone(), inputs.use_dep_ats);
    let dep_at_bundles: &[PathBuf] = if inputs.use_dep_ats { &inputs.dependency_bundles } else { &[] };
    builder.register(with_hashes(StageSpec::new(dep_ats, OutputSpec::pattern("", "depATs")),
                                 "bundleHashes",
                                 dep_at_bundles))?;

    let ats = &inputs.access_transformers;
    let deobf = |stage: DeobfuscateStage, output: OutputSpec| {
        with_hashes(StageSpec::new(stage, output).input(ids::INPUT_MC)
                                                 .input(ids::GEN_SRGS)
                                                 .input(ids::DEP_ATS),
                    "accessTransformerHashes",
                    ats)
    };
    let bin_deobf = builder.register(deobf(DeobfuscateStage::mcp(ats.clone()), OutputSpec::pattern("Bin", "")))?;
    let decomp_deobf = builder.register(deobf(DeobfuscateStage::srg(ats.clone()), OutputSpec::pattern("", "srgBin")))?;

    let decompile = DecompileStage::new(DecompilerAdapter::new(inputs.decompiler.clone()), inputs.classpath.clone());
    let decompiled = builder.register(with_hashes(StageSpec::new(decompile, OutputSpec::pattern("", "decomp")).after(&decomp_deobf),
                                                  "classpathHashes",
                                                  &inputs.classpath))?;

    let mut patch = StageSpec::new(PatchStage::new(inputs.patcher.clone()), OutputSpec::pattern("", "decompFixed")).after(&decompiled)
                                                                                                                 .input(ids::INPUT_PATCHES);
    if inputs.inject.is_some() {
        patch = patch.input(ids::INPUT_INJECTS);
    }
    let patched = builder.register(patch)?;

    let remap = StageSpec::new(RemapStage::new(ats.clone(), inputs.classpath.clone()),
                               OutputSpec::pattern("Src", "sources")).after(&patched)
                                                                     .input(ids::INPUT_MCP_NAMES)
                                                                     .input(ids::DEP_ATS);
    let dev_remapped = builder.register(with_hashes(with_hashes(remap, "accessTransformerHashes", ats),
                                                    "classpathHashes",
                                                    &inputs.classpath))?;

    let recompile = RecompileStage::new(CompilerAdapter::new(inputs.compiler.clone()), inputs.classpath.clone());
    let recompiled = builder.register(with_hashes(StageSpec::new(recompile, OutputSpec::pattern("Src", "")).after(&dev_remapped),
                                                  "classpathHashes",
                                                  &inputs.classpath))?;

    debug!("build_pipeline: {} stages registered", builder.len());
    Ok(PipelineHandles { bin_deobf,
                         decomp_deobf,
                         decompiled,
                         patched,
                         dev_remapped,
                         recompiled })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn register_retromap(builder: &mut PipelineBuilder,
                     prefix: &str,
                     set: &str,
                     source_dir: &Path,
                     out_dir: &Path,
                     transformers: &[PathBuf],
                     options: ExtractOptions)
                     -> Result<RetromapHandles, CoreEngineError> {
    let input_id = format!("input{prefix}Sources{set}");
    let extract_id = format!("extractRangemap{prefix}{set}");
    let retromap_id = format!("retromap{prefix}{set}");
    let file_stem = format!("{}{set}", prefix.to_lowercase());

    builder.register(StageSpec::new(InputStage::new(&input_id, ArtifactStage::DevRemapped, source_dir),
                                    OutputSpec::Fixed(source_dir.to_path_buf())))?;

    let mut extract_stage = ExtractRangeMapStage::new(&extract_id, &input_id, transformers.to_vec());
    if options.require_fully_resolved {
        extract_stage = extract_stage.validating();
    }
    let extract = StageSpec::new(extract_stage, OutputSpec::Fixed(out_dir.join(format!("rangemap-{file_stem}"))))
        .input(input_id.clone())
        .input(ids::GEN_SRGS)
        .input(ids::DEP_ATS)
        .input(ids::DEOBF_MCP);
    let range_map = builder.register(with_hashes(extract, "accessTransformerHashes", transformers))?;

    let retromap = StageSpec::new(RetromapStage::new(&retromap_id, &input_id, &extract_id, transformers.to_vec()),
                                  OutputSpec::Fixed(out_dir.join(format!("retromapped-{file_stem}"))))
        .input(input_id)
        .after(&range_map)
        .input(ids::GEN_SRGS)
        .input(ids::DEP_ATS);
    let retromapped = builder.register(with_hashes(retromap, "accessTransformerHashes", transformers))?;
    Ok(RetromapHandles { range_map,
                         retromapped })
}

/// Range map + retromapeo de un source set, tanto del directorio original
/// como del directorio "replaced" (fuentes con tokens ya sustituidos).
/// Requiere que `build_pipeline` haya registrado antes los stages base.
pub fn add_retromap(builder: &mut PipelineBuilder,
                    source_set: &str,
                    source_dir: &Path,
                    replaced_dir: &Path,
                    out_dir: &Path,
                    transformers: &[PathBuf])
                    -> Result<(RetromapHandles, RetromapHandles), CoreEngineError> {
    add_retromap_with(builder,
                      source_set,
                      source_dir,
                      replaced_dir,
                      out_dir,
                      transformers,
                      ExtractOptions::default())
}

/// Como `add_retromap`, con opciones de extracción explícitas (modo
/// validación).
pub fn add_retromap_with(builder: &mut PipelineBuilder,
                         source_set: &str,
                         source_dir: &Path,
                         replaced_dir: &Path,
                         out_dir: &Path,
                         transformers: &[PathBuf],
                         options: ExtractOptions)
                         -> Result<(RetromapHandles, RetromapHandles), CoreEngineError> {
    let set = capitalize(source_set);
    let plain = register_retromap(builder, "", &set, source_dir, out_dir, transformers, options)?;
    let replaced = register_retromap(builder, "Replaced", &set, replaced_dir, out_dir, transformers, options)?;
    Ok((plain, replaced))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_source_set_names() {
        assert_eq!(capitalize("main"), "Main");
        assert_eq!(capitalize("api"), "Api");
        assert_eq!(capitalize(""), "");
    }
}
