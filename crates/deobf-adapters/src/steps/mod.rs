//! Stages concretos del pipeline de deobfuscación.
//!
//! Cada stage lee sus inputs de `ExecutionContext::inputs` (bundles ya
//! promovidos) y escribe en `ctx.output`, que es staging privado. Los ficheros
//! externos que no son inputs del grafo (classpath, ATs del proyecto) entran en
//! el fingerprint a través de un parámetro diferido con su hash.

pub mod decompile;
pub mod deobf;
pub mod input;
pub mod mappings;
pub mod patch;
pub mod remap;

use std::path::{Path, PathBuf};

use deobf_core::hashing::hash_path;
use deobf_core::{BuildContext, ExecutionContext};
use deobf_mapping::AccessTransformerSet;
use serde_json::{json, Value};

use crate::error::AdapterError;

pub use decompile::{DecompileStage, RecompileStage};
pub use deobf::DeobfuscateStage;
pub use input::InputStage;
pub use mappings::{DependencyAtStage, GenerateSrgsStage};
pub use patch::PatchStage;
pub use remap::{ExtractRangeMapStage, RemapStage, RetromapStage};

/// Ids estables de los stages.
pub mod ids {
    pub const INPUT_MC: &str = "inputMc";
    pub const INPUT_SRG: &str = "inputSrg";
    pub const INPUT_MCP_NAMES: &str = "inputMcpNames";
    pub const INPUT_PATCHES: &str = "inputPatches";
    pub const INPUT_INJECTS: &str = "inputInjects";
    pub const GEN_SRGS: &str = "genSrgs";
    pub const DEP_ATS: &str = "extractDependencyATs";
    pub const DEOBF_MCP: &str = "deobfMcMCP";
    pub const DEOBF_SRG: &str = "deobfMcSRG";
    pub const DECOMPILE: &str = "decompileMc";
    pub const PATCH: &str = "fixMcSources";
    pub const REMAP: &str = "remapMcSources";
    pub const RECOMPILE: &str = "recompileMc";
}

pub(crate) fn required_input<'c>(ctx: &'c ExecutionContext, stage_id: &str) -> Result<&'c Path, AdapterError> {
    ctx.input_location(stage_id)
       .ok_or_else(|| AdapterError::MissingInput(format!("{}: input '{stage_id}' not wired", ctx.stage_id)))
}

pub(crate) fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

/// Parámetro diferido con el hash de contenido de cada ruta. Se calcula en
/// `finalize`, no al registrar.
pub fn content_hashes(paths: Vec<PathBuf>) -> impl FnOnce(&BuildContext) -> Result<Value, String> + Send + 'static {
    move |_| {
        let mut hashes = Vec::with_capacity(paths.len());
        for p in &paths {
            let h = hash_path(p).map_err(|e| format!("{}: {e}", p.display()))?;
            hashes.push(json!(h));
        }
        Ok(Value::Array(hashes))
    }
}

/// ATs del proyecto más los extraídos de dependencias, si el stage los
/// recibe como input.
pub(crate) fn load_transformers(files: &[PathBuf], ctx: &ExecutionContext) -> Result<AccessTransformerSet, AdapterError> {
    let mut set = AccessTransformerSet::new();
    for file in files {
        set.merge(&AccessTransformerSet::load(file)?);
    }
    if let Some(dir) = ctx.input_location(ids::DEP_ATS) {
        let file = dir.join(mappings::DEPENDENCY_AT_FILE);
        if file.is_file() {
            set.merge(&AccessTransformerSet::load(&file)?);
        }
    }
    Ok(set)
}
