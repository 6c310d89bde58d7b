//! Stages auxiliares: generación de tablas SRG derivadas y extracción de
//! access transformers de dependencias.

use std::fs;
use std::path::{Path, PathBuf};

use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageRunResult};
use deobf_mapping::srg::{load_srg, write_srg};
use deobf_mapping::{AccessTransformerSet, MappingTable, NameTables};
use log::info;
use serde_json::{json, Value};

use super::{ids, path_strings, required_input};
use crate::dependencies::extract_dependency_ats;
use crate::error::AdapterError;

pub const NOTCH_SRG: &str = "notch-srg.srg";
pub const NOTCH_MCP: &str = "notch-mcp.srg";
pub const SRG_MCP: &str = "srg-mcp.srg";
pub const MCP_SRG: &str = "mcp-srg.srg";
pub const MCP_NOTCH: &str = "mcp-notch.srg";

pub const DEPENDENCY_AT_FILE: &str = "dependency_at.cfg";

/// Carga una de las tablas producidas por `genSrgs`.
pub fn generated_table(dir: &Path, file: &str) -> Result<MappingTable, AdapterError> {
    Ok(load_srg(&dir.join(file))?)
}

/// Tabla intermedio -> legible con owners, derivada de ofuscado -> intermedio
/// y de los CSV. Las clases no cambian entre ambos dominios.
pub fn srg_to_mcp(notch_srg: &MappingTable, names: &NameTables) -> MappingTable {
    let mut out = MappingTable::new();
    for (owner, _, srg) in notch_srg.fields() {
        let mcp = names.fields.get(srg).map_or(srg, |e| e.name.as_str());
        out.insert_field(&notch_srg.remap_class(owner), srg, mcp);
    }
    for (owner, _, desc, srg) in notch_srg.methods() {
        let mcp = names.methods.get(srg).map_or(srg, |e| e.name.as_str());
        out.insert_method(&notch_srg.remap_class(owner), srg, &notch_srg.remap_descriptor(desc), mcp);
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct GenerateSrgsStage;

impl GenerateSrgsStage {
    fn generate(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let notch_srg = load_srg(required_input(ctx, ids::INPUT_SRG)?)?;
        let names = NameTables::load_dir(required_input(ctx, ids::INPUT_MCP_NAMES)?)?;
        let notch_mcp = notch_srg.with_names(&names);
        let srg_mcp = srg_to_mcp(&notch_srg, &names);

        fs::create_dir_all(&ctx.output).map_err(|e| AdapterError::io(&ctx.output, e))?;
        let tables = [(NOTCH_SRG, notch_srg.clone()),
                      (NOTCH_MCP, notch_mcp.clone()),
                      (MCP_NOTCH, notch_mcp.inverse()),
                      (SRG_MCP, srg_mcp.clone()),
                      (MCP_SRG, srg_mcp.inverse())];
        for (file, table) in &tables {
            let path = ctx.output.join(file);
            fs::write(&path, write_srg(table)).map_err(|e| AdapterError::io(&path, e))?;
        }
        info!("generated {} srg files ({} symbols)", tables.len(), notch_srg.len());
        Ok(Some(json!({"symbols": notch_srg.len()})))
    }
}

impl StageDefinition for GenerateSrgsStage {
    fn id(&self) -> &str {
        ids::GEN_SRGS
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Auxiliary
    }

    fn base_params(&self) -> Value {
        json!({"outputs": [NOTCH_SRG, NOTCH_MCP, MCP_NOTCH, SRG_MCP, MCP_SRG]})
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.generate(ctx).into()
    }
}

/// Reúne los `*_at.cfg` de los bundles de dependencias en un único fichero.
/// Desactivado, produce un fichero vacío.
#[derive(Debug, Clone)]
pub struct DependencyAtStage {
    bundles: Vec<PathBuf>,
    enabled: bool,
}

impl DependencyAtStage {
    pub fn new(bundles: Vec<PathBuf>, enabled: bool) -> Self {
        Self { bundles, enabled }
    }

    fn collect(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let set = if self.enabled {
            extract_dependency_ats(&self.bundles)?
        } else {
            AccessTransformerSet::new()
        };
        fs::create_dir_all(&ctx.output).map_err(|e| AdapterError::io(&ctx.output, e))?;
        let path = ctx.output.join(DEPENDENCY_AT_FILE);
        fs::write(&path, set.to_cfg_string()).map_err(|e| AdapterError::io(&path, e))?;
        Ok(Some(json!({"transformers": set.len()})))
    }
}

impl StageDefinition for DependencyAtStage {
    fn id(&self) -> &str {
        ids::DEP_ATS
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Auxiliary
    }

    fn base_params(&self) -> Value {
        json!({"bundles": path_strings(&self.bundles), "enabled": self.enabled})
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.collect(ctx).into()
    }
}
