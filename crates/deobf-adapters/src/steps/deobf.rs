//! DeobfuscateStage: binario ofuscado -> binario renombrado (o con
//! marcadores, para el camino del decompilador).

use std::path::PathBuf;

use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageRunResult};
use log::debug;
use serde_json::{json, Value};

use super::mappings::{generated_table, NOTCH_MCP, NOTCH_SRG};
use super::{ids, load_transformers, path_strings, required_input};
use crate::deobfuscator::BinaryDeobfuscator;
use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct DeobfuscateStage {
    id: &'static str,
    table: &'static str,
    apply_markers: bool,
    transformers: Vec<PathBuf>,
}

impl DeobfuscateStage {
    /// Binario ejecutable con nombres legibles.
    pub fn mcp(transformers: Vec<PathBuf>) -> Self {
        Self { id: ids::DEOBF_MCP,
               table: NOTCH_MCP,
               apply_markers: false,
               transformers }
    }

    /// Binario con marcadores de nombre intermedio, entrada del decompilador.
    pub fn srg(transformers: Vec<PathBuf>) -> Self {
        Self { id: ids::DEOBF_SRG,
               table: NOTCH_SRG,
               apply_markers: true,
               transformers }
    }

    fn deobfuscate(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let input = required_input(ctx, ids::INPUT_MC)?;
        let table = generated_table(required_input(ctx, ids::GEN_SRGS)?, self.table)?;
        let ats = load_transformers(&self.transformers, ctx)?;
        debug!("{}: table={} ats={} markers={}", self.id, self.table, ats.len(), self.apply_markers);
        let report = BinaryDeobfuscator::new(&table, &ats, self.apply_markers).deobfuscate_bundle(input, &ctx.output)?;
        Ok(serde_json::to_value(report).ok())
    }
}

impl StageDefinition for DeobfuscateStage {
    fn id(&self) -> &str {
        self.id
    }

    fn stage(&self) -> ArtifactStage {
        if self.apply_markers {
            ArtifactStage::DeobfSrcRaw
        } else {
            ArtifactStage::DeobfBin
        }
    }

    fn base_params(&self) -> Value {
        json!({
            "table": self.table,
            "applyMarkers": self.apply_markers,
            "accessTransformers": path_strings(&self.transformers),
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.deobfuscate(ctx).into()
    }
}
