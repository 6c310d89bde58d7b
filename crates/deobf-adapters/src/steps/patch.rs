//! fixMcSources: parches + inyecciones + formato sobre las fuentes
//! decompiladas.

use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageRunResult};
use serde_json::{json, Value};

use super::{ids, required_input};
use crate::error::AdapterError;
use crate::patcher::{PatchSet, SourcePatcher};

#[derive(Clone, Default)]
pub struct PatchStage {
    patcher: SourcePatcher,
}

impl PatchStage {
    pub fn new(patcher: SourcePatcher) -> Self {
        Self { patcher }
    }

    fn patch(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let decompiled = required_input(ctx, ids::DECOMPILE)?;
        let patches = PatchSet::load(required_input(ctx, ids::INPUT_PATCHES)?)?;
        let inject = ctx.input_location(ids::INPUT_INJECTS);
        let report = self.patcher.run(decompiled, &patches, inject, &ctx.output)?;
        Ok(serde_json::to_value(report).ok())
    }
}

impl StageDefinition for PatchStage {
    fn id(&self) -> &str {
        ids::PATCH
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Patched
    }

    fn base_params(&self) -> Value {
        json!({"patcher": self.patcher.describe()})
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.patch(ctx).into()
    }
}
