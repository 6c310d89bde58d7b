use std::path::PathBuf;

use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageRunResult};
use serde_json::{json, Value};

use super::{ids, path_strings, required_input};
use crate::decompiler::{CompilerAdapter, DecompilerAdapter};
use crate::error::AdapterError;

/// decompileMc: binario con marcadores -> fuentes crudas.
#[derive(Clone)]
pub struct DecompileStage {
    adapter: DecompilerAdapter,
    classpath: Vec<PathBuf>,
}

impl DecompileStage {
    pub fn new(adapter: DecompilerAdapter, classpath: Vec<PathBuf>) -> Self {
        Self { adapter, classpath }
    }

    fn decompile(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let input = required_input(ctx, ids::DEOBF_SRG)?;
        let files = self.adapter.decompile(input, &self.classpath, &ctx.output)?;
        Ok(Some(json!({"files": files})))
    }
}

impl StageDefinition for DecompileStage {
    fn id(&self) -> &str {
        ids::DECOMPILE
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Decompiled
    }

    fn base_params(&self) -> Value {
        json!({"decompiler": self.adapter.describe(), "classpath": path_strings(&self.classpath)})
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.decompile(ctx).into()
    }
}

/// recompileMc: fuentes remapeadas -> clases compiladas.
#[derive(Clone)]
pub struct RecompileStage {
    adapter: CompilerAdapter,
    classpath: Vec<PathBuf>,
}

impl RecompileStage {
    pub fn new(adapter: CompilerAdapter, classpath: Vec<PathBuf>) -> Self {
        Self { adapter, classpath }
    }

    fn compile(&self, ctx: &ExecutionContext) -> Result<Option<Value>, AdapterError> {
        let sources = required_input(ctx, ids::REMAP)?;
        let files = self.adapter.compile(sources, &self.classpath, &ctx.output)?;
        Ok(Some(json!({"sources": files})))
    }
}

impl StageDefinition for RecompileStage {
    fn id(&self) -> &str {
        ids::RECOMPILE
    }

    fn stage(&self) -> ArtifactStage {
        ArtifactStage::CompiledDev
    }

    fn base_params(&self) -> Value {
        json!({"compiler": self.adapter.describe(), "classpath": path_strings(&self.classpath)})
    }

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.compile(ctx).into()
    }
}
