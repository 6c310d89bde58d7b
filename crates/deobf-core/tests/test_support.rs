#![allow(dead_code)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageKind, StageRunResult};
use serde_json::{json, Value};

/// Stage de prueba: cuenta ejecuciones y falla si `fail` está activo.
pub struct CountingStage {
    pub id: String,
    pub kind: StageKind,
    pub fail: bool,
    pub params: Value,
    pub runs: Arc<AtomicUsize>,
}

impl CountingStage {
    pub fn source(id: &str) -> Self {
        Self { id: id.to_string(),
               kind: StageKind::Source,
               fail: false,
               params: json!({}),
               runs: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn transform(id: &str) -> Self {
        Self { kind: StageKind::Transform,
               ..Self::source(id) }
    }

    pub fn failing(id: &str) -> Self {
        Self { fail: true,
               ..Self::transform(id) }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }
}

impl StageDefinition for CountingStage {
    fn id(&self) -> &str {
        &self.id
    }
    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Auxiliary
    }
    fn base_params(&self) -> Value {
        self.params.clone()
    }
    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return StageRunResult::failure(format!("{} exploded", ctx.stage_id));
        }
        match self.kind {
            StageKind::Source => StageRunResult::Existing { content_hash: format!("content-of-{}", self.id) },
            StageKind::Transform => StageRunResult::Success { metadata: None },
        }
    }
    fn kind(&self) -> StageKind {
        self.kind
    }
}
