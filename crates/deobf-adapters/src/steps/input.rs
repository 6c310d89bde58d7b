//! InputStage (Source): un bundle o fichero que ya existe en disco.

use std::path::{Path, PathBuf};

use deobf_core::hashing::hash_path;
use deobf_core::{ArtifactStage, ExecutionContext, StageDefinition, StageKind, StageRunResult};
use serde_json::{json, Value};

use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct InputStage {
    id: String,
    stage: ArtifactStage,
    path: PathBuf,
}

impl InputStage {
    pub fn new(id: &str, stage: ArtifactStage, path: &Path) -> Self {
        Self { id: id.to_string(),
               stage,
               path: path.to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StageDefinition for InputStage {
    fn id(&self) -> &str {
        &self.id
    }

    fn stage(&self) -> ArtifactStage {
        self.stage
    }

    fn base_params(&self) -> Value {
        json!({"path": self.path.display().to_string()})
    }

    fn run(&self, _ctx: &ExecutionContext) -> StageRunResult {
        match hash_path(&self.path) {
            Ok(content_hash) => StageRunResult::Existing { content_hash },
            Err(e) => StageRunResult::failure(AdapterError::MissingInput(format!("{}: {e}", self.path.display()))),
        }
    }

    fn kind(&self) -> StageKind {
        StageKind::Source
    }
}
