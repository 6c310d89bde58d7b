use serde_json::Value;

use super::run_result::StageRunResult;
use crate::model::{ArtifactStage, ExecutionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// El artifact ya existe en disco; `run` sólo informa su hash de contenido.
    Source,
    Transform,
}

/// Trait que define un stage. Implementaciones deben ser puras respecto a
/// inputs + params: misma entrada, misma salida byte a byte.
pub trait StageDefinition: Send + Sync {
    /// Identificador estable y único dentro del grafo.
    fn id(&self) -> &str;

    /// Etiqueta del bundle producido.
    fn stage(&self) -> ArtifactStage;

    /// Parámetros base deterministas. Participan del fingerprint.
    fn base_params(&self) -> Value;

    fn run(&self, ctx: &ExecutionContext) -> StageRunResult;

    fn kind(&self) -> StageKind {
        StageKind::Transform
    }
}
