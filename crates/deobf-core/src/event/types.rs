//! Tipos de evento del pipeline y estructura `PipelineEvent`.
//!
//! - Cada ejecución de un `StageGraph` emite eventos a un `EventStore`
//!   append-only.
//! - `replay` reconstruye el estado de cada stage a partir de ellos sin
//!   depender de estructuras mutables.
//! - El enum `PipelineEventKind` es el contrato observable del executor.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineEventKind {
    /// Primer evento de un run: fija el hash de la definición del grafo.
    PipelineInitialized { definition_hash: String, stage_count: usize },
    StageStarted { stage_id: String, fingerprint: String },
    /// El stage produjo su salida y el store la promovió.
    StageFinished { stage_id: String, fingerprint: String, location: String },
    /// La salida ya existía con el mismo fingerprint; el stage no se ejecutó.
    CacheHit { stage_id: String, fingerprint: String, location: String },
    /// Error terminal del stage. Sus dependientes no se ejecutan.
    StageFailed { stage_id: String, fingerprint: String, error: String },
    /// Stage no ejecutable porque un input falló o quedó bloqueado.
    StageSkipped { stage_id: String, blocked_by: String },
    /// Todos los stages terminaron bien; fingerprint agregado del run.
    PipelineCompleted { pipeline_fingerprint: String },
    PipelineFailed { failed: Vec<String> },
}

impl PipelineEventKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            PipelineEventKind::PipelineInitialized { .. } => "PipelineInitialized",
            PipelineEventKind::StageStarted { .. } => "StageStarted",
            PipelineEventKind::StageFinished { .. } => "StageFinished",
            PipelineEventKind::CacheHit { .. } => "CacheHit",
            PipelineEventKind::StageFailed { .. } => "StageFailed",
            PipelineEventKind::StageSkipped { .. } => "StageSkipped",
            PipelineEventKind::PipelineCompleted { .. } => "PipelineCompleted",
            PipelineEventKind::PipelineFailed { .. } => "PipelineFailed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub run_id: Uuid,
    pub kind: PipelineEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}
