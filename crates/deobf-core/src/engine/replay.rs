//! Replay: reconstruye el estado de cada stage a partir del log de eventos.

use indexmap::IndexMap;

use crate::event::{PipelineEvent, PipelineEventKind};
use crate::step::StageStatus;

/// Estado final de cada stage mencionado en `events`, en orden de aparición.
pub fn replay_statuses(events: &[PipelineEvent]) -> IndexMap<String, StageStatus> {
    let mut out = IndexMap::new();
    for ev in events {
        match &ev.kind {
            PipelineEventKind::StageStarted { stage_id, .. } => {
                out.insert(stage_id.clone(), StageStatus::Running);
            }
            PipelineEventKind::StageFinished { stage_id, .. } => {
                out.insert(stage_id.clone(), StageStatus::FinishedOk);
            }
            PipelineEventKind::CacheHit { stage_id, .. } => {
                out.insert(stage_id.clone(), StageStatus::CacheHit);
            }
            PipelineEventKind::StageFailed { stage_id, .. } => {
                out.insert(stage_id.clone(), StageStatus::Failed);
            }
            PipelineEventKind::StageSkipped { stage_id, .. } => {
                out.insert(stage_id.clone(), StageStatus::NotRunnable);
            }
            PipelineEventKind::PipelineInitialized { .. }
            | PipelineEventKind::PipelineCompleted { .. }
            | PipelineEventKind::PipelineFailed { .. } => {}
        }
    }
    out
}
