//! Errores específicos del core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("duplicate stage id '{0}'")] DuplicateStage(String),
    #[error("unknown stage '{0}'")] UnknownStage(String),
    #[error("stage '{stage}' depends on unknown stage '{input}'")]
    UnknownInput { stage: String, input: String },
    #[error("cycle detected between stages: {0:?}")] CycleDetected(Vec<String>),
    #[error("deferred parameter '{param}' of stage '{stage}' could not be resolved: {reason}")]
    UnresolvedParameter { stage: String, param: String, reason: String },
    #[error("stage '{stage}' failed: {message}")] StageFailed { stage: String, message: String },
    #[error("stage '{0}' is not runnable (an upstream stage failed)")] NotRunnable(String),
    #[error("artifact store: {0}")] Store(String),
    #[error("internal: {0}")] Internal(String),
}
