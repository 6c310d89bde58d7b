mod definition;
mod run_result;
mod status;

pub use definition::{StageDefinition, StageKind};
pub use run_result::{StageError, StageRunResult};
pub use status::StageStatus;
