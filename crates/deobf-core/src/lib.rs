//! deobf-core: grafo de stages, fingerprints, eventos y política de caché.
pub mod cache;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod step;
pub mod store;

pub use cache::{decide_locality, CachePatterns, Locality, LocalityFlag};
pub use engine::{ExecutionReport, OutputSpec, PipelineBuilder, StageFailure, StageGraph, StageSpec};
pub use errors::CoreEngineError;
pub use event::{EventStore, InMemoryEventStore, PipelineEvent, PipelineEventKind};
pub use model::{Artifact, ArtifactHandle, ArtifactStage, BuildContext, ExecutionContext};
pub use step::{StageDefinition, StageError, StageKind, StageRunResult, StageStatus};
pub use store::{ArtifactStore, InMemoryArtifactStore};
