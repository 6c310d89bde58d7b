mod artifact;
mod context;
mod fingerprint;

pub use artifact::{Artifact, ArtifactHandle, ArtifactStage};
pub use context::{BuildContext, ExecutionContext};
pub use fingerprint::StageFingerprintInput;
