//! Errores de los adapters (stages concretos).

use deobf_core::CoreEngineError;
use deobf_mapping::MappingError;
use deobf_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    MappingParse(#[from] MappingError),
    #[error("{file}:{line}:{column}: ambiguous symbol '{name}' ({candidates} candidates)")]
    UnresolvedSymbolAmbiguity {
        file: String,
        line: u32,
        column: u32,
        name: String,
        candidates: usize,
    },
    #[error("patch failed for {file} at hunk #{hunk}: {context}")]
    PatchApplicationFailure { file: String, hunk: usize, context: String },
    #[error("external tool '{tool}' failed: {reason}")]
    ExternalToolFailure { tool: String, reason: String },
    #[error("Only allowed to use maven dependencies for {configuration}, got raw file '{dependency}'")]
    InvalidDependencySource { configuration: String, dependency: String },
    #[error("stale range map for {file}: {reason}")]
    StaleRangeMapUsage { file: String, reason: String },
    #[error("{file}: source is not valid UTF-8 (first invalid byte at offset {offset})")]
    SourceEncoding { file: String, offset: usize },
    #[error("malformed class file {file}: {message}")]
    ClassFormat { file: String, message: String },
    #[error("missing stage input: {0}")]
    MissingInput(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Engine(#[from] CoreEngineError),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AdapterError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AdapterError::Io { path: path.display().to_string(),
                           source }
    }

    pub fn tool(tool: &str, reason: impl Into<String>) -> Self {
        AdapterError::ExternalToolFailure { tool: tool.to_string(),
                                            reason: reason.into() }
    }
}
