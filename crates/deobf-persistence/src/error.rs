//! Errores de persistencia.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("missing configuration value {0}")]
    MissingConfig(&'static str),
    #[error("invalid configuration value {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

impl PersistenceError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        PersistenceError::Io { path: path.display().to_string(),
                               source }
    }
}

impl From<PersistenceError> for deobf_core::CoreEngineError {
    fn from(e: PersistenceError) -> Self {
        deobf_core::CoreEngineError::Store(e.to_string())
    }
}
