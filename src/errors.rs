use thiserror::Error;

use deobf_adapters::AdapterError;
use deobf_core::CoreEngineError;
use deobf_mapping::MappingError;
use deobf_persistence::PersistenceError;

/// Errores de nivel superior del driver.
#[derive(Debug, Error)]
pub enum DeobfError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error(transparent)]
    Core(#[from] CoreEngineError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
}
