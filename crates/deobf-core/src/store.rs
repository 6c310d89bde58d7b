//! Contrato de almacenamiento de artifacts usado por el executor.
//!
//! El store decide cómo se escribe una salida: `begin` entrega una ruta
//! privada (que todavía no existe) donde el stage escribe; `commit` la
//! promueve a su ubicación definitiva junto con su fingerprint; `abort`
//! descarta lo escrito. Un artifact es "fresco" si existe y su fingerprint
//! registrado coincide.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::CoreEngineError;

pub trait ArtifactStore {
    fn is_fresh(&self, location: &Path, fingerprint: &str) -> bool;
    fn begin(&self, location: &Path) -> Result<PathBuf, CoreEngineError>;
    fn commit(&self, staging: &Path, location: &Path, fingerprint: &str) -> Result<(), CoreEngineError>;
    fn abort(&self, staging: &Path);
}

/// Store sin disco: la ruta de staging es la ubicación final y los
/// fingerprints viven en memoria. Útil para tests del executor.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    fingerprints: std::sync::Mutex<HashMap<PathBuf, String>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint_of(&self, location: &Path) -> Option<String> {
        self.fingerprints.lock().ok().and_then(|m| m.get(location).cloned())
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn is_fresh(&self, location: &Path, fingerprint: &str) -> bool {
        self.fingerprint_of(location).as_deref() == Some(fingerprint)
    }

    fn begin(&self, location: &Path) -> Result<PathBuf, CoreEngineError> {
        Ok(location.to_path_buf())
    }

    fn commit(&self, _staging: &Path, location: &Path, fingerprint: &str) -> Result<(), CoreEngineError> {
        let mut map = self.fingerprints
                          .lock()
                          .map_err(|e| CoreEngineError::Store(e.to_string()))?;
        map.insert(location.to_path_buf(), fingerprint.to_string());
        Ok(())
    }

    fn abort(&self, _staging: &Path) {}
}
