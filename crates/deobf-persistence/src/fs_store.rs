//! `ArtifactStore` sobre el sistema de ficheros.
//!
//! Cada artifact `<loc>` va acompañado de `<loc>.fingerprint` con el
//! fingerprint que lo produjo. El sidecar se escribe después de promover el
//! artifact, así que un artifact sin sidecar (o con otro fingerprint) nunca
//! cuenta como fresco.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use deobf_core::constants::FINGERPRINT_SUFFIX;
use deobf_core::{ArtifactStore, CoreEngineError};
use log::debug;
use tempfile::{NamedTempFile, TempDir};

use crate::error::PersistenceError;
use crate::staging::{rename_with_retry, staging_dir_for};

#[derive(Debug, Default)]
pub struct FsArtifactStore {
    // staging path -> TempDir que lo contiene (se borra al soltarlo)
    open: DashMap<PathBuf, TempDir>,
}

impl FsArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sidecar_path(location: &Path) -> PathBuf {
        let mut name = location.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(FINGERPRINT_SUFFIX);
        location.with_file_name(name)
    }

    pub fn recorded_fingerprint(location: &Path) -> Option<String> {
        fs::read_to_string(Self::sidecar_path(location)).ok()
                                                        .map(|s| s.trim().to_string())
    }

    fn write_sidecar(location: &Path, fingerprint: &str) -> Result<(), PersistenceError> {
        let sidecar = Self::sidecar_path(location);
        let parent = sidecar.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| PersistenceError::io(parent, e))?;
        tmp.write_all(fingerprint.as_bytes())
           .map_err(|e| PersistenceError::io(tmp.path(), e))?;
        tmp.persist(&sidecar)
           .map_err(|e| PersistenceError::io(&sidecar, e.error))?;
        Ok(())
    }

    fn promote(&self, staging: &Path, location: &Path, fingerprint: &str) -> Result<(), PersistenceError> {
        let (_, temp) = self.open
                            .remove(staging)
                            .ok_or_else(|| PersistenceError::Serialization(format!("unknown staging path {}", staging.display())))?;
        if !staging.exists() {
            return Err(PersistenceError::io(staging,
                                            std::io::Error::new(std::io::ErrorKind::NotFound, "stage produced no output")));
        }
        if location.exists() {
            if Self::recorded_fingerprint(location).as_deref() == Some(fingerprint) {
                debug!("commit: {} already present with same fingerprint", location.display());
                return Ok(());
            }
            // salida obsoleta: se aparta dentro del TempDir para que se borre con él
            let _ = fs::remove_file(Self::sidecar_path(location));
            rename_with_retry(location, &temp.path().join("stale"))?;
        }
        rename_with_retry(staging, location)?;
        Self::write_sidecar(location, fingerprint)?;
        debug!("commit: {} fp={fingerprint}", location.display());
        Ok(())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn is_fresh(&self, location: &Path, fingerprint: &str) -> bool {
        location.exists() && Self::recorded_fingerprint(location).as_deref() == Some(fingerprint)
    }

    fn begin(&self, location: &Path) -> Result<PathBuf, CoreEngineError> {
        let temp = staging_dir_for(location)?;
        let name = location.file_name()
                           .map(|n| n.to_os_string())
                           .unwrap_or_else(|| "out".into());
        let staging = temp.path().join(name);
        self.open.insert(staging.clone(), temp);
        Ok(staging)
    }

    fn commit(&self, staging: &Path, location: &Path, fingerprint: &str) -> Result<(), CoreEngineError> {
        Ok(self.promote(staging, location, fingerprint)?)
    }

    fn abort(&self, staging: &Path) {
        // soltar el TempDir borra todo lo escrito
        self.open.remove(staging);
    }
}
