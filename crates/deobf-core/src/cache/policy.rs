use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::constants::APPENDAGE_PLACEHOLDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locality {
    Global,
    Local,
}

/// Decisión pura: con transformers presentes la salida es local.
pub fn decide_locality(transformers_present: bool) -> Locality {
    if transformers_present {
        Locality::Local
    } else {
        Locality::Global
    }
}

/// Flag monotónico global -> local. Nunca vuelve a `Global`.
#[derive(Debug, Default)]
pub struct LocalityFlag {
    pinned: AtomicBool,
}

impl LocalityFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra si hay transformers presentes y devuelve la localidad efectiva.
    /// `observe(false)` nunca deshace un `observe(true)` anterior.
    pub fn observe(&self, transformers_present: bool) -> Locality {
        if decide_locality(transformers_present) == Locality::Local {
            self.pinned.store(true, Ordering::SeqCst);
        }
        self.current()
    }

    pub fn current(&self) -> Locality {
        if self.pinned.load(Ordering::SeqCst) {
            Locality::Local
        } else {
            Locality::Global
        }
    }
}

/// Par de patrones de salida (global / local). Cada patrón contiene el
/// placeholder `{appendage}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePatterns {
    pub global: String,
    pub local: String,
}

impl CachePatterns {
    pub fn new(global: impl Into<String>, local: impl Into<String>) -> Self {
        Self { global: global.into(),
               local: local.into() }
    }

    pub fn select(&self, locality: Locality) -> &str {
        match locality {
            Locality::Global => &self.global,
            Locality::Local => &self.local,
        }
    }
}

/// `pattern` con `{appendage}` sustituido, más `-classifier` si no está vacío.
pub fn output_path(pattern: &str, appendage: &str, classifier: &str) -> PathBuf {
    let mut out = pattern.replace(APPENDAGE_PLACEHOLDER, appendage);
    if !classifier.is_empty() {
        out.push('-');
        out.push_str(classifier);
    }
    PathBuf::from(out)
}
