//! Carga de configuración de caché desde variables de entorno.
//! `DEOBF_CACHE_DIR` es obligatoria; el resto tiene defaults.

use std::env;
use std::path::PathBuf;

use deobf_core::CachePatterns;
use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Raíz de la caché compartida entre proyectos.
    pub global_dir: PathBuf,
    /// Raíz del proyecto; la caché local vive bajo `build/`.
    pub project_dir: PathBuf,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        Lazy::force(&DOTENV_LOADED);
        let global_dir = env::var("DEOBF_CACHE_DIR").map_err(|_| PersistenceError::MissingConfig("DEOBF_CACHE_DIR"))?;
        let project_dir = env::var("DEOBF_PROJECT_DIR").unwrap_or_else(|_| ".".to_string());
        Ok(Self { global_dir: PathBuf::from(global_dir),
                  project_dir: PathBuf::from(project_dir) })
    }

    pub fn local_dir(&self) -> PathBuf {
        self.project_dir.join("build").join("localCache")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.project_dir.join("build").join("deobflow").join("events")
    }

    /// Patrones global/local para el artifact `name` de la versión `version`.
    pub fn patterns(&self, name: &str, version: &str) -> CachePatterns {
        let global = self.global_dir
                         .join("net")
                         .join("minecraft")
                         .join(name)
                         .join(version)
                         .join(format!("{name}{{appendage}}"));
        let local = self.local_dir().join(format!("{name}{{appendage}}"));
        CachePatterns::new(global.display().to_string(), local.display().to_string())
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_keep_appendage_placeholder() {
        let cfg = CacheConfig { global_dir: PathBuf::from("/cache"),
                                project_dir: PathBuf::from("/proj") };
        let p = cfg.patterns("minecraft", "1.8");
        assert!(p.global.ends_with("minecraft{appendage}"));
        assert!(p.global.starts_with("/cache"));
        assert!(p.local.starts_with("/proj"));
    }
}
