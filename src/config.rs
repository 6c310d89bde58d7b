//! Configuración central del driver.
//! Carga variables de entorno (.env) una sola vez y expone una estructura
//! inmutable (`config()`).
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use deobf_persistence::{init_dotenv, CacheConfig};
use once_cell::sync::OnceCell;

use crate::errors::DeobfError;

const DEFAULT_DECOMPILER_TIMEOUT_SECS: u64 = 600;

/// Comando con el que se lanza el decompilador en un proceso aparte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompilerCommand {
    /// Ejecutable (normalmente `java`).
    pub program: PathBuf,
    /// Classpath propio del proceso, independiente del de la build.
    pub forked_classpath: Vec<PathBuf>,
    pub main_class: Option<String>,
    pub extra_args: Vec<String>,
    pub timeout: Duration,
}

/// Configuración global de una build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub cache: CacheConfig,
    /// Repositorio donde se publican las dependencias deobfuscadas.
    pub deps_dir: PathBuf,
    pub decompiler: DecompilerCommand,
    /// Compilador estilo `javac` para `recompileMc`.
    pub compiler: PathBuf,
    pub use_dep_ats: bool,
    /// El retromapeo falla ante cualquier ocurrencia ambigua.
    pub strict_retromap: bool,
    pub mc_version: String,
    pub project_version: Option<String>,
}

static CONFIG: OnceCell<BuildConfig> = OnceCell::new();

/// Instancia global perezosa, evaluada una sola vez por proceso.
pub fn config() -> Result<&'static BuildConfig, DeobfError> {
    CONFIG.get_or_try_init(BuildConfig::from_env)
}

impl BuildConfig {
    pub fn from_env() -> Result<Self, DeobfError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de `lookup`; no toca el entorno del
    /// proceso.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeobfError>
        where F: Fn(&str) -> Option<String>
    {
        let required = |key: &str| lookup(key).filter(|v| !v.is_empty())
                                              .ok_or_else(|| DeobfError::Config(format!("{key} no definida")));

        let global_dir = PathBuf::from(required("DEOBF_CACHE_DIR")?);
        let project_dir = PathBuf::from(lookup("DEOBF_PROJECT_DIR").unwrap_or_else(|| ".".to_string()));
        let deps_dir = lookup("DEOBF_DEPS_DIR").map(PathBuf::from)
                                               .unwrap_or_else(|| project_dir.join("build").join("deobfedDeps"));

        let timeout = match lookup("DEOBF_DECOMPILER_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>()
                        .map_err(|_| DeobfError::Config(format!("DEOBF_DECOMPILER_TIMEOUT_SECS inválido: {v}")))?,
            None => DEFAULT_DECOMPILER_TIMEOUT_SECS,
        };
        let extra_args = lookup("DEOBF_DECOMPILER_ARGS").unwrap_or_default()
                                                        .split_whitespace()
                                                        .map(str::to_string)
                                                        .collect();
        let decompiler = DecompilerCommand { program: PathBuf::from(lookup("DEOBF_DECOMPILER_CMD").unwrap_or_else(|| "java".into())),
                                             forked_classpath: split_paths(&lookup("DEOBF_DECOMPILER_CLASSPATH").unwrap_or_default()),
                                             main_class: lookup("DEOBF_DECOMPILER_MAIN").filter(|v| !v.is_empty()),
                                             extra_args,
                                             timeout: Duration::from_secs(timeout) };

        let flag = |key: &str| match lookup(key).as_deref() {
            None | Some("") | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(other) => Err(DeobfError::Config(format!("{key} inválido: {other}"))),
        };

        Ok(Self { cache: CacheConfig { global_dir,
                                       project_dir },
                  deps_dir,
                  decompiler,
                  compiler: PathBuf::from(lookup("DEOBF_COMPILER_CMD").unwrap_or_else(|| "javac".into())),
                  use_dep_ats: flag("DEOBF_USE_DEP_ATS")?,
                  strict_retromap: flag("DEOBF_RETROMAP_STRICT")?,
                  mc_version: required("DEOBF_MC_VERSION")?,
                  project_version: lookup("DEOBF_PROJECT_VERSION").filter(|v| !v.is_empty()) })
    }
}

fn split_paths(value: &str) -> Vec<PathBuf> {
    env::split_paths(value).filter(|p| !p.as_os_str().is_empty())
                           .collect()
}
