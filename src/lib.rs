//! deobflow
//!
//! Librería de fachada del pipeline de deobfuscación:
//! - `config` carga la configuración de la build desde `.env` / entorno.
//! - `driver` construye y ejecuta el grafo de stages.
//! - `errors` agrupa los errores de todos los crates del workspace.
//! - `version` avisa de versiones de proyecto que no siguen SemVer.
//!
//! Los crates del workspace se re-exportan para clientes que necesiten
//! registrar stages propios.

pub mod config;
pub mod driver;
pub mod errors;
pub mod version;

pub use deobf_adapters as adapters;
pub use deobf_core as engine;
pub use deobf_mapping as mapping;
pub use deobf_persistence as persistence;

pub use config::{BuildConfig, DecompilerCommand};
pub use driver::{BuildOutcome, BuildRequest, Driver, SourceSetDirs};
pub use errors::DeobfError;
pub use version::check_version_string;
