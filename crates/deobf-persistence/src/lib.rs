//! deobf-persistence
//!
//! Implementaciones en disco de los contratos del core:
//! - `fs_store`: `ArtifactStore` sobre directorios, con fingerprint al lado de
//!   cada artifact y promoción atómica por `rename`.
//! - `events`: `EventStore` append-only en ficheros JSON-lines.
//! - `staging`: directorios privados de staging reutilizables por los stages.
//! - `config`: rutas de caché desde `.env`.

pub mod config;
pub mod error;
pub mod events;
pub mod fs_store;
pub mod staging;

pub use config::{init_dotenv, CacheConfig};
pub use error::PersistenceError;
pub use events::JsonlEventStore;
pub use fs_store::FsArtifactStore;
pub use staging::{copy_tree, PromoteOutcome, StagedDir};
