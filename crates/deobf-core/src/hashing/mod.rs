//! Módulo de hashing y canonicalización JSON.

pub mod canonical_json;
pub mod hash;
pub mod tree;

pub use canonical_json::to_canonical_json;
pub use hash::{hash_bytes, hash_str, hash_value};
pub use tree::hash_path;
