//! Constantes del motor core.
//!
//! `ENGINE_VERSION` entra en el input de cada fingerprint de stage: subirla
//! invalida todas las cachés existentes aunque inputs y parámetros no cambien.

/// Versión lógica del motor de stages.
pub const ENGINE_VERSION: &str = "D1.0";

/// Placeholder sustituido por el `appendage` al resolver patrones de salida.
pub const APPENDAGE_PLACEHOLDER: &str = "{appendage}";

/// Sufijo del fichero que acompaña a cada artifact con su fingerprint.
pub const FINGERPRINT_SUFFIX: &str = ".fingerprint";
