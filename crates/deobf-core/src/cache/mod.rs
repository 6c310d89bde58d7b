//! Política de localidad de caché.
//!
//! Los artifacts derivados sólo de inputs compartidos se guardan en la caché
//! global (reutilizable entre proyectos). En cuanto la build observa algún
//! access transformer la salida pasa a ser específica del proyecto y todas las
//! rutas se resuelven contra el patrón local. El cambio es de un solo sentido.

mod policy;

pub use policy::{decide_locality, output_path, CachePatterns, Locality, LocalityFlag};
