//! Grafo de stages en dos fases.
//!
//! 1. Configuración: `PipelineBuilder` acumula `StageSpec` con inputs
//!    declarados, salida (fija o por patrón) y parámetros diferidos.
//! 2. `finalize(&BuildContext)`: decide la localidad de caché una sola vez,
//!    resuelve rutas y parámetros, valida el DAG y devuelve un `StageGraph`
//!    inmutable. Sólo el `StageGraph` expone ejecución.

mod builder;
mod executor;
mod graph;
mod params;
mod replay;

pub use builder::{DeferredParam, OutputSpec, PipelineBuilder, StageSpec};
pub use executor::{ExecutionReport, StageFailure};
pub use graph::{StageGraph, StageNode};
pub use params::with_deferred;
pub use replay::replay_statuses;
