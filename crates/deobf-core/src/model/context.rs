use std::path::{Path, PathBuf};

use serde_json::Value;

use super::Artifact;
use crate::cache::LocalityFlag;

/// Contexto de ejecución entregado a `StageDefinition::run`.
pub struct ExecutionContext {
    pub stage_id: String,
    /// Artifacts de entrada, en el orden declarado al registrar el stage.
    pub inputs: Vec<Artifact>,
    /// Parámetros ya resueltos (base + deferred).
    pub params: Value,
    /// Ruta donde el stage debe escribir su salida. Es una ubicación privada
    /// de staging: no existe al empezar y el store la promueve al terminar.
    pub output: PathBuf,
}

impl ExecutionContext {
    /// Artifact producido por el stage `stage_id`, si es un input declarado.
    pub fn input(&self, stage_id: &str) -> Option<&Artifact> {
        self.inputs.iter().find(|a| a.name == stage_id)
    }

    pub fn input_location(&self, stage_id: &str) -> Option<&Path> {
        self.input(stage_id).map(|a| a.location.as_path())
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn param_bool(&self, key: &str) -> bool {
        self.params.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Contexto de una build: dueño del flag de localidad de caché.
///
/// Se crea una vez por build y se pasa explícitamente a `finalize`.
#[derive(Debug, Default)]
pub struct BuildContext {
    pub locality: LocalityFlag,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }
}
