use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::cache::Locality;
use crate::model::{ArtifactHandle, ArtifactStage};
use crate::step::StageDefinition;

/// Stage ya finalizado: ruta y parámetros resueltos.
pub struct StageNode {
    pub id: String,
    pub stage: ArtifactStage,
    pub definition: Box<dyn StageDefinition>,
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub params: Value,
}

/// DAG inmutable producido por `PipelineBuilder::finalize`.
///
/// Las aristas sólo expresan "debe terminar antes que". Un scheduler externo
/// puede usar `ready` + `run_stage`; `execute` es el executor secuencial
/// incluido.
pub struct StageGraph {
    nodes: IndexMap<String, StageNode>,
    order: Vec<String>,
    definition_hash: String,
    locality: Locality,
}

impl StageGraph {
    pub(crate) fn new(nodes: IndexMap<String, StageNode>, order: Vec<String>, definition_hash: String, locality: Locality) -> Self {
        Self { nodes,
               order,
               definition_hash,
               locality }
    }

    pub fn node(&self, id: &str) -> Option<&StageNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StageNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    /// Localidad decidida en `finalize`.
    pub fn locality(&self) -> Locality {
        self.locality
    }

    /// Ruta resuelta de la salida referida por `handle`.
    pub fn location(&self, handle: &ArtifactHandle) -> Option<&Path> {
        self.nodes.get(&handle.stage_id).map(|n| n.output.as_path())
    }

    /// Orden topológico determinista (desempate por orden de registro).
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Todos los stages que dependen, directa o transitivamente, de `id`.
    pub fn dependents(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut frontier = vec![id.to_string()];
        while let Some(cur) = frontier.pop() {
            for node in self.nodes.values() {
                if node.inputs.contains(&cur) && out.insert(node.id.clone()) {
                    frontier.push(node.id.clone());
                }
            }
        }
        out
    }

    /// Todos los stages de los que `id` depende, directa o transitivamente.
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut frontier = vec![id.to_string()];
        while let Some(cur) = frontier.pop() {
            if let Some(node) = self.nodes.get(&cur) {
                for input in &node.inputs {
                    if out.insert(input.clone()) {
                        frontier.push(input.clone());
                    }
                }
            }
        }
        out
    }

    /// Dos stages pueden correr en paralelo si no hay camino entre ellos.
    pub fn independent(&self, a: &str, b: &str) -> bool {
        a != b && !self.ancestors(a).contains(b) && !self.ancestors(b).contains(a)
    }

    /// Stages aún no hechos cuyos inputs están todos en `done`.
    pub fn ready(&self, done: &HashSet<String>) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| !done.contains(*id))
            .filter_map(|id| self.nodes.get(id))
            .filter(|n| n.inputs.iter().all(|i| done.contains(i)))
            .map(|n| n.id.as_str())
            .collect()
    }
}
