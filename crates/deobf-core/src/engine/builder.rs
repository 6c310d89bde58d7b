use std::path::PathBuf;

use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Map, Value};

use super::graph::{StageGraph, StageNode};
use super::params::with_deferred;
use crate::cache::{output_path, CachePatterns};
use crate::errors::CoreEngineError;
use crate::hashing::hash_value;
use crate::model::{ArtifactHandle, BuildContext};
use crate::step::StageDefinition;

/// Valor de parámetro que sólo se conoce al finalizar la configuración.
pub type DeferredParam = Box<dyn FnOnce(&BuildContext) -> Result<Value, String> + Send>;

/// Dónde vive la salida de un stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// Ruta fija (inputs preexistentes, directorios del proyecto).
    Fixed(PathBuf),
    /// Ruta derivada del patrón de caché elegido en `finalize`.
    Pattern { appendage: String, classifier: String },
}

impl OutputSpec {
    pub fn pattern(appendage: &str, classifier: &str) -> Self {
        OutputSpec::Pattern { appendage: appendage.to_string(),
                              classifier: classifier.to_string() }
    }
}

/// Registro de un stage durante la fase de configuración.
pub struct StageSpec {
    definition: Box<dyn StageDefinition>,
    inputs: Vec<String>,
    output: OutputSpec,
    deferred: Vec<(String, DeferredParam)>,
}

impl StageSpec {
    pub fn new(definition: impl StageDefinition + 'static, output: OutputSpec) -> Self {
        Self { definition: Box::new(definition),
               inputs: Vec::new(),
               output,
               deferred: Vec::new() }
    }

    /// Declara que este stage consume la salida de `stage_id`.
    pub fn input(mut self, stage_id: impl Into<String>) -> Self {
        let id = stage_id.into();
        if !self.inputs.contains(&id) {
            self.inputs.push(id);
        }
        self
    }

    pub fn after(self, handle: &ArtifactHandle) -> Self {
        self.input(handle.stage_id.clone())
    }

    /// Parámetro resuelto en `finalize` y mezclado sobre `base_params`.
    pub fn deferred<F>(mut self, key: impl Into<String>, f: F) -> Self
        where F: FnOnce(&BuildContext) -> Result<Value, String> + Send + 'static
    {
        self.deferred.push((key.into(), Box::new(f)));
        self
    }

    pub fn id(&self) -> &str {
        self.definition.id()
    }
}

/// Fase de configuración del pipeline.
pub struct PipelineBuilder {
    patterns: CachePatterns,
    stages: IndexMap<String, StageSpec>,
    transformers_present: bool,
}

impl PipelineBuilder {
    pub fn new(patterns: CachePatterns) -> Self {
        Self { patterns,
               stages: IndexMap::new(),
               transformers_present: false }
    }

    pub fn register(&mut self, spec: StageSpec) -> Result<ArtifactHandle, CoreEngineError> {
        let id = spec.id().to_string();
        if self.stages.contains_key(&id) {
            return Err(CoreEngineError::DuplicateStage(id));
        }
        let handle = ArtifactHandle::new(id.clone(), spec.definition.stage());
        debug!("register stage={id} inputs={:?}", spec.inputs);
        self.stages.insert(id, spec);
        Ok(handle)
    }

    pub fn handle(&self, stage_id: &str) -> Option<ArtifactHandle> {
        self.stages
            .get(stage_id)
            .map(|s| ArtifactHandle::new(stage_id, s.definition.stage()))
    }

    /// Agrega un input a un stage ya registrado.
    pub fn add_input(&mut self, stage_id: &str, input: &str) -> Result<(), CoreEngineError> {
        let spec = self.stages
                       .get_mut(stage_id)
                       .ok_or_else(|| CoreEngineError::UnknownStage(stage_id.to_string()))?;
        if !spec.inputs.iter().any(|i| i == input) {
            spec.inputs.push(input.to_string());
        }
        Ok(())
    }

    /// Indica que la build tiene access transformers: en `finalize` la
    /// localidad queda fijada en local para todos los stages.
    pub fn observe_transformers(&mut self, present: bool) {
        self.transformers_present |= present;
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Cierra la configuración. La localidad se consulta una sola vez, de
    /// modo que todas las rutas por patrón usan el mismo patrón.
    pub fn finalize(self, ctx: &BuildContext) -> Result<StageGraph, CoreEngineError> {
        let locality = ctx.locality.observe(self.transformers_present);
        let pattern = self.patterns.select(locality).to_string();

        for (id, spec) in &self.stages {
            for input in &spec.inputs {
                if !self.stages.contains_key(input) {
                    return Err(CoreEngineError::UnknownInput { stage: id.clone(),
                                                               input: input.clone() });
                }
            }
        }
        let order = topological_order(&self.stages)?;

        let shape: Vec<Value> = self.stages
                                    .iter()
                                    .map(|(id, s)| json!({"id": id, "inputs": s.inputs, "stage": s.definition.stage()}))
                                    .collect();
        let definition_hash = hash_value(&Value::Array(shape));

        let mut nodes = IndexMap::with_capacity(self.stages.len());
        for (id, spec) in self.stages {
            let output = match &spec.output {
                OutputSpec::Fixed(p) => p.clone(),
                OutputSpec::Pattern { appendage, classifier } => output_path(&pattern, appendage, classifier),
            };
            let mut resolved = Map::new();
            for (key, f) in spec.deferred {
                let value = f(ctx).map_err(|reason| CoreEngineError::UnresolvedParameter { stage: id.clone(),
                                                                                            param: key.clone(),
                                                                                            reason })?;
                resolved.insert(key, value);
            }
            let params = with_deferred(spec.definition.base_params(), resolved);
            debug!("finalize stage={id} output={} locality={locality:?}", output.display());
            nodes.insert(id.clone(),
                         StageNode { id,
                                     stage: spec.definition.stage(),
                                     definition: spec.definition,
                                     inputs: spec.inputs,
                                     output,
                                     params });
        }
        Ok(StageGraph::new(nodes, order, definition_hash, locality))
    }
}

/// Kahn con desempate por orden de registro: el resultado es determinista.
fn topological_order(stages: &IndexMap<String, StageSpec>) -> Result<Vec<String>, CoreEngineError> {
    let mut indegree: Vec<usize> = stages.values().map(|s| s.inputs.len()).collect();
    let mut done = vec![false; stages.len()];
    let mut order = Vec::with_capacity(stages.len());
    while order.len() < stages.len() {
        let next = (0..stages.len()).find(|&i| !done[i] && indegree[i] == 0);
        let Some(i) = next else {
            let stuck = stages.keys()
                              .enumerate()
                              .filter(|(i, _)| !done[*i])
                              .map(|(_, k)| k.clone())
                              .collect();
            return Err(CoreEngineError::CycleDetected(stuck));
        };
        done[i] = true;
        let (id, _) = stages.get_index(i).ok_or_else(|| CoreEngineError::Internal("index".into()))?;
        for (j, spec) in stages.values().enumerate() {
            if !done[j] {
                indegree[j] -= spec.inputs.iter().filter(|inp| *inp == id).count();
            }
        }
        order.push(id.clone());
    }
    Ok(order)
}
