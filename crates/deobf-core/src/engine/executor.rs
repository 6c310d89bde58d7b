//! Executor secuencial del `StageGraph`.
//!
//! Recorre el orden topológico; cada stage:
//! - se marca `NotRunnable` si algún input falló o quedó bloqueado,
//! - se omite (`CacheHit`) si su salida existe con el mismo fingerprint,
//! - o se ejecuta sobre una ruta de staging que el store promueve al terminar.
//!
//! Un fallo no detiene las ramas independientes, pero el run termina con
//! `PipelineFailed` y ningún artifact del report debe tomarse como válido.

use indexmap::IndexMap;
use log::{debug, error, info};
use serde_json::json;
use uuid::Uuid;

use super::graph::{StageGraph, StageNode};
use crate::errors::CoreEngineError;
use crate::event::{EventStore, PipelineEventKind};
use crate::hashing::hash_value;
use crate::model::{Artifact, ArtifactHandle, ExecutionContext, StageFingerprintInput};
use crate::step::{StageError, StageKind, StageRunResult, StageStatus};
use crate::store::ArtifactStore;

pub struct StageFailure {
    pub stage_id: String,
    pub error: StageError,
}

impl std::fmt::Debug for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StageFailure({}: {})", self.stage_id, self.error)
    }
}

/// Estado acumulado de un run.
#[derive(Debug)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    statuses: IndexMap<String, StageStatus>,
    artifacts: IndexMap<String, Artifact>,
    failures: Vec<StageFailure>,
}

impl ExecutionReport {
    fn new(run_id: Uuid, graph: &StageGraph) -> Self {
        Self { run_id,
               statuses: graph.topological_order()
                              .iter()
                              .map(|id| (id.clone(), StageStatus::Pending))
                              .collect(),
               artifacts: IndexMap::new(),
               failures: Vec::new() }
    }

    pub fn status(&self, stage_id: &str) -> Option<StageStatus> {
        self.statuses.get(stage_id).copied()
    }

    pub fn statuses(&self) -> &IndexMap<String, StageStatus> {
        &self.statuses
    }

    pub fn artifact(&self, stage_id: &str) -> Option<&Artifact> {
        self.artifacts.get(stage_id)
    }

    pub fn artifact_for(&self, handle: &ArtifactHandle) -> Option<&Artifact> {
        self.artifact(&handle.stage_id)
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.statuses.values().all(|s| s.is_available())
    }

    /// Convierte el primer fallo en `CoreEngineError::StageFailed`.
    pub fn into_result(self) -> Result<Self, CoreEngineError> {
        if let Some(f) = self.failures.first() {
            return Err(CoreEngineError::StageFailed { stage: f.stage_id.clone(),
                                                      message: f.error.to_string() });
        }
        Ok(self)
    }
}

impl StageGraph {
    pub fn execute<E, S>(&self, events: &mut E, store: &S) -> ExecutionReport
        where E: EventStore,
              S: ArtifactStore
    {
        self.execute_with_run_id(Uuid::new_v4(), events, store)
    }

    pub fn execute_with_run_id<E, S>(&self, run_id: Uuid, events: &mut E, store: &S) -> ExecutionReport
        where E: EventStore,
              S: ArtifactStore
    {
        let mut report = self.begin_run(run_id, events);
        for id in self.topological_order() {
            self.run_stage(id, &mut report, events, store);
        }
        self.finish_run(&mut report, events);
        report
    }

    /// Emite `PipelineInitialized` y devuelve un report vacío. Para
    /// schedulers externos que llaman `run_stage` por su cuenta.
    pub fn begin_run<E: EventStore>(&self, run_id: Uuid, events: &mut E) -> ExecutionReport {
        events.append_kind(run_id,
                           PipelineEventKind::PipelineInitialized { definition_hash: self.definition_hash().to_string(),
                                                                    stage_count: self.len() });
        ExecutionReport::new(run_id, self)
    }

    /// Ejecuta (o salta) un stage. Sus inputs deben haberse procesado antes.
    pub fn run_stage<E, S>(&self, id: &str, report: &mut ExecutionReport, events: &mut E, store: &S)
        where E: EventStore,
              S: ArtifactStore
    {
        let Some(node) = self.node(id) else {
            return;
        };
        let run_id = report.run_id;

        if let Some(blocker) = node.inputs
                                   .iter()
                                   .find(|i| !report.status(i).is_some_and(StageStatus::is_available))
        {
            debug!("stage={id} not runnable, blocked by {blocker}");
            report.statuses.insert(id.to_string(), StageStatus::NotRunnable);
            events.append_kind(run_id,
                               PipelineEventKind::StageSkipped { stage_id: id.to_string(),
                                                                 blocked_by: blocker.clone() });
            return;
        }

        let inputs: Vec<Artifact> = node.inputs
                                        .iter()
                                        .filter_map(|i| report.artifacts.get(i).cloned())
                                        .collect();
        let input_fps: Vec<String> = inputs.iter().map(|a| a.fingerprint.clone()).collect();

        match node.definition.kind() {
            StageKind::Source => self.run_source(node, inputs, report, events),
            StageKind::Transform => {
                let fingerprint = StageFingerprintInput::new(id, &input_fps, &node.params).compute();
                self.run_transform(node, inputs, fingerprint, report, events, store)
            }
        }
    }

    fn run_source<E: EventStore>(&self, node: &StageNode, inputs: Vec<Artifact>, report: &mut ExecutionReport, events: &mut E) {
        let ctx = ExecutionContext { stage_id: node.id.clone(),
                                     inputs,
                                     params: node.params.clone(),
                                     output: node.output.clone() };
        match node.definition.run(&ctx) {
            StageRunResult::Existing { content_hash } => {
                let fingerprint = StageFingerprintInput::new(&node.id, std::slice::from_ref(&content_hash), &node.params).compute();
                self.record_success(node, fingerprint, StageStatus::FinishedOk, report, events);
            }
            StageRunResult::Success { .. } => {
                let err = CoreEngineError::Internal(format!("source stage '{}' must report its content hash", node.id));
                self.record_failure(node, String::new(), Box::new(err), report, events);
            }
            StageRunResult::Failure { error } => self.record_failure(node, String::new(), error, report, events),
        }
    }

    fn run_transform<E, S>(&self,
                           node: &StageNode,
                           inputs: Vec<Artifact>,
                           fingerprint: String,
                           report: &mut ExecutionReport,
                           events: &mut E,
                           store: &S)
        where E: EventStore,
              S: ArtifactStore
    {
        if store.is_fresh(&node.output, &fingerprint) {
            debug!("stage={} cache hit fp={fingerprint}", node.id);
            self.record_success(node, fingerprint, StageStatus::CacheHit, report, events);
            return;
        }

        report.statuses.insert(node.id.clone(), StageStatus::Running);
        events.append_kind(report.run_id,
                           PipelineEventKind::StageStarted { stage_id: node.id.clone(),
                                                             fingerprint: fingerprint.clone() });
        let staging = match store.begin(&node.output) {
            Ok(p) => p,
            Err(e) => return self.record_failure(node, fingerprint, Box::new(e), report, events),
        };
        let ctx = ExecutionContext { stage_id: node.id.clone(),
                                     inputs,
                                     params: node.params.clone(),
                                     output: staging.clone() };
        match node.definition.run(&ctx) {
            StageRunResult::Success { .. } => match store.commit(&staging, &node.output, &fingerprint) {
                Ok(()) => self.record_success(node, fingerprint, StageStatus::FinishedOk, report, events),
                Err(e) => {
                    store.abort(&staging);
                    self.record_failure(node, fingerprint, Box::new(e), report, events)
                }
            },
            StageRunResult::Existing { .. } => {
                store.abort(&staging);
                let err = CoreEngineError::Internal(format!("transform stage '{}' reported an existing artifact", node.id));
                self.record_failure(node, fingerprint, Box::new(err), report, events)
            }
            StageRunResult::Failure { error } => {
                store.abort(&staging);
                self.record_failure(node, fingerprint, error, report, events)
            }
        }
    }

    fn record_success<E: EventStore>(&self,
                                     node: &StageNode,
                                     fingerprint: String,
                                     status: StageStatus,
                                     report: &mut ExecutionReport,
                                     events: &mut E) {
        let location = node.output.display().to_string();
        let kind = if status == StageStatus::CacheHit {
            PipelineEventKind::CacheHit { stage_id: node.id.clone(),
                                          fingerprint: fingerprint.clone(),
                                          location }
        } else {
            info!("stage {} finished -> {location}", node.id);
            PipelineEventKind::StageFinished { stage_id: node.id.clone(),
                                               fingerprint: fingerprint.clone(),
                                               location }
        };
        events.append_kind(report.run_id, kind);
        report.statuses.insert(node.id.clone(), status);
        report.artifacts.insert(node.id.clone(),
                                Artifact { name: node.id.clone(),
                                           stage: node.stage,
                                           fingerprint,
                                           location: node.output.clone() });
    }

    fn record_failure<E: EventStore>(&self,
                                     node: &StageNode,
                                     fingerprint: String,
                                     error: StageError,
                                     report: &mut ExecutionReport,
                                     events: &mut E) {
        error!("stage {} failed: {error}", node.id);
        events.append_kind(report.run_id,
                           PipelineEventKind::StageFailed { stage_id: node.id.clone(),
                                                            fingerprint,
                                                            error: error.to_string() });
        report.statuses.insert(node.id.clone(), StageStatus::Failed);
        report.failures.push(StageFailure { stage_id: node.id.clone(),
                                            error });
    }

    /// Emite `PipelineCompleted` o `PipelineFailed`.
    pub fn finish_run<E: EventStore>(&self, report: &mut ExecutionReport, events: &mut E) {
        if report.is_success() {
            let fps: Vec<&str> = report.artifacts.values().map(|a| a.fingerprint.as_str()).collect();
            let pipeline_fingerprint = hash_value(&json!(fps));
            events.append_kind(report.run_id, PipelineEventKind::PipelineCompleted { pipeline_fingerprint });
        } else {
            let failed = report.failures.iter().map(|f| f.stage_id.clone()).collect();
            events.append_kind(report.run_id, PipelineEventKind::PipelineFailed { failed });
        }
    }
}
