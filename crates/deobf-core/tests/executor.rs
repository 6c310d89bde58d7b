mod test_support;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use deobf_core::engine::replay_statuses;
use deobf_core::{BuildContext, CachePatterns, CoreEngineError, EventStore, InMemoryArtifactStore, InMemoryEventStore,
                 OutputSpec, PipelineBuilder, PipelineEventKind, StageSpec, StageStatus};
use test_support::CountingStage;

fn patterns() -> CachePatterns {
    CachePatterns::new("/global/mc{appendage}", "/local/mc{appendage}")
}

#[test]
fn failed_stage_blocks_dependents_but_not_independent_branches() {
    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::source("input"), OutputSpec::Fixed(PathBuf::from("/in.jar")))).unwrap();
    b.register(StageSpec::new(CountingStage::failing("decomp"), OutputSpec::pattern("", "decomp")).input("input"))
     .unwrap();
    let patch = CountingStage::transform("patch");
    let patch_runs = patch.counter();
    b.register(StageSpec::new(patch, OutputSpec::pattern("", "fixed")).input("decomp")).unwrap();
    b.register(StageSpec::new(CountingStage::transform("remap"), OutputSpec::pattern("Src", "")).input("patch"))
     .unwrap();
    b.register(StageSpec::new(CountingStage::transform("bin"), OutputSpec::pattern("Bin", "")).input("input")).unwrap();

    let graph = b.finalize(&BuildContext::new()).unwrap();
    let mut events = InMemoryEventStore::default();
    let store = InMemoryArtifactStore::new();
    let report = graph.execute(&mut events, &store);

    assert!(!report.is_success());
    assert_eq!(report.status("decomp"), Some(StageStatus::Failed));
    assert_eq!(report.status("patch"), Some(StageStatus::NotRunnable));
    assert_eq!(report.status("remap"), Some(StageStatus::NotRunnable));
    assert_eq!(report.status("bin"), Some(StageStatus::FinishedOk));
    assert_eq!(patch_runs.load(Ordering::SeqCst), 0);

    let evs = events.list(report.run_id);
    assert!(matches!(evs.last().map(|e| &e.kind), Some(PipelineEventKind::PipelineFailed { failed }) if failed == &vec!["decomp".to_string()]));
    let replayed = replay_statuses(&evs);
    assert_eq!(replayed.get("remap"), Some(&StageStatus::NotRunnable));

    match report.into_result() {
        Err(CoreEngineError::StageFailed { stage, message }) => {
            assert_eq!(stage, "decomp");
            assert!(message.contains("exploded"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn second_run_with_unchanged_inputs_is_all_cache_hits() {
    let store = InMemoryArtifactStore::new();
    let build = || {
        let mut b = PipelineBuilder::new(patterns());
        b.register(StageSpec::new(CountingStage::source("input"), OutputSpec::Fixed(PathBuf::from("/in.jar")))).unwrap();
        let deobf = CountingStage::transform("deobf").with_params(serde_json::json!({"apply_markers": true}));
        let runs = deobf.counter();
        b.register(StageSpec::new(deobf, OutputSpec::pattern("", "srgBin")).input("input")).unwrap();
        (b.finalize(&BuildContext::new()).unwrap(), runs)
    };

    let (graph, runs) = build();
    let mut events = InMemoryEventStore::default();
    let first = graph.execute(&mut events, &store);
    assert!(first.is_success());
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let (graph, runs) = build();
    let second = graph.execute(&mut events, &store);
    assert!(second.is_success());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(second.status("deobf"), Some(StageStatus::CacheHit));
    assert_eq!(first.artifact("deobf").unwrap().fingerprint, second.artifact("deobf").unwrap().fingerprint);
    assert!(events.list(second.run_id)
                  .iter()
                  .any(|e| matches!(&e.kind, PipelineEventKind::CacheHit { stage_id, .. } if stage_id == "deobf")));
}

#[test]
fn locality_observed_at_finalize_applies_to_every_stage() {
    let ctx = BuildContext::new();
    let mut b = PipelineBuilder::new(patterns());
    let bin = b.register(StageSpec::new(CountingStage::transform("bin"), OutputSpec::pattern("Bin", ""))).unwrap();
    let srg = b.register(StageSpec::new(CountingStage::transform("srg"), OutputSpec::pattern("", "srgBin"))).unwrap();
    b.observe_transformers(true);
    let graph = b.finalize(&ctx).unwrap();
    assert_eq!(graph.location(&bin), Some(PathBuf::from("/local/mcBin").as_path()));
    assert_eq!(graph.location(&srg), Some(PathBuf::from("/local/mc-srgBin").as_path()));

    // el flag queda fijado para el resto de la build
    let mut b = PipelineBuilder::new(patterns());
    let again = b.register(StageSpec::new(CountingStage::transform("bin"), OutputSpec::pattern("Bin", ""))).unwrap();
    let graph = b.finalize(&ctx).unwrap();
    assert_eq!(graph.location(&again), Some(PathBuf::from("/local/mcBin").as_path()));
}

#[test]
fn global_pattern_without_transformers() {
    let mut b = PipelineBuilder::new(patterns());
    let bin = b.register(StageSpec::new(CountingStage::transform("bin"), OutputSpec::pattern("Bin", ""))).unwrap();
    let graph = b.finalize(&BuildContext::new()).unwrap();
    assert_eq!(graph.location(&bin), Some(PathBuf::from("/global/mcBin").as_path()));
}

#[test]
fn topology_queries() {
    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::source("input"), OutputSpec::Fixed(PathBuf::from("/in")))).unwrap();
    b.register(StageSpec::new(CountingStage::transform("bin"), OutputSpec::pattern("Bin", "")).input("input")).unwrap();
    b.register(StageSpec::new(CountingStage::transform("srg"), OutputSpec::pattern("", "srg")).input("input")).unwrap();
    b.register(StageSpec::new(CountingStage::transform("decomp"), OutputSpec::pattern("", "d")).input("srg")).unwrap();
    let graph = b.finalize(&BuildContext::new()).unwrap();

    assert_eq!(graph.topological_order(), &["input", "bin", "srg", "decomp"]);
    assert!(graph.independent("bin", "decomp"));
    assert!(!graph.independent("srg", "decomp"));
    assert_eq!(graph.dependents("input").len(), 3);

    let mut done = HashSet::new();
    assert_eq!(graph.ready(&done), vec!["input"]);
    done.insert("input".to_string());
    assert_eq!(graph.ready(&done), vec!["bin", "srg"]);
}

#[test]
fn finalize_rejects_cycles_and_unknown_inputs() {
    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::transform("a"), OutputSpec::pattern("", "a")).input("b")).unwrap();
    b.register(StageSpec::new(CountingStage::transform("b"), OutputSpec::pattern("", "b")).input("a")).unwrap();
    assert!(matches!(b.finalize(&BuildContext::new()), Err(CoreEngineError::CycleDetected(_))));

    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::transform("a"), OutputSpec::pattern("", "a")).input("ghost")).unwrap();
    assert!(matches!(b.finalize(&BuildContext::new()), Err(CoreEngineError::UnknownInput { .. })));

    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::transform("a"), OutputSpec::pattern("", "a"))).unwrap();
    assert!(matches!(b.register(StageSpec::new(CountingStage::transform("a"), OutputSpec::pattern("", "a"))),
                     Err(CoreEngineError::DuplicateStage(_))));
}

#[test]
fn deferred_params_are_resolved_at_finalize() {
    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::transform("a").with_params(serde_json::json!({"x": 1})),
                              OutputSpec::pattern("", "a")).deferred("locality", |ctx| {
                                                              Ok(serde_json::json!(format!("{:?}", ctx.locality.current())))
                                                          }))
     .unwrap();
    let graph = b.finalize(&BuildContext::new()).unwrap();
    assert_eq!(graph.node("a").unwrap().params, serde_json::json!({"x": 1, "locality": "Global"}));

    let mut b = PipelineBuilder::new(patterns());
    b.register(StageSpec::new(CountingStage::transform("a"), OutputSpec::pattern("", "a")).deferred("bad", |_| {
                                                                                              Err("missing".into())
                                                                                          }))
     .unwrap();
    assert!(matches!(b.finalize(&BuildContext::new()), Err(CoreEngineError::UnresolvedParameter { .. })));
}
