use std::fs;
use std::path::PathBuf;

use deobf_core::{ArtifactStage, ArtifactStore, BuildContext, CachePatterns, EventStore, ExecutionContext, OutputSpec,
                 PipelineBuilder, PipelineEventKind, StageDefinition, StageRunResult, StageSpec, StageStatus};
use deobf_persistence::{FsArtifactStore, JsonlEventStore};
use serde_json::{json, Value};

struct WriteStage {
    id: &'static str,
    content: &'static str,
    fail: bool,
}

impl StageDefinition for WriteStage {
    fn id(&self) -> &str {
        self.id
    }
    fn stage(&self) -> ArtifactStage {
        ArtifactStage::Patched
    }
    fn base_params(&self) -> Value {
        json!({"content": self.content})
    }
    fn run(&self, ctx: &ExecutionContext) -> StageRunResult {
        if let Err(e) = fs::create_dir_all(&ctx.output) {
            return StageRunResult::failure(e);
        }
        if let Err(e) = fs::write(ctx.output.join("Foo.java"), self.content) {
            return StageRunResult::failure(e);
        }
        if self.fail {
            return StageRunResult::failure("hunk 2 failed");
        }
        StageRunResult::Success { metadata: None }
    }
}

fn build(root: &std::path::Path, content: &'static str, fail: bool) -> deobf_core::StageGraph {
    let patterns = CachePatterns::new(root.join("g/mc{appendage}").display().to_string(),
                                      root.join("l/mc{appendage}").display().to_string());
    let mut b = PipelineBuilder::new(patterns);
    b.register(StageSpec::new(WriteStage { id: "patch", content, fail }, OutputSpec::pattern("", "decompFixed")))
     .unwrap();
    b.finalize(&BuildContext::new()).unwrap()
}

#[test]
fn commit_writes_sidecar_and_second_run_hits_cache() {
    let root = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new();
    let mut events = JsonlEventStore::new(&root.path().join("events")).unwrap();

    let graph = build(root.path(), "class Foo {}", false);
    let first = graph.execute(&mut events, &store);
    assert!(first.is_success());
    let loc = first.artifact("patch").unwrap().location.clone();
    assert_eq!(loc, root.path().join("g/mc-decompFixed"));
    assert_eq!(fs::read_to_string(loc.join("Foo.java")).unwrap(), "class Foo {}");
    assert_eq!(FsArtifactStore::recorded_fingerprint(&loc).as_deref(),
               Some(first.artifact("patch").unwrap().fingerprint.as_str()));

    let second = build(root.path(), "class Foo {}", false).execute(&mut events, &store);
    assert_eq!(second.status("patch"), Some(StageStatus::CacheHit));

    let persisted = events.list(second.run_id);
    assert!(persisted.iter().any(|e| matches!(e.kind, PipelineEventKind::CacheHit { .. })));
    assert_eq!(persisted.iter().map(|e| e.seq).collect::<Vec<_>>(), (0..persisted.len() as u64).collect::<Vec<_>>());
}

#[test]
fn changed_params_replace_stale_output() {
    let root = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new();
    let mut events = deobf_core::InMemoryEventStore::default();
    build(root.path(), "v1", false).execute(&mut events, &store);
    let report = build(root.path(), "v2", false).execute(&mut events, &store);
    assert_eq!(report.status("patch"), Some(StageStatus::FinishedOk));
    let loc = report.artifact("patch").unwrap().location.clone();
    assert_eq!(fs::read_to_string(loc.join("Foo.java")).unwrap(), "v2");
}

#[test]
fn failed_stage_leaves_no_output_on_disk() {
    let root = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new();
    let mut events = deobf_core::InMemoryEventStore::default();
    let report = build(root.path(), "half", true).execute(&mut events, &store);
    assert_eq!(report.status("patch"), Some(StageStatus::Failed));
    let target: PathBuf = root.path().join("g/mc-decompFixed");
    assert!(!target.exists());
    assert!(!store.is_fresh(&target, "anything"));
    // sólo queda el directorio padre vacío
    assert_eq!(fs::read_dir(root.path().join("g")).unwrap().count(), 0);
}
