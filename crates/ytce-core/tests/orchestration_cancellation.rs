use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use ytce_core::adapters::{
    AdapterResult, GenerateRequest, ModelAdapter, ModelResponse, OfflineModelAdapter,
};
use ytce_core::checkpoint::{CheckpointStore, InMemoryCheckpointStore, JsonlCheckpointStore};
use ytce_core::config::RunOptions;
use ytce_core::models::{Comment, JobSpec, ResultStatus, TaskDefinition, TaskType};
use ytce_core::orchestration::{CancellationToken, Orchestrator};

/// Trips the cancellation token while answering call number `cancel_on`.
struct InterruptingAdapter {
    inner: OfflineModelAdapter,
    cancel: CancellationToken,
    cancel_on: usize,
    calls: AtomicUsize,
    records: AtomicUsize,
}

impl InterruptingAdapter {
    fn new(cancel: CancellationToken, cancel_on: usize) -> Self {
        Self {
            inner: OfflineModelAdapter::new(),
            cancel,
            cancel_on,
            calls: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
        }
    }
}

impl ModelAdapter for InterruptingAdapter {
    fn name(&self) -> &str {
        "interrupting"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> AdapterResult<ModelResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.records
            .fetch_add(request.comment_ids.len(), Ordering::SeqCst);
        if call == self.cancel_on {
            self.cancel.cancel();
        }
        self.inner.generate(request)
    }
}

fn temp_path(test_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("ytce-{test_name}-{nanos}.ckpt.jsonl"))
}

fn job() -> JobSpec {
    JobSpec {
        tasks: vec![
            TaskDefinition::new("spam", TaskType::BinaryClassification, "Is this spam?")
                .labels(["spam", "ham"]),
            TaskDefinition::new("lang", TaskType::LanguageDetection, "Which language?"),
        ],
        ..JobSpec::default()
    }
}

fn comments(count: usize) -> Vec<Comment> {
    (1..=count)
        .map(|n| Comment::new(format!("c{n}"), format!("comment {n}")))
        .collect()
}

fn options() -> RunOptions {
    RunOptions {
        batch_size: 2,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn cancellation_stops_dispatch_and_keeps_finished_batches() {
    let cancel = CancellationToken::new();
    let adapter = Arc::new(InterruptingAdapter::new(cancel.clone(), 2));
    let store = Arc::new(InMemoryCheckpointStore::new());
    let orchestrator = Orchestrator::new(adapter.clone(), store.clone(), options())
        .unwrap()
        .with_cancellation(cancel.clone());

    let report = orchestrator.run(&job(), comments(10)).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.already_done("spam").unwrap().len(), 4);
    assert!(store.already_done("lang").unwrap().is_empty());

    let spam = report.summary.task("spam").unwrap();
    assert_eq!(spam.completed, 4);
    assert_eq!(spam.pending(), 6);
    let lang = report.summary.task("lang").unwrap();
    assert_eq!(lang.model_calls, 0);
    assert_eq!(lang.pending(), 10);

    assert_eq!(report.result.len(), 10);
    let unreached = report.result.record("c9").unwrap().result("spam").unwrap();
    assert_eq!(unreached.status, ResultStatus::Failed);
}

#[tokio::test]
async fn cancelled_run_resumes_without_recomputing() {
    let path = temp_path("cancel-resume");

    let cancel = CancellationToken::new();
    let interrupted = Arc::new(InterruptingAdapter::new(cancel.clone(), 3));
    let first = Orchestrator::new(
        interrupted.clone(),
        Arc::new(JsonlCheckpointStore::open(&path).unwrap()),
        options(),
    )
    .unwrap()
    .with_cancellation(cancel);
    let first_report = first.run(&job(), comments(9)).await.unwrap();
    assert!(first_report.cancelled);
    assert_eq!(interrupted.records.load(Ordering::SeqCst), 6);

    let resumed = Arc::new(InterruptingAdapter::new(CancellationToken::new(), usize::MAX));
    let second = Orchestrator::new(
        resumed.clone(),
        Arc::new(JsonlCheckpointStore::open(&path).unwrap()),
        options(),
    )
    .unwrap();
    let report = second.run(&job(), comments(9)).await.unwrap();

    assert!(!report.cancelled);
    // 3 spam records left plus all 9 language records.
    assert_eq!(resumed.records.load(Ordering::SeqCst), 3 + 9);
    assert_eq!(report.summary.task("spam").unwrap().resumed, 6);
    assert!(report.summary.tasks.iter().all(|task| task.pending() == 0));

    let _ = fs::remove_file(path);
}

#[tokio::test]
async fn cancelling_before_the_run_issues_no_calls() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let adapter = Arc::new(InterruptingAdapter::new(cancel.clone(), usize::MAX));
    let orchestrator = Orchestrator::new(
        adapter.clone(),
        Arc::new(InMemoryCheckpointStore::new()),
        options(),
    )
    .unwrap()
    .with_cancellation(cancel);

    let report = orchestrator.run(&job(), comments(4)).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.result.len(), 4);
}

#[tokio::test]
async fn concurrent_batches_in_flight_are_all_checkpointed() {
    let cancel = CancellationToken::new();
    let adapter = Arc::new(InterruptingAdapter::new(cancel.clone(), 1));
    let store = Arc::new(InMemoryCheckpointStore::new());
    let options = RunOptions {
        batch_size: 2,
        max_in_flight: 3,
        ..RunOptions::default()
    };
    let orchestrator = Orchestrator::new(adapter.clone(), store.clone(), options)
        .unwrap()
        .with_cancellation(cancel);

    let report = orchestrator.run(&job(), comments(20)).await.unwrap();
    assert!(report.cancelled);

    let calls = adapter.calls.load(Ordering::SeqCst);
    assert!((1..=3).contains(&calls), "calls = {calls}");
    assert_eq!(store.entry_count().unwrap(), calls * 2);
    assert_eq!(report.summary.task("spam").unwrap().completed, calls * 2);
}
