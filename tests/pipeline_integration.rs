//! Integration tests for the resolution pipeline.
//!
//! These drive [`Orchestrator`] end to end against a scripted extractor on a
//! paused Tokio clock, so pacing delays and latencies cost no real time.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use playlist_grabber_core::playlist::{Playlist, PlaylistEntry};
use playlist_grabber_core::resolve::{
    ConfigError, OutcomeKind, Orchestrator, ProgressEvent, ProgressObserver, ResolutionOutcome,
    RunOptions, SkipReason, Strategy,
};
use tokio_util::sync::CancellationToken;

mod support;
use support::{Script, ScriptedExtractor, entries, numbered_entries};

// ==================== Helper Functions ====================

fn options(strategy: Strategy, workers: i64) -> RunOptions {
    RunOptions {
        strategy,
        workers,
        pacing_delay_secs: 0.05,
        ..RunOptions::default()
    }
}

fn orchestrator(extractor: &Arc<ScriptedExtractor>, options: RunOptions) -> Orchestrator {
    Orchestrator::new(extractor.clone(), options).unwrap()
}

/// Latencies that make later entries finish first.
fn reversed_latencies(n: usize) -> ScriptedExtractor {
    (0..n).fold(ScriptedExtractor::new(), |extractor, i| {
        let millis = u64::try_from((n - i) * 7).unwrap();
        extractor.latency(&format!("v{i}"), Duration::from_millis(millis))
    })
}

/// Records every progress event.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ProgressEvent>>,
    retries: Mutex<Vec<(String, u32)>>,
}

impl ProgressObserver for Recorder {
    fn on_outcome(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_retry(&self, entry: &PlaylistEntry, next_attempt: u32, _error: &str) {
        self.retries
            .lock()
            .unwrap()
            .push((entry.id.clone(), next_attempt));
    }
}

// ==================== Order Preservation ====================

#[tokio::test(start_paused = true)]
async fn test_report_order_matches_playlist_for_every_worker_count() {
    let n = 30;
    for workers in 1..=20 {
        let extractor = Arc::new(reversed_latencies(n));
        let report = orchestrator(&extractor, options(Strategy::Concurrent, workers))
            .run(numbered_entries(n), None, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.items.len(), n);
        for (i, item) in report.items.iter().enumerate() {
            assert_eq!(item.entry.position, i, "workers = {workers}");
            assert_eq!(
                item.outcome.direct_url(),
                Some(ScriptedExtractor::url_for(&format!("v{i}")).as_str())
            );
        }
        assert_eq!(report.summary.resolved, n);
    }
}

#[tokio::test(start_paused = true)]
async fn test_completion_order_differs_from_report_order() {
    let n = 6;
    let extractor = Arc::new(reversed_latencies(n));
    let recorder = Arc::new(Recorder::default());
    let observer: Arc<dyn ProgressObserver> = recorder.clone();

    let report = orchestrator(&extractor, options(Strategy::Concurrent, 6))
        .run(numbered_entries(n), Some(observer), CancellationToken::new())
        .await
        .unwrap();

    let completion: Vec<usize> = recorder
        .events
        .lock()
        .unwrap()
        .iter()
        .map(|event| event.position)
        .collect();
    assert_eq!(completion, vec![5, 4, 3, 2, 1, 0]);
    let reported: Vec<usize> = report.items.iter().map(|item| item.entry.position).collect();
    assert_eq!(reported, vec![0, 1, 2, 3, 4, 5]);
}

// ==================== Concurrency Bound ====================

#[tokio::test(start_paused = true)]
async fn test_peak_concurrency_never_exceeds_workers() {
    for workers in [1_usize, 3, 7, 20] {
        let extractor = Arc::new(ScriptedExtractor::new());
        orchestrator(
            &extractor,
            options(Strategy::Concurrent, i64::try_from(workers).unwrap()),
        )
        .run(numbered_entries(40), None, CancellationToken::new())
        .await
        .unwrap();

        assert!(extractor.peak_concurrency() <= workers, "workers = {workers}");
        assert_eq!(extractor.peak_concurrency(), workers, "slots should fill up");
    }
}

#[tokio::test(start_paused = true)]
async fn test_sequential_strategy_runs_one_at_a_time() {
    let extractor = Arc::new(ScriptedExtractor::new());
    orchestrator(&extractor, options(Strategy::Sequential, 20))
        .run(numbered_entries(10), None, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(extractor.peak_concurrency(), 1);
    assert_eq!(extractor.total_calls(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_workers_above_ceiling_are_clamped_at_runtime() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let orchestrator = orchestrator(&extractor, options(Strategy::Concurrent, 25));
    assert_eq!(orchestrator.config().workers(), 20);

    orchestrator
        .run(numbered_entries(50), None, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(extractor.peak_concurrency(), 20);
}

// ==================== Retry Semantics ====================

#[tokio::test(start_paused = true)]
async fn test_always_failing_entry_uses_exact_retry_budget() {
    for max_retries in 1..=5 {
        let extractor = Arc::new(ScriptedExtractor::new().script("x", Script::AlwaysFail));
        let opts = RunOptions {
            max_retries,
            ..options(Strategy::Concurrent, 4)
        };

        let report = orchestrator(&extractor, opts)
            .run(entries(&["x"]), None, CancellationToken::new())
            .await
            .unwrap();

        let expected = u32::try_from(max_retries).unwrap();
        assert_eq!(extractor.calls("x"), expected);
        match &report.items[0].outcome {
            ResolutionOutcome::Failed {
                attempts_made,
                reason,
            } => {
                assert_eq!(*attempts_made, expected);
                assert!(reason.contains("503"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(report.summary.failed, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_entry_skipped_after_single_attempt() {
    for reason in [
        SkipReason::Private,
        SkipReason::Deleted,
        SkipReason::AgeRestricted,
        SkipReason::Unavailable,
    ] {
        let extractor = Arc::new(ScriptedExtractor::new().script("u", Script::Unavailable(reason)));
        let report = orchestrator(&extractor, options(Strategy::Sequential, 1))
            .run(entries(&["u"]), None, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(extractor.calls("u"), 1);
        assert_eq!(report.items[0].outcome, ResolutionOutcome::Skipped { reason });
    }
}

#[tokio::test(start_paused = true)]
async fn test_retries_are_reported_to_observer() {
    let extractor = Arc::new(ScriptedExtractor::new().script("b", Script::FailTimes(2)));
    let recorder = Arc::new(Recorder::default());
    let observer: Arc<dyn ProgressObserver> = recorder.clone();

    orchestrator(&extractor, options(Strategy::Sequential, 1))
        .run(entries(&["a", "b"]), Some(observer), CancellationToken::new())
        .await
        .unwrap();

    let retries = recorder.retries.lock().unwrap().clone();
    assert_eq!(retries, vec![("b".to_string(), 2), ("b".to_string(), 3)]);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_attempt_times_out_and_is_retried() {
    let extractor = Arc::new(ScriptedExtractor::new().script("slow", Script::Hang));
    let opts = RunOptions {
        max_retries: 2,
        attempt_timeout: Some(Duration::from_secs(5)),
        ..options(Strategy::Concurrent, 2)
    };

    let report = orchestrator(&extractor, opts)
        .run(entries(&["slow", "fast"]), None, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(extractor.calls("slow"), 2);
    match &report.items[0].outcome {
        ResolutionOutcome::Failed {
            attempts_made,
            reason,
        } => {
            assert_eq!(*attempts_made, 2);
            assert!(reason.contains("timed out"), "{reason}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(report.items[1].outcome.kind(), OutcomeKind::Resolved);
}

// ==================== Fault Isolation ====================

#[tokio::test(start_paused = true)]
async fn test_panicking_entry_does_not_stop_siblings() {
    for (strategy, workers) in [(Strategy::Sequential, 1), (Strategy::Concurrent, 3)] {
        let extractor = Arc::new(ScriptedExtractor::new().script("v2", Script::Panic));
        let report = orchestrator(&extractor, options(strategy, workers))
            .run(numbered_entries(6), None, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary.resolved, 5, "{strategy}");
        assert_eq!(report.summary.failed, 1);
        assert_eq!(extractor.calls("v2"), 1, "faults are not retried");
        match &report.items[2].outcome {
            ResolutionOutcome::Failed {
                reason,
                attempts_made,
            } => {
                assert!(reason.contains("unexpected fault"));
                assert_eq!(*attempts_made, 1);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}

// ==================== Configuration ====================

#[test]
fn test_worker_count_validation() {
    let extractor = Arc::new(ScriptedExtractor::new());
    for workers in [0, -1] {
        let err = Orchestrator::new(extractor.clone(), options(Strategy::Concurrent, workers))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidWorkers { value: workers });
    }
    let clamped = Orchestrator::new(extractor, options(Strategy::Concurrent, 25)).unwrap();
    assert_eq!(clamped.config().workers(), 20);
}

#[test]
fn test_non_positive_delay_and_retries_rejected() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let err = Orchestrator::new(
        extractor.clone(),
        RunOptions {
            pacing_delay_secs: -1.0,
            ..RunOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDelay { .. }));

    let err = Orchestrator::new(
        extractor,
        RunOptions {
            max_retries: 0,
            ..RunOptions::default()
        },
    )
    .unwrap_err();
    assert_eq!(err, ConfigError::InvalidRetries { value: 0 });
}

// ==================== End-to-End Scenario ====================

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scenario_independent_of_worker_count() {
    let runs = [
        (Strategy::Sequential, 1),
        (Strategy::Concurrent, 1),
        (Strategy::Concurrent, 10),
    ];
    for (strategy, workers) in runs {
        let extractor = Arc::new(
            ScriptedExtractor::new()
                .script("b", Script::FailTimes(2))
                .script("c", Script::Unavailable(SkipReason::Deleted)),
        );
        let opts = RunOptions {
            max_retries: 3,
            ..options(strategy, workers)
        };

        let report = orchestrator(&extractor, opts)
            .run(entries(&["a", "b", "c"]), None, CancellationToken::new())
            .await
            .unwrap();

        let kinds: Vec<(&str, OutcomeKind)> = report
            .items
            .iter()
            .map(|item| (item.entry.id.as_str(), item.outcome.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a", OutcomeKind::Resolved),
                ("b", OutcomeKind::Resolved),
                ("c", OutcomeKind::Skipped),
            ],
            "{strategy} x{workers}"
        );
        assert_eq!(report.summary.resolved, 2);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(extractor.calls("b"), 3);
        assert_eq!(extractor.calls("c"), 1);
    }
}

// ==================== Pacing ====================

#[tokio::test(start_paused = true)]
async fn test_pacing_applies_per_attempt_and_per_worker() {
    let delay = RunOptions {
        pacing_delay_secs: 1.0,
        ..RunOptions::default()
    };

    let extractor = Arc::new(ScriptedExtractor::new().default_latency(Duration::ZERO));
    let started = tokio::time::Instant::now();
    orchestrator(
        &extractor,
        RunOptions {
            strategy: Strategy::Sequential,
            ..delay.clone()
        },
    )
    .run(numbered_entries(3), None, CancellationToken::new())
    .await
    .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(3));

    let extractor = Arc::new(ScriptedExtractor::new().default_latency(Duration::ZERO));
    let started = tokio::time::Instant::now();
    orchestrator(
        &extractor,
        RunOptions {
            strategy: Strategy::Concurrent,
            workers: 3,
            ..delay
        },
    )
    .run(numbered_entries(3), None, CancellationToken::new())
    .await
    .unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2), "workers pace independently");
}

// ==================== Progress ====================

#[tokio::test(start_paused = true)]
async fn test_observer_fires_once_per_entry_with_running_totals() {
    let extractor = Arc::new(
        ScriptedExtractor::new()
            .script("v1", Script::AlwaysFail)
            .script("v3", Script::Unavailable(SkipReason::Private)),
    );
    let recorder = Arc::new(Recorder::default());
    let observer: Arc<dyn ProgressObserver> = recorder.clone();

    orchestrator(&extractor, options(Strategy::Concurrent, 4))
        .run(numbered_entries(8), Some(observer), CancellationToken::new())
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events.len(), 8);
    let processed: Vec<usize> = events.iter().map(|event| event.totals.processed()).collect();
    assert_eq!(processed, (1..=8).collect::<Vec<_>>());
    let last = events.last().unwrap().totals;
    assert_eq!((last.resolved, last.skipped, last.failed), (6, 1, 1));
    let mut positions: Vec<usize> = events.iter().map(|event| event.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..8).collect::<Vec<_>>());
}

// ==================== Cancellation ====================

#[tokio::test(start_paused = true)]
async fn test_cancellation_marks_remaining_entries_cancelled() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let observer: Arc<dyn ProgressObserver> = Arc::new(move |event: &ProgressEvent| {
        if event.totals.processed() == 2 {
            trigger.cancel();
        }
    });

    let report = orchestrator(&extractor, options(Strategy::Sequential, 1))
        .run(numbered_entries(5), Some(observer), cancel)
        .await
        .unwrap();

    assert_eq!(report.summary.resolved, 2);
    assert_eq!(report.summary.cancelled, 3);
    assert_eq!(extractor.total_calls(), 2);
    assert_eq!(report.items.len(), 5);
    for item in &report.items[2..] {
        assert_eq!(item.outcome, ResolutionOutcome::Cancelled);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_lets_in_flight_attempts_finish() {
    let extractor = Arc::new(
        ScriptedExtractor::new()
            .default_latency(Duration::from_secs(10))
            .script("v0", Script::AlwaysFail),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        // Pacing is 50ms; every first attempt is running by now.
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let report = orchestrator(&extractor, options(Strategy::Concurrent, 3))
        .run(numbered_entries(6), None, cancel)
        .await
        .unwrap();

    // The three admitted attempts completed; v0 failed transiently but is
    // not retried after cancellation.
    assert_eq!(extractor.total_calls(), 3);
    assert_eq!(report.items[1].outcome.kind(), OutcomeKind::Resolved);
    assert_eq!(report.items[2].outcome.kind(), OutcomeKind::Resolved);
    assert_eq!(report.items[0].outcome, ResolutionOutcome::Cancelled);
    for item in &report.items[3..] {
        assert_eq!(item.outcome, ResolutionOutcome::Cancelled);
    }
    assert_eq!(report.summary.cancelled, 4);
}

// ==================== Playlist Input ====================

#[test]
fn test_run_playlist_on_empty_playlist() {
    let extractor = Arc::new(ScriptedExtractor::new());
    let playlist = Playlist::from_raw(Some("Empty".to_string()), Vec::new());

    let report = tokio_test::block_on(
        orchestrator(&extractor, options(Strategy::Concurrent, 5)).run_playlist(
            &playlist,
            None,
            CancellationToken::new(),
        ),
    )
    .unwrap();

    assert!(report.items.is_empty());
    assert_eq!(extractor.total_calls(), 0);
}
