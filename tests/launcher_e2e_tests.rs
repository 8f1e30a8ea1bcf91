//! End-to-end launches against scripted job service and storage.

mod common;

use common::*;
use futures::stream::FusedStream;
use futures::StreamExt;
use remote_step_launcher::recovery::CollectingRecordSink;
use remote_step_launcher::{
    CancellationSignal, ConfigurationError, DomainEvent, InMemoryArtifactStore, JobServiceError,
    JobStatus, LaunchError, LaunchedStep, StepLauncher,
};
use std::sync::Arc;
use std::time::Duration;

fn launcher(
    fixture: &LaunchFixture,
    store: Arc<ScriptedStore>,
    service: Arc<ScriptedJobService>,
) -> StepLauncher {
    StepLauncher::new(Arc::new(fixture.config.clone()), store, service)
}

/// Consume the whole stream, checking that an error is always the last item
async fn drain(step: LaunchedStep) -> (Vec<DomainEvent>, Option<LaunchError>) {
    let items: Vec<_> = step.collect().await;
    let mut events = Vec::new();
    let mut error = None;
    for item in items {
        assert!(error.is_none(), "stream yielded an item after its error");
        match item {
            Ok(event) => events.push(event),
            Err(err) => error = Some(err),
        }
    }
    (events, error)
}

async fn launch(launcher: &StepLauncher) -> LaunchedStep {
    launcher
        .launch_step(&step_run_ref(), CancellationSignal::new())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_sentinel_at_success_tick_needs_no_log_polling() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    let store = Arc::new(ScriptedStore::new(inner.clone()));

    let writer = inner.clone();
    let uri = fixture.events_uri();
    let service = Arc::new(
        ScriptedJobService::with_statuses(vec![
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Succeeded,
        ])
        .on_status(move |call| {
            if call == 2 {
                let log = EventLogBuilder::new()
                    .events(&["extract", "transform", "load"])
                    .sentinel();
                writer.put(uri.clone(), log.build());
            }
        }),
    );

    let step = launch(&launcher(&fixture, store, service.clone())).await;
    let (events, error) = drain(step).await;

    assert!(error.is_none(), "unexpected error: {error:?}");
    assert_eq!(messages(&events), vec!["extract", "transform", "load"]);
    assert_eq!(service.status_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_late_sentinel_is_awaited_after_success() {
    let fixture = LaunchFixture::new();
    let store = Arc::new(ScriptedStore::new(InMemoryArtifactStore::new()));
    let partial = EventLogBuilder::new().events(&["a", "b", "c"]);
    store.script(
        fixture.events_uri(),
        vec![
            Some(partial.build()),
            Some(partial.build()),
            Some(partial.build()),
            Some(partial.clone().sentinel().build()),
        ],
    );
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let step = launch(&launcher(&fixture, store.clone(), service.clone())).await;
    let (events, error) = drain(step).await;

    assert!(error.is_none(), "unexpected error: {error:?}");
    assert_eq!(messages(&events), vec!["a", "b", "c"]);
    assert_eq!(store.scripted_reads(), 4);
    assert_eq!(service.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_job_that_never_finishes_times_out() {
    let fixture = LaunchFixture::new().with_max_wait_seconds(10);
    let store = Arc::new(ScriptedStore::new(InMemoryArtifactStore::new()));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Running]));

    let step = launch(&launcher(&fixture, store, service.clone())).await;
    let (events, error) = drain(step).await;

    assert!(events.is_empty());
    assert!(matches!(error, Some(LaunchError::JobTimeout { .. })));

    let calls = service.status_calls();
    assert!(calls >= 4);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(service.status_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_events_precede_remote_failure() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    let store = Arc::new(ScriptedStore::new(inner.clone()));

    let writer = inner.clone();
    let uri = fixture.events_uri();
    let service = Arc::new(
        ScriptedJobService::with_statuses(vec![
            JobStatus::Running,
            JobStatus::Failed {
                message: "executor lost".to_string(),
            },
        ])
        .on_status(move |call| {
            if call == 1 {
                let log = EventLogBuilder::new().events(&["started", "crashed"]);
                writer.put(uri.clone(), log.build());
            }
        }),
    );

    let step = launch(&launcher(&fixture, store, service)).await;
    let (events, error) = drain(step).await;

    assert_eq!(messages(&events), vec!["started", "crashed"]);
    match error {
        Some(LaunchError::RemoteFailure { message, .. }) => assert_eq!(message, "executor lost"),
        other => panic!("expected remote failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_status_query_failure_still_reads_the_log() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new().event("before outage").build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::new(vec![Err(JobServiceError::request(
        "get_status",
        "502 bad gateway",
    ))]));

    let step = launch(&launcher(&fixture, store, service)).await;
    let (events, error) = drain(step).await;

    assert_eq!(messages(&events), vec!["before outage"]);
    assert!(matches!(error, Some(LaunchError::RemoteService { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_submission_aborts_launch() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    let store = Arc::new(ScriptedStore::new(inner.clone()));
    let service = Arc::new(
        ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]).rejecting_submissions(),
    );

    let err = launcher(&fixture, store, service.clone())
        .launch_step(&step_run_ref(), CancellationSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchError::Submission { .. }));
    assert_eq!(inner.len(), 4);
    assert_eq!(service.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_never_submits() {
    let fixture = LaunchFixture::new();
    let store = Arc::new(ScriptedStore::new(InMemoryArtifactStore::new()).failing_writes());
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let err = launcher(&fixture, store, service.clone())
        .launch_step(&step_run_ref(), CancellationSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchError::ArtifactUpload { .. }));
    assert!(service.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_fails_before_any_upload() {
    let mut fixture = LaunchFixture::new();
    fixture.config.polling.poll_interval_ms = 0;
    let inner = InMemoryArtifactStore::new();
    let store = Arc::new(ScriptedStore::new(inner.clone()));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let err = launcher(&fixture, store, service.clone())
        .launch_step(&step_run_ref(), CancellationSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LaunchError::Configuration(ConfigurationError::InvalidValue { .. })
    ));
    assert!(inner.paths().is_empty());
    assert!(service.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submitted_task_points_at_staged_artifacts() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(fixture.events_uri(), EventLogBuilder::new().sentinel().build());
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let step = launch(&launcher(&fixture, store, service.clone())).await;
    assert_eq!(step.job().as_str(), "job-1");
    assert_eq!(
        step.artifacts().events.store_uri(),
        "dbfs:/launcher_staging/run-42/transform__0__/events.jsonl"
    );
    drain(step).await;

    let submitted = service.submitted();
    assert_eq!(submitted.len(), 1);
    let task = &submitted[0].task;
    assert_eq!(
        task.executable,
        "dbfs:/launcher_staging/run-42/transform__0__/step_main.py"
    );
    assert_eq!(
        task.parameters,
        vec![
            "/dbfs/launcher_staging/run-42/transform__0__/step_run_ref.json".to_string(),
            "/dbfs/launcher_staging/run-42/transform__0__/remote_config.json".to_string(),
            "/dbfs/launcher_staging/run-42/transform__0__/code.zip".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_finished_stream_stays_finished() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new().event("only").sentinel().build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let mut step = launch(&launcher(&fixture, store, service)).await;
    assert!(!step.is_terminated());
    assert_eq!(step.next().await.unwrap().unwrap().message.as_deref(), Some("only"));
    assert!(step.next().await.is_none());

    assert!(step.is_terminated());
    assert!(step.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_tick() {
    let fixture = LaunchFixture::new();
    let store = Arc::new(ScriptedStore::new(InMemoryArtifactStore::new()));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Running]));
    let cancellation = CancellationSignal::new();

    let step = launcher(&fixture, store, service.clone())
        .launch_step(&step_run_ref(), cancellation.clone())
        .await
        .unwrap();
    cancellation.cancel();
    let (events, error) = drain(step).await;

    assert!(events.is_empty());
    assert!(matches!(error, Some(LaunchError::Cancelled { .. })));
    assert_eq!(service.status_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_stream_ends_with_cancelled() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(fixture.events_uri(), EventLogBuilder::new().event("first").build());
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Running]));
    let cancellation = CancellationSignal::new();

    let mut step = launcher(&fixture, store, service)
        .launch_step(&step_run_ref(), cancellation.clone())
        .await
        .unwrap();

    let first = step.next().await.unwrap().unwrap();
    assert_eq!(first.message.as_deref(), Some("first"));

    cancellation.cancel();
    assert!(matches!(
        step.next().await,
        Some(Err(LaunchError::Cancelled { .. }))
    ));
    assert!(step.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_logs_retrieved_once_on_completion() {
    let fixture = LaunchFixture::new().with_wait_for_logs();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new().event("done").sentinel().build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(
        ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]).with_logs("out", "err"),
    );

    let step = launch(&launcher(&fixture, store, service.clone())).await;
    let (events, error) = drain(step).await;

    assert_eq!(messages(&events), vec!["done"]);
    assert!(error.is_none());
    assert_eq!(service.log_retrievals(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logs_retrieved_after_failure() {
    let fixture = LaunchFixture::new().with_wait_for_logs();
    let store = Arc::new(ScriptedStore::new(InMemoryArtifactStore::new()));
    let service = Arc::new(
        ScriptedJobService::with_statuses(vec![JobStatus::Failed {
            message: "oom".to_string(),
        }])
        .with_logs("", "java.lang.OutOfMemoryError"),
    );

    let step = launch(&launcher(&fixture, store, service.clone())).await;
    let (_, error) = drain(step).await;

    assert!(matches!(error, Some(LaunchError::RemoteFailure { .. })));
    assert_eq!(service.log_retrievals(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_stream_still_retrieves_logs() {
    let fixture = LaunchFixture::new().with_wait_for_logs();
    let inner = InMemoryArtifactStore::new();
    inner.put(fixture.events_uri(), EventLogBuilder::new().event("only").build());
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(
        ScriptedJobService::with_statuses(vec![JobStatus::Running]).with_logs("out", "err"),
    );

    let mut step = launch(&launcher(&fixture, store, service.clone())).await;
    assert!(step.next().await.unwrap().is_ok());
    drop(step);

    for _ in 0..10 {
        if service.log_retrievals() == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(service.log_retrievals(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_sentinel_is_log_availability_timeout() {
    let fixture = LaunchFixture::new().with_max_wait_seconds(10);
    let inner = InMemoryArtifactStore::new();
    inner.put(fixture.events_uri(), EventLogBuilder::new().event("partial").build());
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let step = launch(&launcher(&fixture, store, service)).await;
    let (events, error) = drain(step).await;

    assert_eq!(messages(&events), vec!["partial"]);
    assert!(matches!(
        error,
        Some(LaunchError::LogAvailabilityTimeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_transient_read_failures_are_invisible() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new().events(&["x", "y"]).sentinel().build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    store.fail_reads(fixture.events_uri(), 2);
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));

    let step = launch(&launcher(&fixture, store.clone(), service)).await;
    let (events, error) = drain(step).await;

    assert!(error.is_none(), "unexpected error: {error:?}");
    assert_eq!(messages(&events), vec!["x", "y"]);
    assert_eq!(store.scripted_reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_read_retries_end_the_stream() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new().event("unseen").sentinel().build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    store.fail_reads(fixture.events_uri(), 3);
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Running]));

    let step = launch(&launcher(&fixture, store, service)).await;
    let (events, error) = drain(step).await;

    assert!(events.is_empty());
    match error {
        Some(LaunchError::RemoteService { operation, .. }) => {
            assert_eq!(operation, "read_event_log")
        }
        other => panic!("expected remote service error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reattaching_replays_from_the_start() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new().events(&["one", "two"]).sentinel().build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));
    let launcher = launcher(&fixture, store, service);

    let step = launch(&launcher).await;
    let job = step.job().clone();
    let (first, _) = drain(step).await;

    let again = launcher
        .attach(&step_run_ref(), job, CancellationSignal::new())
        .unwrap();
    let (second, error) = drain(again).await;

    assert!(error.is_none());
    assert_eq!(messages(&first), vec!["one", "two"]);
    assert_eq!(messages(&second), messages(&first));
}

#[tokio::test(start_paused = true)]
async fn test_sink_receives_records_without_events() {
    let fixture = LaunchFixture::new();
    let inner = InMemoryArtifactStore::new();
    inner.put(
        fixture.events_uri(),
        EventLogBuilder::new()
            .plain("spark session created")
            .event("output")
            .sentinel()
            .build(),
    );
    let store = Arc::new(ScriptedStore::new(inner));
    let service = Arc::new(ScriptedJobService::with_statuses(vec![JobStatus::Succeeded]));
    let sink = Arc::new(CollectingRecordSink::new());

    let launcher = launcher(&fixture, store, service).with_record_sink(sink.clone());
    let (events, _) = drain(launch(&launcher).await).await;

    assert_eq!(messages(&events), vec!["output"]);
    let records: Vec<_> = sink.records().into_iter().map(|r| r.message).collect();
    assert_eq!(records, vec!["spark session created", "output"]);
}
