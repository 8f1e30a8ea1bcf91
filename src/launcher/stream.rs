//! The lazy event sequence produced for one launched step.
//!
//! Phase A runs one status poll and one event-log read cycle per tick until the
//! job is terminal. Phase B keeps reading on the same interval until the
//! completion sentinel shows up or the wait budget, measured from submission,
//! runs out. Every fatal condition becomes the final item of the sequence.

use super::cancellation::CancellationSignal;
use super::cleanup::LogRetrievalGuard;
use crate::constants::operations;
use crate::error::{LaunchError, LaunchResult};
use crate::job::RemoteJobMonitor;
use crate::logging::log_launch_operation;
use crate::models::DomainEvent;
use crate::recovery::{EventBatch, EventLogOffset, EventStreamRecovery};
use futures::stream::{self, BoxStream, Fuse, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Polling job status, one read cycle per tick
    AwaitingJob,
    /// Job succeeded, polling the log for the sentinel
    AwaitingLogs,
    Finished,
}

pub(crate) struct EventPump {
    run_id: String,
    step_key: String,
    monitor: RemoteJobMonitor,
    recovery: EventStreamRecovery,
    offset: EventLogOffset,
    cancellation: CancellationSignal,
    poll_interval: Duration,
    phase: Phase,
    buffered: VecDeque<DomainEvent>,
    pending_error: Option<LaunchError>,
    guard: Option<LogRetrievalGuard>,
}

impl EventPump {
    pub(crate) fn new(
        run_id: impl Into<String>,
        step_key: impl Into<String>,
        monitor: RemoteJobMonitor,
        recovery: EventStreamRecovery,
        cancellation: CancellationSignal,
        poll_interval: Duration,
        guard: LogRetrievalGuard,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_key: step_key.into(),
            monitor,
            recovery,
            offset: EventLogOffset::default(),
            cancellation,
            poll_interval,
            phase: Phase::AwaitingJob,
            buffered: VecDeque::new(),
            pending_error: None,
            guard: Some(guard),
        }
    }

    pub(crate) fn into_stream(self) -> Fuse<BoxStream<'static, LaunchResult<DomainEvent>>> {
        stream::unfold(self, |mut pump| async move {
            pump.next_item().await.map(|item| (item, pump))
        })
        .boxed()
        .fuse()
    }

    async fn next_item(&mut self) -> Option<LaunchResult<DomainEvent>> {
        loop {
            if let Some(event) = self.buffered.pop_front() {
                return Some(Ok(event));
            }

            if let Some(err) = self.pending_error.take() {
                self.release_guard().await;
                return Some(Err(err));
            }

            match self.phase {
                Phase::AwaitingJob => self.job_tick().await,
                Phase::AwaitingLogs => self.log_tick().await,
                Phase::Finished => {
                    self.release_guard().await;
                    return None;
                }
            }
        }
    }

    async fn job_tick(&mut self) {
        if !self.wait_or_cancel().await {
            return;
        }

        let status = self.monitor.poll().await;

        // The read cycle runs even when the status query failed
        match self.recovery.read_new_events(self.offset).await {
            Err(err) => self.fail(err),
            Ok(batch) => {
                self.accept(batch);
                match status {
                    Ok(true) => {
                        log_launch_operation(
                            operations::JOB_TERMINAL,
                            &self.run_id,
                            &self.step_key,
                            Some(self.monitor.job().as_str()),
                            "succeeded",
                            None,
                        );
                        if self.offset.is_complete() {
                            self.complete();
                        } else {
                            self.phase = Phase::AwaitingLogs;
                        }
                    }
                    Ok(false) => {}
                    Err(err) => self.fail(err),
                }
            }
        }
    }

    async fn log_tick(&mut self) {
        match self.recovery.read_new_events(self.offset).await {
            Err(err) => self.fail(err),
            Ok(batch) => {
                self.accept(batch);
                if self.offset.is_complete() {
                    self.complete();
                } else if self.monitor.elapsed() > self.monitor.max_wait() {
                    self.fail(LaunchError::log_availability_timeout(
                        self.monitor.job().as_str(),
                        self.monitor.max_wait().as_secs(),
                    ));
                } else {
                    info!(
                        job = %self.monitor.job(),
                        offset = self.offset.as_raw(),
                        "Waiting for remote event log to complete"
                    );
                    self.wait_or_cancel().await;
                }
            }
        }
    }

    /// Sleep one poll interval. Returns `false` if cancelled instead.
    async fn wait_or_cancel(&mut self) -> bool {
        let cancelled = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => true,
            _ = tokio::time::sleep(self.poll_interval) => false,
        };

        if cancelled {
            log_launch_operation(
                operations::LAUNCH_CANCELLED,
                &self.run_id,
                &self.step_key,
                Some(self.monitor.job().as_str()),
                "cancelled",
                None,
            );
            self.pending_error = Some(LaunchError::cancelled(&self.step_key));
            self.phase = Phase::Finished;
        }
        !cancelled
    }

    fn accept(&mut self, batch: EventBatch) {
        if !batch.events.is_empty() {
            debug!(
                step_key = %self.step_key,
                events = batch.events.len(),
                offset = batch.offset.as_raw(),
                "Recovered remote events"
            );
        }
        self.buffered.extend(batch.events);
        self.offset = batch.offset;
    }

    fn complete(&mut self) {
        log_launch_operation(
            operations::LOGS_COMPLETE,
            &self.run_id,
            &self.step_key,
            Some(self.monitor.job().as_str()),
            "complete",
            None,
        );
        self.phase = Phase::Finished;
    }

    fn fail(&mut self, err: LaunchError) {
        let details = err.to_string();
        log_launch_operation(
            operations::LAUNCH_FAILED,
            &self.run_id,
            &self.step_key,
            Some(self.monitor.job().as_str()),
            "failed",
            Some(&details),
        );
        self.pending_error = Some(err);
        self.phase = Phase::Finished;
    }

    async fn release_guard(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release().await;
        }
    }
}
