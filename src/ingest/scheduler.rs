// src/ingest/scheduler.rs
//! Fixed-interval driver for the ingest cycle.
//!
//! A failing (or panicking) cycle is logged and followed by the usual sleep; the
//! loop only ends on a stop request or after `max_iterations`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use metrics::{counter, gauge};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Sleeping,
    Stopped,
}

/// Cloneable stop request. Takes effect at the next check point: a running cycle
/// finishes first, a sleep is cut short.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub iterations: u64,
    pub succeeded: u64,
    pub failed: u64,
}

pub struct Scheduler {
    interval: Duration,
    max_iterations: Option<u64>,
    state: SchedulerState,
    iteration: u64,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            interval,
            max_iterations: None,
            state: SchedulerState::Idle,
            iteration: 0,
            stop_tx: Arc::new(tx),
            stop_rx: rx,
        }
    }

    pub fn with_max_iterations(mut self, max: Option<u64>) -> Self {
        self.max_iterations = max.filter(|m| *m > 0);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    fn set_state(&mut self, state: SchedulerState) {
        tracing::debug!(
            iteration = self.iteration,
            from = ?self.state,
            to = ?state,
            "scheduler state"
        );
        self.state = state;
    }

    /// Run `task` until stopped (or `max_iterations` cycles have run).
    pub async fn run<F, Fut, T>(&mut self, mut task: F) -> SchedulerSummary
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut summary = SchedulerSummary::default();
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "starting scheduler");

        while !self.stop_requested() {
            self.iteration += 1;
            summary.iterations += 1;
            self.set_state(SchedulerState::Running);
            tracing::info!(
                iteration = self.iteration,
                started_at = %chrono::Utc::now().to_rfc3339(),
                "starting iteration"
            );

            let result = AssertUnwindSafe(task()).catch_unwind().await;
            counter!("ingest_cycles_total").increment(1);
            gauge!("ingest_pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

            match result {
                Ok(Ok(_)) => {
                    summary.succeeded += 1;
                    self.set_state(SchedulerState::Succeeded);
                }
                Ok(Err(error)) => {
                    summary.failed += 1;
                    counter!("ingest_cycle_failures_total").increment(1);
                    tracing::error!(
                        iteration = self.iteration,
                        error = ?error,
                        "error in scheduled task"
                    );
                    self.set_state(SchedulerState::Failed);
                }
                Err(panic) => {
                    summary.failed += 1;
                    counter!("ingest_cycle_failures_total").increment(1);
                    tracing::error!(
                        iteration = self.iteration,
                        panic = panic_message(panic.as_ref()),
                        "scheduled task panicked"
                    );
                    self.set_state(SchedulerState::Failed);
                }
            }

            if self.max_iterations.is_some_and(|m| self.iteration >= m) {
                tracing::info!(max_iterations = self.iteration, "reached max iterations, stopping");
                break;
            }
            if self.stop_requested() {
                break;
            }

            self.set_state(SchedulerState::Sleeping);
            tracing::info!(
                wait_secs = self.interval.as_secs_f64(),
                "waiting until next iteration"
            );
            let mut rx = self.stop_rx.clone();
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = rx.wait_for(|stopped| *stopped) => {
                    tracing::info!("stop requested while sleeping");
                }
            }
        }

        self.set_state(SchedulerState::Stopped);
        tracing::info!(
            iterations = summary.iterations,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "scheduler stopped"
        );
        summary
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
