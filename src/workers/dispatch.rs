//! Single-producer dispatch of work items to a fixed pool of workers.

use futures::{Stream, StreamExt};
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info};

use super::common::{ResumeKey, RunSummary};
use crate::config::AppConfig;
use crate::error::{PipelineError, StoreError};
use crate::reconcile::ItemOutcome;
use crate::TARGET_DISPATCH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Skipping,
    Dispatching,
    Draining,
    Done,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchState::Idle => "idle",
            DispatchState::Skipping => "skipping",
            DispatchState::Dispatching => "dispatching",
            DispatchState::Draining => "draining",
            DispatchState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Holds items back until one contains the resume marker. That item and
/// everything after it are admitted.
#[derive(Debug, Clone)]
pub struct ResumeGate {
    marker: Option<String>,
    open: bool,
}

impl ResumeGate {
    pub fn new(marker: Option<&str>) -> Self {
        let marker = marker.filter(|m| !m.is_empty()).map(str::to_string);
        Self {
            open: marker.is_none(),
            marker,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn admit(&mut self, key: &str) -> bool {
        if !self.open {
            if let Some(marker) = &self.marker {
                if key.contains(marker.as_str()) {
                    info!(target: TARGET_DISPATCH, "Found '{}'. Processing begins", marker);
                    self.open = true;
                }
            }
        }
        self.open
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    workers: usize,
    queue_depth: usize,
    resume_marker: Option<String>,
}

impl WorkerPool {
    pub fn new(name: &'static str, workers: usize, queue_depth: usize) -> Self {
        Self {
            name,
            workers: workers.max(1),
            queue_depth: queue_depth.max(1),
            resume_marker: None,
        }
    }

    pub fn from_config(name: &'static str, config: &AppConfig) -> Self {
        Self::new(name, config.workers, config.queue_depth)
            .with_resume_marker(config.resume_marker.clone())
    }

    pub fn with_resume_marker(mut self, marker: Option<String>) -> Self {
        self.resume_marker = marker;
        self
    }

    fn transition(&self, state: &mut DispatchState, next: DispatchState) {
        debug!(target: TARGET_DISPATCH, "[{}]: {} -> {}", self.name, state, next);
        *state = next;
    }

    /// Feeds every admitted item of `source` to `handler` on one of the
    /// workers and waits for all of them to finish.
    ///
    /// The hand-off queue holds `queue_depth` items, so reading the source
    /// stalls while every worker is busy. A store error from any handler, or
    /// a read error from the source, stops dispatch and is returned once the
    /// workers have exited.
    pub async fn run<T, S, F, Fut>(&self, mut source: S, handler: F) -> Result<RunSummary, PipelineError>
    where
        T: ResumeKey + Send + 'static,
        S: Stream<Item = io::Result<T>> + Unpin,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ItemOutcome, StoreError>> + Send + 'static,
    {
        let started = Instant::now();
        let mut state = DispatchState::Idle;
        let mut gate = ResumeGate::new(self.resume_marker.as_deref());
        let mut summary = RunSummary {
            started_at: chrono::Utc::now().to_rfc3339(),
            ..RunSummary::default()
        };

        let (tx, rx) = mpsc::channel::<T>(self.queue_depth);
        let rx = Arc::new(Mutex::new(rx));
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel_tx = Arc::new(cancel_tx);
        let handler = Arc::new(handler);

        info!(target: TARGET_DISPATCH, "[{}]: starting {} workers", self.name, self.workers);
        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let rx = Arc::clone(&rx);
            let handler = Arc::clone(&handler);
            let cancel_tx = Arc::clone(&cancel_tx);
            let cancel_rx = cancel_rx.clone();
            let name = self.name;

            handles.push(tokio::spawn(async move {
                let mut summary = RunSummary::default();
                loop {
                    if *cancel_rx.borrow() {
                        break;
                    }
                    let item = rx.lock().await.recv().await;
                    let Some(item) = item else {
                        break;
                    };
                    if *cancel_rx.borrow() {
                        break;
                    }
                    match handler(item).await {
                        Ok(outcome) => {
                            outcome.report();
                            summary.record(&outcome);
                        }
                        Err(err) => {
                            error!(target: TARGET_DISPATCH, "[{} {}]: fatal store error: {}", name, worker_id, err);
                            let _ = cancel_tx.send(true);
                            return Err(err);
                        }
                    }
                }
                debug!(target: TARGET_DISPATCH, "[{} {}]: exiting", name, worker_id);
                Ok(summary)
            }));
        }
        drop(rx);

        if gate.is_open() {
            self.transition(&mut state, DispatchState::Dispatching);
        } else {
            info!(target: TARGET_DISPATCH, "[{}]: skipping to '{}'", self.name, self.resume_marker.as_deref().unwrap_or_default());
            self.transition(&mut state, DispatchState::Skipping);
        }

        let mut cancelled = cancel_rx.clone();
        let mut input_error = None;
        while let Some(item) = source.next().await {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    error!(target: TARGET_DISPATCH, "[{}]: failed to read work source: {}", self.name, err);
                    let _ = cancel_tx.send(true);
                    input_error = Some(err);
                    break;
                }
            };

            if !gate.admit(item.resume_key()) {
                summary.passed_over += 1;
                continue;
            }
            if state == DispatchState::Skipping {
                self.transition(&mut state, DispatchState::Dispatching);
            }

            tokio::select! {
                sent = tx.send(item) => {
                    if sent.is_err() {
                        break;
                    }
                    summary.dispatched += 1;
                }
                _ = cancelled.wait_for(|stop| *stop) => break,
            }
        }

        self.transition(&mut state, DispatchState::Draining);
        drop(tx);

        let mut fatal = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(worker_summary)) => summary.merge(&worker_summary),
                Ok(Err(err)) => {
                    fatal.get_or_insert(PipelineError::Store(err));
                }
                Err(err) => {
                    fatal.get_or_insert(PipelineError::Worker(err.to_string()));
                }
            }
        }

        self.transition(&mut state, DispatchState::Done);
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        if let Some(err) = input_error {
            return Err(PipelineError::Input(err));
        }
        if let Some(err) = fatal {
            return Err(err);
        }
        info!(target: TARGET_DISPATCH, "[{}]: {} items processed in {:.1}s", self.name, summary.processed(), summary.elapsed_secs);
        Ok(summary)
    }
}
