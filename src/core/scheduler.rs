//! Scheduler - starts every process at once and tracks the run's outcome
//!
//! Each process runs on its own tokio task with a sink pair and a clone of
//! the run's cancellation token. A single driver task joins them and feeds
//! every settlement through the [`Lifecycle`] reducer, publishing the state
//! on a watch channel read by the [`RunHandle`].
//!
//! A failure (without keep-running) rejects the run at once but does not
//! cancel the other processes: the token belongs to the caller. Remaining
//! processes keep running, rendering and settling in the background.

use super::lifecycle::{Lifecycle, Outcome, Settlement};
use super::multiplexer::Multiplexer;
use super::process::{ProcessContext, ProcessDescriptor};
use super::sink::OutputSink;
use super::width::ColumnWidth;
use crate::error::ProcessError;
use crate::events::{EventHub, RunEvent};
use crate::surface::RenderSurface;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Run configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Label column width instead of the longest label (clamped to 1..=25)
    #[serde(default)]
    pub prefix_column_size: Option<i64>,
    /// Never resolve or reject; keep the surface live after processes end
    #[serde(default, alias = "keep_running")]
    pub keep_running_after_processes_resolve: bool,
}

/// State published by the driver after every settlement
#[derive(Debug, Clone)]
struct RunState {
    outcome: Outcome,
    outstanding: usize,
}

impl From<&Lifecycle> for RunState {
    fn from(lifecycle: &Lifecycle) -> Self {
        Self {
            outcome: lifecycle.outcome().clone(),
            outstanding: lifecycle.outstanding(),
        }
    }
}

/// Runs a set of processes against one render surface
pub struct Scheduler {
    surface: Box<dyn RenderSurface>,
    options: RunOptions,
    events: EventHub,
}

impl Scheduler {
    pub fn new(surface: impl RenderSurface + 'static) -> Self {
        Self {
            surface: Box::new(surface),
            options: RunOptions::default(),
            events: EventHub::new(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = events;
        self
    }

    /// Start every process and return a handle on the run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(self, descriptors: Vec<ProcessDescriptor>, cancel: CancellationToken) -> RunHandle {
        let width = ColumnWidth::resolve(
            descriptors.iter().map(ProcessDescriptor::label),
            self.options.prefix_column_size,
        );
        let keep_running = self.options.keep_running_after_processes_resolve;
        let mut lifecycle = Lifecycle::new(descriptors.len(), keep_running);
        let (state_tx, state_rx) = watch::channel(RunState::from(&lifecycle));
        let mux = Multiplexer::with_events(self.surface, width, self.events.clone());

        if descriptors.is_empty() {
            log::debug!("No processes to run");
            return RunHandle {
                state: state_rx,
                mux,
            };
        }

        let mut running = JoinSet::new();
        for descriptor in descriptors {
            let (stdout, stderr) = mux.sinks(descriptor.label());
            let ctx = ProcessContext {
                stdout,
                stderr,
                cancel: cancel.clone(),
            };
            let (label, future) = descriptor.start(ctx);

            log::info!("Starting process: {}", label);
            self.events.emit(&RunEvent::ProcessStarted {
                label: label.clone(),
            });

            let task = tokio::spawn(future);
            running.spawn(async move {
                match task.await {
                    Ok(Ok(())) => Settlement::Succeeded { label },
                    Ok(Err(e)) => Settlement::Failed(ProcessError::new(label, e)),
                    Err(e) if e.is_panic() => {
                        let error = anyhow::anyhow!("process '{}' panicked", label);
                        Settlement::Failed(ProcessError::new(label, error))
                    }
                    Err(_) => {
                        let error = anyhow::anyhow!("process '{}' was aborted", label);
                        Settlement::Failed(ProcessError::new(label, error))
                    }
                }
            });
        }

        let events = self.events;
        tokio::spawn(async move {
            while let Some(joined) = running.join_next().await {
                let settlement = match joined {
                    Ok(settlement) => settlement,
                    Err(e) => {
                        log::error!("Lost a process settlement: {}", e);
                        continue;
                    }
                };

                match &settlement {
                    Settlement::Succeeded { label } => log::info!("Process {} completed", label),
                    Settlement::Failed(err) => log::warn!("Process {} failed: {}", err.label(), err),
                }
                events.emit(&RunEvent::ProcessSettled {
                    label: settlement.label().to_string(),
                    error: match &settlement {
                        Settlement::Failed(err) => Some(err.to_string()),
                        Settlement::Succeeded { .. } => None,
                    },
                });

                if lifecycle.settle(settlement) {
                    let outcome = lifecycle.outcome();
                    log::debug!("Run outcome is now {}", outcome.name());
                    events.emit(&RunEvent::OutcomeChanged {
                        outcome: outcome.name().to_string(),
                        error: outcome.error().map(ToString::to_string),
                    });
                }
                state_tx.send_replace(RunState::from(&lifecycle));
            }

            log::debug!(
                "All processes settled: {} succeeded, {} failed",
                lifecycle.succeeded(),
                lifecycle.failed()
            );
        });

        RunHandle {
            state: state_rx,
            mux,
        }
    }
}

/// Handle on a started run
pub struct RunHandle {
    state: watch::Receiver<RunState>,
    mux: Multiplexer,
}

impl RunHandle {
    /// Current outcome
    pub fn outcome(&self) -> Outcome {
        self.state.borrow().outcome.clone()
    }

    /// Processes that have not settled yet
    pub fn outstanding(&self) -> usize {
        self.state.borrow().outstanding
    }

    pub fn width(&self) -> ColumnWidth {
        self.mux.width()
    }

    /// Wait for the run to resolve or reject.
    ///
    /// Under keep-running this never completes; use [`RunHandle::settled`]
    /// after cancelling instead.
    pub async fn wait(&self) -> Result<(), ProcessError> {
        let mut state = self.state.clone();
        let outcome = state
            .wait_for(|s| s.outcome.is_final())
            .await
            .map(|s| s.outcome.clone());

        match outcome {
            Ok(Outcome::Rejected(err)) => Err(err),
            Ok(_) => Ok(()),
            Err(_) => std::future::pending().await,
        }
    }

    /// Wait until every process has settled, whatever the policy, and
    /// return the outcome at that point
    pub async fn settled(&self) -> Outcome {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|s| s.outstanding == 0)
            .await
            .map(|s| s.outcome.clone());

        settled.unwrap_or_else(|_| self.outcome())
    }

    /// Extra sinks writing to this run's surface, e.g. for status lines
    /// while a keep-running session stays open
    pub fn sinks(&self, label: &str) -> (OutputSink, OutputSink) {
        self.mux.sinks(label)
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RunHandle")
            .field("outcome", &state.outcome.name())
            .field("outstanding", &state.outstanding)
            .finish()
    }
}
