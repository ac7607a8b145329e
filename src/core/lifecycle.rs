//! Lifecycle controller - reduces process settlements into one outcome
//!
//! ```text
//!              all settled, no keep-running
//!   Pending ─────────────────────────────────▶ Resolved
//!      │
//!      │ first failure, no keep-running
//!      ├─────────────────────────────────────▶ Rejected(error)
//!      │
//!      │ all settled, keep-running
//!      └─────────────────────────────────────▶ Held
//! ```
//!
//! Only one task ever calls [`Lifecycle::settle`], so settlements are applied
//! one at a time and the final state is decided exactly once.

use crate::error::ProcessError;

/// Overall outcome of a run
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Processes are still running (or failures are being swallowed)
    Pending,
    /// Every process settled successfully
    Resolved,
    /// First process failure
    Rejected(ProcessError),
    /// Keep-running policy: everything settled but the outcome stays open
    /// on purpose and will never resolve or reject
    Held,
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected(_) => "rejected",
            Self::Held => "held",
        }
    }

    /// Resolved or rejected
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected(_))
    }

    pub fn error(&self) -> Option<&ProcessError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

/// How one process ended
#[derive(Debug, Clone)]
pub enum Settlement {
    Succeeded { label: String },
    Failed(ProcessError),
}

impl Settlement {
    pub fn label(&self) -> &str {
        match self {
            Self::Succeeded { label } => label,
            Self::Failed(err) => err.label(),
        }
    }
}

/// Settlement reducer
#[derive(Debug)]
pub struct Lifecycle {
    outstanding: usize,
    keep_running: bool,
    outcome: Outcome,
    succeeded: usize,
    failed: usize,
}

impl Lifecycle {
    /// `total` processes outstanding; zero resolves immediately
    pub fn new(total: usize, keep_running: bool) -> Self {
        let outcome = if total == 0 {
            Outcome::Resolved
        } else {
            Outcome::Pending
        };
        Self {
            outstanding: total,
            keep_running,
            outcome,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Apply one settlement. Returns true when the outcome changed.
    pub fn settle(&mut self, settlement: Settlement) -> bool {
        if self.outstanding == 0 {
            log::warn!(
                "Ignoring settlement of {}: no processes outstanding",
                settlement.label()
            );
            return false;
        }
        self.outstanding -= 1;

        let mut changed = false;
        match settlement {
            Settlement::Succeeded { .. } => {
                self.succeeded += 1;
            }
            Settlement::Failed(err) => {
                self.failed += 1;
                if self.keep_running {
                    log::warn!("Process {} failed, session kept running: {}", err.label(), err);
                } else if matches!(self.outcome, Outcome::Pending) {
                    self.outcome = Outcome::Rejected(err);
                    changed = true;
                } else {
                    log::debug!("Later failure of {} does not change the outcome: {}", err.label(), err);
                }
            }
        }

        if self.outstanding == 0 && matches!(self.outcome, Outcome::Pending) {
            self.outcome = if self.keep_running {
                Outcome::Held
            } else {
                Outcome::Resolved
            };
            changed = true;
        }

        changed
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }
}
