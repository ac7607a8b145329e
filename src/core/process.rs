//! Process descriptors - a label plus the async work to run under it

use super::sink::OutputSink;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by a started process
pub type ProcessFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type Action = Box<dyn FnOnce(ProcessContext) -> ProcessFuture + Send + 'static>;

/// Everything a process gets when it starts
#[derive(Debug)]
pub struct ProcessContext {
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    /// Shared by every process of the run; check it and return to stop early
    pub cancel: CancellationToken,
}

/// A labelled unit of concurrent work.
///
/// The action runs once, with its own sinks and the run's cancellation
/// token. Returning `Ok(())` (including after observing cancellation) is a
/// success; returning an error fails the process.
pub struct ProcessDescriptor {
    label: String,
    action: Action,
}

impl ProcessDescriptor {
    pub fn new<F, Fut>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(ProcessContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Box::new(move |ctx| Box::pin(action(ctx))),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn start(self, ctx: ProcessContext) -> (String, ProcessFuture) {
        let future = (self.action)(ctx);
        (self.label, future)
    }
}

impl fmt::Debug for ProcessDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessDescriptor")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
