//! muxrun - concurrent process output multiplexer
//!
//! Runs several long-lived processes side by side, fans their output into
//! one timestamped, labelled view and decides how the run as a whole
//! completes or fails.

pub mod command;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod surface;

// Re-exports
pub use crate::core::{
    codec, ColumnWidth, LogLine, Outcome, OutputSink, ProcessContext, ProcessDescriptor,
    RunHandle, RunOptions, Scheduler, Stream,
};
pub use command::CommandSpec;
pub use config::Config;
pub use error::{MuxError, ProcessError};
pub use events::{Disposer, EventHub, EventKind, RunEvent};
pub use surface::{MemorySurface, RenderSurface, TerminalSurface};
pub use tokio_util::sync::CancellationToken;

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
