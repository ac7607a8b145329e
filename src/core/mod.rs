//! Core engine - line codec, column width, output multiplexing, lifecycle and scheduling

pub mod codec;
mod lifecycle;
mod line;
mod multiplexer;
mod process;
mod scheduler;
mod sink;
mod width;

pub use lifecycle::{Lifecycle, Outcome, Settlement};
pub use line::{LogLine, Stream};
pub use multiplexer::Multiplexer;
pub use process::{ProcessContext, ProcessDescriptor, ProcessFuture};
pub use scheduler::{RunHandle, RunOptions, Scheduler};
pub use sink::{OutputSink, MAX_PENDING};
pub use width::{ColumnWidth, MAX_WIDTH, MIN_WIDTH};
