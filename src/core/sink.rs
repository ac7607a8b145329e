//! Output sinks - per-process, line-buffered writers into a multiplexer

use super::line::Stream;
use super::multiplexer::Multiplexer;
use std::io;
use std::sync::Arc;

/// Longest unterminated line kept before it is rendered anyway
pub const MAX_PENDING: usize = 64 * 1024;

/// Write end handed to a process for one of its streams.
///
/// Raw chunks of any size are buffered privately until a `\n` completes a
/// line; only complete lines reach the multiplexer. A line that grows past
/// [`MAX_PENDING`] bytes without a terminator is broken into rows of that
/// size. Whatever is left unterminated is emitted as a last line when the
/// sink is finished or dropped.
pub struct OutputSink {
    mux: Multiplexer,
    label: Arc<str>,
    stream: Stream,
    color: usize,
    buffer: Vec<u8>,
}

impl OutputSink {
    pub(crate) fn new(mux: Multiplexer, label: Arc<str>, stream: Stream, color: usize) -> Self {
        Self {
            mux,
            label,
            stream,
            color,
            buffer: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn write_str(&mut self, chunk: &str) {
        self.write_bytes(chunk.as_bytes());
    }

    /// Write `message` followed by a line terminator
    pub fn write_line(&mut self, message: &str) {
        self.write_bytes(message.as_bytes());
        self.write_bytes(b"\n");
    }

    pub fn write_bytes(&mut self, chunk: &[u8]) {
        // bytes already buffered hold no terminator
        let mut from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            self.mux
                .emit(&self.label, self.stream, self.color, &self.buffer[start..end]);
            start = end + 1;
            from = start;
        }
        if start > 0 {
            self.buffer.drain(..start);
        }

        if self.buffer.len() >= MAX_PENDING {
            self.break_long_line();
        }
    }

    /// Emit oversized unterminated text in rows of at most [`MAX_PENDING`]
    /// bytes, keeping an incomplete UTF-8 sequence for the next write
    fn break_long_line(&mut self) {
        log::debug!(
            "{} {} line exceeds {} bytes, breaking it",
            self.label,
            self.stream,
            MAX_PENDING
        );
        while self.buffer.len() >= MAX_PENDING {
            let head = &self.buffer[..MAX_PENDING];
            let cut = match std::str::from_utf8(head) {
                Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => e.valid_up_to(),
                _ => MAX_PENDING,
            };
            self.mux
                .emit(&self.label, self.stream, self.color, &self.buffer[..cut]);
            self.buffer.drain(..cut);
        }
    }

    /// Bytes written since the last complete line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Emit any unterminated remainder and close the sink
    pub fn finish(mut self) {
        self.flush_remainder();
    }

    fn flush_remainder(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let rest = std::mem::take(&mut self.buffer);
        self.mux.emit(&self.label, self.stream, self.color, &rest);
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        self.flush_remainder();
    }
}

impl io::Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    /// Rows are rendered as soon as they complete; a partial line stays
    /// buffered.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("label", &self.label)
            .field("stream", &self.stream)
            .field("pending", &self.buffer.len())
            .finish()
    }
}
