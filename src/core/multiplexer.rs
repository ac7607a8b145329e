//! Output multiplexer - sole writer of the render surface
//!
//! Every process gets its own pair of line-buffered [`OutputSink`]s. Sinks
//! cut complete lines privately and hand them here; the multiplexer decodes
//! embedded labels, stamps the line and appends it to the surface under one
//! lock, so rows from different processes never interleave.
//!
//! ```text
//!   backend  stdout ──┐
//!   backend  stderr ──┼──▶ Multiplexer (mutex) ──▶ RenderSurface
//!   frontend stdout ──┘
//! ```

use super::codec;
use super::line::{LogLine, Stream};
use super::sink::OutputSink;
use super::width::ColumnWidth;
use crate::events::{EventHub, RunEvent};
use crate::surface::{RenderSurface, Row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Slot {
    surface: Box<dyn RenderSurface>,
    writable: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    width: ColumnWidth,
    events: EventHub,
    registered: AtomicUsize,
}

/// Shared handle to one render surface, cheap to clone
#[derive(Clone)]
pub struct Multiplexer {
    shared: Arc<Shared>,
}

impl Multiplexer {
    pub fn new(surface: impl RenderSurface + 'static, width: ColumnWidth) -> Self {
        Self::with_events(Box::new(surface), width, EventHub::new())
    }

    pub(crate) fn with_events(
        surface: Box<dyn RenderSurface>,
        width: ColumnWidth,
        events: EventHub,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    surface,
                    writable: true,
                }),
                width,
                events,
                registered: AtomicUsize::new(0),
            }),
        }
    }

    pub fn width(&self) -> ColumnWidth {
        self.shared.width
    }

    /// Stdout and stderr sinks for the process `label`
    pub fn sinks(&self, label: &str) -> (OutputSink, OutputSink) {
        let color = self.shared.registered.fetch_add(1, Ordering::Relaxed);
        let label: Arc<str> = Arc::from(label);
        (
            OutputSink::new(self.clone(), Arc::clone(&label), Stream::Stdout, color),
            OutputSink::new(self.clone(), label, Stream::Stderr, color),
        )
    }

    /// Whether rows are still reaching the surface
    pub fn is_writable(&self) -> bool {
        self.shared
            .slot
            .lock()
            .map(|slot| slot.writable)
            .unwrap_or(false)
    }

    /// Render one complete line (without its terminator).
    ///
    /// Never fails: once the surface refuses a row, it and every later row
    /// are dropped. `LineRendered` listeners run while the surface is
    /// locked and must not write to this run's sinks.
    pub(crate) fn emit(&self, label: &str, stream: Stream, color: usize, raw: &[u8]) {
        let lossy = String::from_utf8_lossy(raw);
        let text = lossy.strip_suffix('\r').unwrap_or(&lossy);
        let decoded = codec::decode(text);
        let label = decoded.label.unwrap_or_else(|| label.to_string());

        let mut slot = match self.shared.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !slot.writable {
            return;
        }

        let line = LogLine::now(label, decoded.message, stream);
        let row = Row {
            line: &line,
            width: self.shared.width,
            color,
        };
        if let Err(e) = slot.surface.render(&row) {
            slot.writable = false;
            log::warn!("Render surface unwritable, dropping further output: {}", e);
            return;
        }

        // still under the surface lock: listeners see rows in render order
        self.shared.events.emit(&RunEvent::LineRendered {
            label: line.label,
            stream,
            message: line.message,
        });
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("width", &self.shared.width)
            .field("registered", &self.shared.registered.load(Ordering::Relaxed))
            .finish()
    }
}
