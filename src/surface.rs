//! Render surfaces - where multiplexed rows end up
//!
//! The multiplexer is the only writer of a surface. A surface only has to
//! turn one row into output; serialization across processes happens before
//! `render` is called.

use crate::core::{ColumnWidth, LogLine, Stream};
use crossterm::style::{Color, Stylize};
use std::collections::VecDeque;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

/// Label colours, assigned to processes in registration order
const PALETTE: [Color; 5] = [
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Blue,
];

/// Default number of rows kept by [`MemorySurface`]
pub const DEFAULT_HISTORY: usize = 1000;

/// One row handed to a surface
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub line: &'a LogLine,
    pub width: ColumnWidth,
    /// Registration index of the process that wrote the row
    pub color: usize,
}

impl Row<'_> {
    /// The row without any styling
    pub fn plain(&self) -> String {
        self.line.render(self.width)
    }
}

/// Output target of a multiplexer
pub trait RenderSurface: Send {
    fn render(&mut self, row: &Row<'_>) -> io::Result<()>;
}

/// Writes rows to a terminal (or any writer), one line each
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    styled: bool,
}

impl TerminalSurface<io::Stdout> {
    /// Stdout, styled when it is a terminal
    pub fn stdout() -> Self {
        let out = io::stdout();
        let styled = out.is_terminal();
        Self { out, styled }
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, styled: false }
    }

    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSurface for TerminalSurface<W> {
    fn render(&mut self, row: &Row<'_>) -> io::Result<()> {
        if self.styled {
            let color = PALETTE[row.color % PALETTE.len()];
            let cell = row.width.cell(&row.line.label).with(color);
            match row.line.stream {
                Stream::Stdout => writeln!(
                    self.out,
                    "{} │{}│ {}",
                    row.line.clock(),
                    cell,
                    row.line.message
                )?,
                Stream::Stderr => writeln!(
                    self.out,
                    "{} │{}│ {}",
                    row.line.clock(),
                    cell,
                    row.line.message.as_str().red()
                )?,
            }
        } else {
            writeln!(self.out, "{}", row.plain())?;
        }
        self.out.flush()
    }
}

#[derive(Debug)]
struct History {
    rows: VecDeque<String>,
    capacity: usize,
    closed: bool,
}

/// In-memory surface keeping the most recent plain rows.
///
/// Clones share the same buffer, so one clone can be handed to a scheduler
/// while another is used to read what was rendered.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    history: Arc<Mutex<History>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: Arc::new(Mutex::new(History {
                rows: VecDeque::new(),
                capacity: capacity.max(1),
                closed: false,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rendered rows, oldest first
    pub fn rows(&self) -> Vec<String> {
        self.lock().rows.iter().cloned().collect()
    }

    /// Rendered rows joined as terminal text, one row per line
    pub fn text(&self) -> String {
        self.lock()
            .rows
            .iter()
            .map(|row| format!("{row}\n"))
            .collect()
    }

    /// Make every further render fail, like a closed output stream
    pub fn close(&self) {
        self.lock().closed = true;
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for MemorySurface {
    fn render(&mut self, row: &Row<'_>) -> io::Result<()> {
        let mut history = self.lock();
        if history.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory surface closed",
            ));
        }

        history.rows.push_back(row.plain());
        if history.rows.len() > history.capacity {
            history.rows.pop_front();
        }
        Ok(())
    }
}
