//! Log lines - one complete, labelled line of process output

use super::width::ColumnWidth;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of a process's two sinks a line arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// A single complete line, produced per line terminator and rendered at once
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub label: String,
    pub message: String,
    pub stream: Stream,
}

impl LogLine {
    /// Stamp a line with the current local time
    pub fn now(label: impl Into<String>, message: impl Into<String>, stream: Stream) -> Self {
        Self {
            timestamp: Local::now(),
            label: label.into(),
            message: message.into(),
            stream,
        }
    }

    /// `HH:MM:SS` part of the rendered row
    pub fn clock(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// Plain rendered row: `HH:MM:SS │ <label cell> │ <message>`
    pub fn render(&self, width: ColumnWidth) -> String {
        format!("{} │{}│ {}", self.clock(), width.cell(&self.label), self.message)
    }
}
