//! LogLine codec - embed a logical source label inside a line of output
//!
//! A process can tag a line with a more specific source than its own label
//! (for example one extension inside a dev server) by prefixing it with
//! `<::label::>`. The multiplexer decodes the tag and renders that label
//! instead of the process label.

use regex::Regex;
use std::sync::OnceLock;

const MARKER_OPEN: &str = "<::";
const MARKER_CLOSE: &str = "::>";

/// A decoded line: optional embedded label plus the remaining message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub label: Option<String>,
    pub message: String,
}

fn marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?s)\A<::(.+?)::>(.*)\z").expect("marker pattern is valid"))
}

/// Prefix `message` with an embedded `label` marker
pub fn encode(label: &str, message: &str) -> String {
    format!("{MARKER_OPEN}{label}{MARKER_CLOSE}{message}")
}

/// Split an embedded label marker off the start of `text`.
///
/// Anything that is not a well-formed marker at the very start (missing
/// close, empty label, marker later in the line) is returned untouched with
/// no label.
pub fn decode(text: &str) -> Decoded {
    if !text.starts_with(MARKER_OPEN) {
        return Decoded {
            label: None,
            message: text.to_string(),
        };
    }

    match marker().captures(text) {
        Some(caps) => Decoded {
            label: caps.get(1).map(|m| m.as_str().to_string()),
            message: caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        },
        None => Decoded {
            label: None,
            message: text.to_string(),
        },
    }
}
