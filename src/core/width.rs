//! Column width resolver - the fixed width of the label column for one run

/// Narrowest label column
pub const MIN_WIDTH: usize = 1;

/// Widest label column; longer labels are truncated when rendered
pub const MAX_WIDTH: usize = 25;

/// Width of the label column, fixed for the lifetime of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidth(usize);

impl ColumnWidth {
    /// Resolve the column width from the labels known at start.
    ///
    /// An override wins over the labels; out-of-range overrides (including
    /// zero and negatives) are clamped rather than rejected.
    pub fn resolve<I, S>(labels: I, override_width: Option<i64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(width) = override_width {
            let clamped = width.clamp(MIN_WIDTH as i64, MAX_WIDTH as i64);
            return Self(clamped as usize);
        }

        let longest = labels
            .into_iter()
            .map(|label| label.as_ref().chars().count())
            .max()
            .unwrap_or(0);

        Self(longest.clamp(MIN_WIDTH, MAX_WIDTH))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Render the label cell: truncated or left-aligned to exactly the
    /// width, with one space on each side.
    pub fn cell(self, label: &str) -> String {
        let fitted: String = label.chars().take(self.0).collect();
        format!(" {:<width$} ", fitted, width = self.0)
    }
}
