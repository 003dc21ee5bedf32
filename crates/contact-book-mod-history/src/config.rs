/// Configuration for the history manager.
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

/// Label given to the first entry when the caller doesn't supply one.
pub const DEFAULT_INITIAL_LABEL: &str = "Initial State";

/// chrono format string used when generating "Update at ..." labels.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%H:%M:%S";

/// Configuration for a `HistoryManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Max entries kept in the past. `None` keeps everything.
    pub max_depth: Option<usize>,
    /// Label for initial and reset states when none is given.
    pub initial_label: String,
    /// Format of the wall-clock time in generated labels.
    pub timestamp_format: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            initial_label: DEFAULT_INITIAL_LABEL.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl HistoryConfig {
    /// Config that keeps at most `depth` undo steps.
    pub fn bounded(depth: usize) -> Self {
        let mut config = Self {
            max_depth: Some(depth),
            ..Self::default()
        };
        config.sanitize();
        config
    }

    /// Resets invalid fields to usable values.
    ///
    /// A depth of zero would make every edit unreachable by undo, so it is
    /// raised to one.
    pub fn sanitize(&mut self) {
        if let Some(depth) = self.max_depth {
            self.max_depth = Some(depth.max(1));
        }
        if self.initial_label.trim().is_empty() {
            self.initial_label = DEFAULT_INITIAL_LABEL.to_string();
        }
        if self.timestamp_format.trim().is_empty() || !is_valid_format(&self.timestamp_format) {
            tracing::warn!(
                "Invalid history timestamp format {:?}, using {DEFAULT_TIMESTAMP_FORMAT}",
                self.timestamp_format
            );
            self.timestamp_format = DEFAULT_TIMESTAMP_FORMAT.to_string();
        }
    }
}

/// Whether chrono can render `format` without hitting an unknown specifier.
fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}
