//! Global timeline of a scenario.

use chrono::NaiveDateTime;

use crate::core::domain::{format_timestamp, ContextRow};
use crate::error::{ReportError, ReportResult};

/// Strictly ascending, duplicate-free timestamps. Row `i` of every
/// occupancy table belongs to `timestamps[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    timestamps: Vec<NaiveDateTime>,
}

impl Timeline {
    pub fn as_slice(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Row index of `ts`.
    pub fn index_of(&self, ts: &NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(ts).ok()
    }

    /// Timestamps in artifact form.
    pub fn to_strings(&self) -> Vec<String> {
        self.timestamps.iter().map(format_timestamp).collect()
    }

    /// `[first, last]` in artifact form.
    pub fn window(&self) -> Option<[String; 2]> {
        let first = self.timestamps.first()?;
        let last = self.timestamps.last()?;
        Some([format_timestamp(first), format_timestamp(last)])
    }
}

/// Collects the distinct timestamps of `context` in ascending order.
///
/// # Errors
///
/// [`ReportError::Validation`] if `context` is empty.
pub fn build_timeline(context: &[ContextRow]) -> ReportResult<Timeline> {
    if context.is_empty() {
        return Err(ReportError::validation(
            "context must contain at least one timestamp",
        ));
    }
    let mut timestamps: Vec<NaiveDateTime> = context.iter().map(|row| row.timestamp).collect();
    timestamps.sort_unstable();
    timestamps.dedup();
    Ok(Timeline { timestamps })
}
