//! Domain models for model-support inference and depth reports.
//!
//! This module provides the data structures shared by the inference engine
//! and the report assembler: model predictions, observed selections, the
//! spatial/temporal context of each choice, the mixture-weight family, and
//! the scenario metadata record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// Timestamp layout used in every persisted artifact.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp the way the report artifacts expect it.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use fishflow_reports::core::domain::format_timestamp;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
///     .unwrap()
///     .and_hms_opt(6, 30, 0)
///     .unwrap();
/// assert_eq!(format_timestamp(&ts), "2024-03-01 06:30:00");
/// ```
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp in artifact form, falling back to ISO-8601 (`T`
/// separator, optional fractional seconds).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// One row of a model's prediction table.
///
/// A prediction assigns a probability to a single choice within a
/// decision. The `context` parameter carries any additional columns that
/// should travel with the row untouched (for example the timestamp and
/// depth bin of the choice); plain predictions use `()`.
///
/// # Examples
///
/// ```
/// use fishflow_reports::core::domain::Prediction;
///
/// let p = Prediction::new("d1", "shallow", 0.25);
/// assert_eq!(p.key(), ("d1", "shallow"));
///
/// let tagged = p.with_context(42_u32);
/// assert_eq!(tagged.context, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction<C = ()> {
    pub decision: String,
    pub choice: String,
    pub probability: f64,
    pub context: C,
}

impl Prediction<()> {
    /// Creates a prediction with no attached context.
    pub fn new(decision: impl Into<String>, choice: impl Into<String>, probability: f64) -> Self {
        Self {
            decision: decision.into(),
            choice: choice.into(),
            probability,
            context: (),
        }
    }
}

impl<C> Prediction<C> {
    /// Returns the `(decision, choice)` key of this row.
    pub fn key(&self) -> (&str, &str) {
        (self.decision.as_str(), self.choice.as_str())
    }

    /// Replaces the attached context, keeping key and probability.
    pub fn with_context<D>(self, context: D) -> Prediction<D> {
        Prediction {
            decision: self.decision,
            choice: self.choice,
            probability: self.probability,
            context,
        }
    }
}

/// The choice actually observed for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub decision: String,
    pub choice: String,
}

impl Selection {
    pub fn new(decision: impl Into<String>, choice: impl Into<String>) -> Self {
        Self {
            decision: decision.into(),
            choice: choice.into(),
        }
    }
}

/// Spatial and temporal context of a single `(decision, choice)` pair.
///
/// * `timestamp` - when the decision takes place
/// * `h3_index` - hexagonal spatial index key of the decision's location
/// * `depth_bin` - the depth bin this choice stands for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRow {
    pub decision: String,
    pub choice: String,
    pub timestamp: NaiveDateTime,
    pub h3_index: String,
    pub depth_bin: f64,
}

/// The part of a [`ContextRow`] that travels with a prediction through the
/// mixture generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceTime {
    pub timestamp: NaiveDateTime,
    pub depth_bin: f64,
}

impl From<&ContextRow> for SpaceTime {
    fn from(row: &ContextRow) -> Self {
        Self {
            timestamp: row.timestamp,
            depth_bin: row.depth_bin,
        }
    }
}

/// A validated, strictly ascending sequence of mixture weights in `[0, 1]`.
///
/// Weight `0.0` is the pure reference model and `1.0` the pure hypothesis
/// model. The position of a weight in the sequence is its member index.
///
/// # Examples
///
/// ```
/// use fishflow_reports::core::domain::Epsilons;
///
/// let eps = Epsilons::new(vec![0.0, 0.5, 1.0]).unwrap();
/// assert_eq!(eps.len(), 3);
/// assert_eq!(eps.hypothesis_member(), Some(2));
///
/// assert!(Epsilons::new(vec![0.5, 0.2]).is_err());
/// assert!(Epsilons::new(vec![0.0, 1.5]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Epsilons(Vec<f64>);

impl Epsilons {
    /// Validates and wraps a mixture-weight sequence.
    ///
    /// # Errors
    ///
    /// [`ReportError::Validation`] if the sequence is empty, contains a
    /// value outside `[0, 1]` (including NaN), or is not strictly
    /// ascending.
    pub fn new(values: Vec<f64>) -> ReportResult<Self> {
        if values.is_empty() {
            return Err(ReportError::validation("epsilon sequence must not be empty"));
        }
        if let Some(bad) = values.iter().find(|e| !(0.0..=1.0).contains(*e)) {
            return Err(ReportError::validation(format!(
                "epsilon values must lie in [0, 1], got {}",
                bad
            )));
        }
        if let Some(w) = values.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ReportError::validation(format!(
                "epsilon sequence must be strictly ascending, found {} before {}",
                w[0], w[1]
            )));
        }
        Ok(Self(values))
    }

    /// Builds `count` evenly spaced weights from 0 to 1 inclusive.
    ///
    /// # Examples
    ///
    /// ```
    /// use fishflow_reports::core::domain::Epsilons;
    ///
    /// let eps = Epsilons::evenly_spaced(5).unwrap();
    /// assert_eq!(eps.as_slice(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    /// ```
    pub fn evenly_spaced(count: usize) -> ReportResult<Self> {
        if count < 2 {
            return Err(ReportError::validation(format!(
                "an evenly spaced epsilon sequence needs at least 2 members, got {}",
                count
            )));
        }
        let step = (count - 1) as f64;
        let values: Vec<f64> = (0..count).map(|i| i as f64 / step).collect();
        Self::new(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    /// Member index of the pure hypothesis model (`epsilon == 1.0`), if
    /// the family contains it.
    pub fn hypothesis_member(&self) -> Option<usize> {
        self.0.iter().position(|&e| e == 1.0)
    }
}

impl<'de> Deserialize<'de> for Epsilons {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<f64>::deserialize(deserializer)?;
        Epsilons::new(values).map_err(serde::de::Error::custom)
    }
}

/// Sorted, deduplicated list of the depth bins present in a scenario.
///
/// The position of a bin in this list is its depth-bin index in the
/// occupancy column layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepthBins(Vec<f64>);

impl DepthBins {
    /// Collects depth bins from any iterator, sorting and deduplicating.
    pub fn collect<I: IntoIterator<Item = f64>>(values: I) -> ReportResult<Self> {
        let mut bins: Vec<f64> = values.into_iter().collect();
        if let Some(bad) = bins.iter().find(|b| !b.is_finite()) {
            return Err(ReportError::validation(format!(
                "depth bins must be finite, got {}",
                bad
            )));
        }
        bins.sort_by(f64::total_cmp);
        bins.dedup();
        Ok(Self(bins))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `depth_bin` in the sorted list.
    pub fn index_of(&self, depth_bin: f64) -> Option<usize> {
        self.0.binary_search_by(|b| b.total_cmp(&depth_bin)).ok()
    }
}

/// Scenario description supplied by the caller of a report build.
///
/// All fields are required; [`ScenarioMetadata::from_json`] reports every
/// missing one at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    pub scenario_id: String,
    pub name: String,
    pub species: String,
    pub model: String,
    pub reference_model: String,
    pub region: String,
    pub reference_region: String,
    pub description: String,
    /// `[start, end]` in `"YYYY-MM-DD HH:MM:SS"` form.
    pub reference_time_window: [String; 2],
    pub zoom: u32,
    /// Map center as `[lon, lat]`.
    pub center: [f64; 2],
}

impl ScenarioMetadata {
    pub const REQUIRED_FIELDS: [&'static str; 11] = [
        "scenario_id",
        "name",
        "species",
        "model",
        "reference_model",
        "region",
        "reference_region",
        "description",
        "reference_time_window",
        "zoom",
        "center",
    ];

    /// Builds metadata from a JSON object, failing fast on missing fields.
    ///
    /// # Errors
    ///
    /// [`ReportError::Validation`] naming every missing field, or naming
    /// the malformed field when deserialization fails.
    pub fn from_json(value: serde_json::Value) -> ReportResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ReportError::validation("metadata must be a JSON object"))?;

        let missing: Vec<&str> = Self::REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| object.get(*field).map_or(true, |v| v.is_null()))
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::validation(format!(
                "metadata is missing required fields: {}",
                missing.join(", ")
            )));
        }

        let metadata: ScenarioMetadata = serde_json::from_value(value)
            .map_err(|e| ReportError::validation(format!("malformed metadata: {}", e)))?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Checks the values that the report layout depends on.
    ///
    /// The scenario id becomes a directory name, so it must be non-empty
    /// and free of path separators; the reference time window must be in
    /// artifact timestamp form.
    pub fn validate(&self) -> ReportResult<()> {
        let id = self.scenario_id.as_str();
        if id.trim().is_empty() {
            return Err(ReportError::validation("scenario_id must not be empty"));
        }
        if id.contains('/') || id.contains('\\') || id.starts_with('.') {
            return Err(ReportError::validation(format!(
                "scenario_id '{}' is not a valid directory name",
                id
            )));
        }
        for bound in &self.reference_time_window {
            if NaiveDateTime::parse_from_str(bound, TIMESTAMP_FORMAT).is_err() {
                return Err(ReportError::validation(format!(
                    "reference_time_window entry '{}' is not in YYYY-MM-DD HH:MM:SS form",
                    bound
                )));
            }
        }
        Ok(())
    }
}

/// Persisted scenario metadata: the caller's record plus derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    #[serde(flatten)]
    pub scenario: ScenarioMetadata,
    /// `[start, end]` of the global timeline.
    pub time_window: [String; 2],
    pub grid_size: usize,
    pub depth_bins: DepthBins,
    /// Spatial index resolution of the cells.
    pub resolution: u8,
    /// Posterior support, one entry per support epsilon.
    pub support: Vec<f64>,
}
