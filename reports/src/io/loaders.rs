use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;

use crate::core::domain::{parse_timestamp, ContextRow, Prediction, ScenarioMetadata, Selection};

/// On-disk format of an input table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Detects the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .with_context(|| format!("File has no extension: {}", path.display()))?;

        match extension.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" | "pq" => Ok(Self::Parquet),
            _ => bail!("Unsupported table format: {}", extension),
        }
    }
}

/// Read a CSV or parquet file into a DataFrame
pub fn load_frame(path: &Path) -> Result<DataFrame> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()
            .with_context(|| format!("Failed to parse CSV file {}", path.display())),
        TableFormat::Parquet => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            ParquetReader::new(file)
                .finish()
                .with_context(|| format!("Failed to parse parquet file {}", path.display()))
        }
    }
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{}'", name))?
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", name))?;

    column
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(str::to_string)
                .with_context(|| format!("Column '{}' is null at row {}", name, row))
        })
        .collect()
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{}'", name))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;

    column
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.with_context(|| format!("Column '{}' is null at row {}", name, row)))
        .collect()
}

fn from_epoch(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    }?;
    Some(dt.naive_utc())
}

fn timestamp_values(df: &DataFrame, name: &str) -> Result<Vec<NaiveDateTime>> {
    let column = df
        .column(name)
        .with_context(|| format!("Missing column '{}'", name))?;

    let parsed: Vec<Option<NaiveDateTime>> = match column.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = column.cast(&DataType::Int64)?;
            raw.i64()?
                .into_iter()
                .map(|v| v.and_then(|v| from_epoch(v, unit)))
                .collect()
        }
        DataType::String => column.str()?.into_iter().map(|v| v.and_then(parse_timestamp)).collect(),
        other => bail!("Column '{}' has unsupported type {}", name, other),
    };

    parsed
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.with_context(|| format!("Column '{}' has a null or unparsable timestamp at row {}", name, row))
        })
        .collect()
}

/// Convert a DataFrame with `_decision`, `_choice`, `probability` columns
pub fn dataframe_to_predictions(df: &DataFrame) -> Result<Vec<Prediction>> {
    let decisions = string_values(df, "_decision")?;
    let choices = string_values(df, "_choice")?;
    let probabilities = float_values(df, "probability")?;

    Ok(decisions
        .into_iter()
        .zip(choices)
        .zip(probabilities)
        .map(|((decision, choice), probability)| Prediction::new(decision, choice, probability))
        .collect())
}

/// Convert a DataFrame with `_decision`, `_choice` columns
pub fn dataframe_to_selections(df: &DataFrame) -> Result<Vec<Selection>> {
    let decisions = string_values(df, "_decision")?;
    let choices = string_values(df, "_choice")?;

    Ok(decisions
        .into_iter()
        .zip(choices)
        .map(|(decision, choice)| Selection { decision, choice })
        .collect())
}

/// Convert a DataFrame with `_decision`, `_choice`, `datetime`, `h3_index`,
/// `depth_bin` columns
pub fn dataframe_to_context(df: &DataFrame) -> Result<Vec<ContextRow>> {
    let decisions = string_values(df, "_decision")?;
    let choices = string_values(df, "_choice")?;
    let timestamps = timestamp_values(df, "datetime")?;
    let h3_indices = string_values(df, "h3_index")?;
    let depth_bins = float_values(df, "depth_bin")?;

    Ok(decisions
        .into_iter()
        .zip(choices)
        .zip(timestamps)
        .zip(h3_indices)
        .zip(depth_bins)
        .map(|((((decision, choice), timestamp), h3_index), depth_bin)| ContextRow {
            decision,
            choice,
            timestamp,
            h3_index,
            depth_bin,
        })
        .collect())
}

pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let df = load_frame(path)?;
    dataframe_to_predictions(&df).with_context(|| format!("Invalid predictions in {}", path.display()))
}

pub fn load_selections(path: &Path) -> Result<Vec<Selection>> {
    let df = load_frame(path)?;
    dataframe_to_selections(&df).with_context(|| format!("Invalid selections in {}", path.display()))
}

pub fn load_context(path: &Path) -> Result<Vec<ContextRow>> {
    let df = load_frame(path)?;
    dataframe_to_context(&df).with_context(|| format!("Invalid context in {}", path.display()))
}

/// Read scenario metadata from a JSON file
pub fn load_scenario_metadata(path: &Path) -> Result<ScenarioMetadata> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse metadata file {}", path.display()))?;
    Ok(ScenarioMetadata::from_json(value)?)
}
