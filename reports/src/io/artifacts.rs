//! Report artifact names and encodings.
//!
//! A report for scenario `S` lives under `depth/S/`:
//!
//! | artifact | encoding |
//! |---|---|
//! | `meta_data.json` | [`ReportMetadata`] |
//! | `geometries.geojson` | GeoJSON feature collection |
//! | `cell_depths.json` | `{cell_id: max depth bin}` |
//! | `timestamps.json` | timeline strings |
//! | `minimums.json` | nested minimums |
//! | `<cell_id>_occupancy.parquet.gz` | gzip parquet, one Float64 column per occupancy column |

use std::io::Cursor;

use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::domain::ReportMetadata;
use crate::error::{ReportError, ReportResult};
use crate::report::occupancy::OccupancyTable;
use crate::storage::ArtifactStore;

pub const REPORT_ROOT: &str = "depth";
pub const STAGING_ROOT: &str = ".staging";

pub const META_DATA: &str = "meta_data.json";
pub const GEOMETRIES: &str = "geometries.geojson";
pub const CELL_DEPTHS: &str = "cell_depths.json";
pub const TIMESTAMPS: &str = "timestamps.json";
pub const MINIMUMS: &str = "minimums.json";

/// Prefix of the published report of a scenario.
pub fn report_prefix(scenario_id: &str) -> String {
    format!("{}/{}", REPORT_ROOT, scenario_id)
}

/// Prefix a build writes to before publishing.
pub fn staging_prefix(scenario_id: &str) -> String {
    format!("{}/{}", STAGING_ROOT, scenario_id)
}

pub fn occupancy_file(cell_id: usize) -> String {
    format!("{}_occupancy.parquet.gz", cell_id)
}

/// Pretty-printed JSON.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> ReportResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> ReportResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encodes an occupancy table as gzip-compressed parquet.
///
/// Column `i` of the table becomes a nullable Float64 column named `"i"`.
pub fn encode_occupancy(table: &OccupancyTable) -> ReportResult<Vec<u8>> {
    let columns: Vec<Column> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, values)| Column::new(idx.to_string().into(), values.as_slice()))
        .collect();
    let mut df = DataFrame::new(columns)?;

    let mut buffer = Vec::new();
    ParquetWriter::new(&mut buffer)
        .with_compression(ParquetCompression::Gzip(None))
        .finish(&mut df)?;
    Ok(buffer)
}

/// Decodes an artifact written by [`encode_occupancy`].
///
/// # Errors
///
/// [`ReportError::DataFrame`] if the bytes are not parquet or a column is
/// missing or not Float64; [`ReportError::Validation`] if the layout does
/// not match `members x depth_bins`.
pub fn decode_occupancy(bytes: &[u8], members: usize, depth_bins: usize) -> ReportResult<OccupancyTable> {
    let df = ParquetReader::new(Cursor::new(bytes.to_vec())).finish()?;
    if df.width() != members * depth_bins {
        return Err(ReportError::validation(format!(
            "occupancy artifact has {} columns, expected {}",
            df.width(),
            members * depth_bins
        )));
    }

    let mut columns = Vec::with_capacity(df.width());
    for idx in 0..df.width() {
        let values: Vec<Option<f64>> = df.column(&idx.to_string())?.f64()?.into_iter().collect();
        columns.push(values);
    }
    OccupancyTable::from_columns(members, depth_bins, columns)
}

/// Reads the published metadata of a scenario.
pub fn load_metadata(store: &dyn ArtifactStore, scenario_id: &str) -> ReportResult<ReportMetadata> {
    let bytes = store.read(&format!("{}/{}", report_prefix(scenario_id), META_DATA))?;
    decode_json(&bytes)
}

/// Reads the published occupancy table of one cell.
pub fn load_occupancy(
    store: &dyn ArtifactStore,
    metadata: &ReportMetadata,
    member_count: usize,
    cell_id: usize,
) -> ReportResult<OccupancyTable> {
    let path = format!(
        "{}/{}",
        report_prefix(&metadata.scenario.scenario_id),
        occupancy_file(cell_id)
    );
    let bytes = store.read(&path)?;
    decode_occupancy(&bytes, member_count, metadata.depth_bins.len())
}
