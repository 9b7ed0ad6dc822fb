//! H3 cell numbering and boundary geometry.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::core::domain::ContextRow;
use crate::error::{ReportError, ReportResult};

/// GeoJSON `FeatureCollection` of cell polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Polygon,
    pub properties: CellProperties,
}

/// GeoJSON polygon; each ring is closed and uses `[lon, lat]` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellProperties {
    pub cell_id: usize,
}

/// Integer cell ids for the spatial index keys of a context table.
///
/// Cell `i` is the `i`-th key in lexicographic order.
#[derive(Debug, Clone)]
pub struct CellAssignment {
    h3_indices: Vec<String>,
    by_pair: HashMap<String, HashMap<String, usize>>,
    resolution: u8,
}

impl CellAssignment {
    /// Cell id of a `(decision, choice)` pair from the context table.
    pub fn cell_of(&self, decision: &str, choice: &str) -> Option<usize> {
        self.by_pair.get(decision)?.get(choice).copied()
    }

    /// Cell id of a spatial index key.
    pub fn cell_id(&self, h3_index: &str) -> Option<usize> {
        self.h3_indices
            .binary_search_by(|k| k.as_str().cmp(h3_index))
            .ok()
    }

    /// Spatial index keys, indexed by cell id.
    pub fn h3_indices(&self) -> &[String] {
        &self.h3_indices
    }

    pub fn grid_size(&self) -> usize {
        self.h3_indices.len()
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }
}

fn ring(cell: CellIndex) -> Vec<[f64; 2]> {
    let boundary = cell.boundary();
    let mut ring: Vec<[f64; 2]> = boundary.iter().map(|ll| [ll.lng(), ll.lat()]).collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

/// Numbers the distinct spatial index keys of `context` and builds one
/// polygon feature per cell.
///
/// # Errors
///
/// [`ReportError::Validation`] if `context` is empty, a key is not a valid
/// H3 cell, or the keys mix resolutions.
pub fn build_geojson_h3(context: &[ContextRow]) -> ReportResult<(FeatureCollection, CellAssignment)> {
    let keys: BTreeSet<&str> = context.iter().map(|row| row.h3_index.as_str()).collect();
    if keys.is_empty() {
        return Err(ReportError::validation(
            "context must contain at least one h3_index",
        ));
    }

    let mut resolution = None;
    let mut features = Vec::with_capacity(keys.len());
    for (cell_id, key) in keys.iter().enumerate() {
        let cell = CellIndex::from_str(key)
            .map_err(|e| ReportError::validation(format!("invalid h3_index '{}': {}", key, e)))?;

        let res = u8::from(cell.resolution());
        match resolution {
            None => resolution = Some(res),
            Some(expected) if expected != res => {
                return Err(ReportError::validation(format!(
                    "h3 indices mix resolutions {} and {} ('{}')",
                    expected, res, key
                )));
            }
            Some(_) => {}
        }

        features.push(Feature {
            kind: "Feature".to_string(),
            geometry: Polygon {
                kind: "Polygon".to_string(),
                coordinates: vec![ring(cell)],
            },
            properties: CellProperties { cell_id },
        });
    }

    let h3_indices: Vec<String> = keys.into_iter().map(str::to_string).collect();

    let mut by_pair: HashMap<String, HashMap<String, usize>> = HashMap::new();
    for row in context {
        if let Ok(cell_id) = h3_indices.binary_search_by(|k| k.as_str().cmp(row.h3_index.as_str())) {
            by_pair
                .entry(row.decision.clone())
                .or_default()
                .insert(row.choice.clone(), cell_id);
        }
    }

    let collection = FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features,
    };
    let assignment = CellAssignment {
        h3_indices,
        by_pair,
        resolution: resolution.unwrap_or_default(),
    };
    Ok((collection, assignment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use h3o::{LatLng, Resolution};

    fn key(lat: f64, lng: f64, res: Resolution) -> String {
        LatLng::new(lat, lng).unwrap().to_cell(res).to_string()
    }

    fn row(decision: &str, choice: &str, h3_index: &str) -> ContextRow {
        ContextRow {
            decision: decision.to_string(),
            choice: choice.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            h3_index: h3_index.to_string(),
            depth_bin: 10.0,
        }
    }

    #[test]
    fn test_cell_ids_follow_sorted_keys() {
        let a = key(48.5, -123.1, Resolution::Six);
        let b = key(49.2, -124.0, Resolution::Six);
        let c = key(47.9, -122.5, Resolution::Six);
        let context = vec![
            row("1", "x", &b),
            row("1", "y", &b),
            row("2", "x", &a),
            row("3", "x", &c),
            row("4", "x", &a),
        ];

        let (geo, cells) = build_geojson_h3(&context).unwrap();

        let mut sorted = vec![a.clone(), b.clone(), c.clone()];
        sorted.sort();
        assert_eq!(cells.h3_indices(), sorted.as_slice());
        assert_eq!(cells.grid_size(), 3);
        assert_eq!(geo.features.len(), 3);
        for (i, feature) in geo.features.iter().enumerate() {
            assert_eq!(feature.properties.cell_id, i);
        }
        assert_eq!(cells.cell_of("1", "y"), cells.cell_id(&b));
        assert_eq!(cells.cell_of("4", "x"), cells.cell_id(&a));
        assert_eq!(cells.cell_of("9", "x"), None);
        assert_eq!(cells.resolution(), 6);
    }

    #[test]
    fn test_polygon_ring_closed_lon_lat() {
        let k = key(48.5, -123.1, Resolution::Seven);
        let (geo, _) = build_geojson_h3(&[row("1", "x", &k)]).unwrap();

        let ring = &geo.features[0].geometry.coordinates[0];
        assert!(ring.len() >= 7);
        assert_eq!(ring.first(), ring.last());
        // [lon, lat]: longitude is the negative coordinate here.
        assert!(ring.iter().all(|[lon, lat]| *lon < 0.0 && *lat > 0.0));
    }

    #[test]
    fn test_serializes_as_geojson() {
        let k = key(10.0, 20.0, Resolution::Five);
        let (geo, _) = build_geojson_h3(&[row("1", "x", &k)]).unwrap();
        let value = serde_json::to_value(&geo).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");
        assert_eq!(value["features"][0]["properties"]["cell_id"], 0);
    }

    #[test]
    fn test_invalid_key_is_validation_error() {
        let err = build_geojson_h3(&[row("1", "x", "not-a-cell")]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_mixed_resolutions_is_validation_error() {
        let a = key(48.5, -123.1, Resolution::Five);
        let b = key(48.5, -123.1, Resolution::Six);
        let err = build_geojson_h3(&[row("1", "x", &a), row("2", "x", &b)]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_empty_context_is_validation_error() {
        assert!(build_geojson_h3(&[]).unwrap_err().is_validation());
    }
}
