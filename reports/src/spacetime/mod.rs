//! Spatial and temporal indexing of the context table.
//!
//! Both operations are pure: the same context always yields the same cell
//! ids and the same timeline.

pub mod geometry;
pub mod timeline;

pub use geometry::{build_geojson_h3, CellAssignment, FeatureCollection};
pub use timeline::{build_timeline, Timeline};
