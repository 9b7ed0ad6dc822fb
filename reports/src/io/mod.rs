//! Input loading and artifact encoding.
//!
//! `loaders` turns CSV/parquet tables into typed rows; `artifacts` names
//! and encodes everything a report build persists.
//!
//! # Example
//!
//! ```no_run
//! use fishflow_reports::io::loaders::load_predictions;
//! use std::path::Path;
//!
//! let rows = load_predictions(Path::new("model.parquet")).expect("Failed to load");
//! println!("Loaded {} predictions", rows.len());
//! ```

pub mod artifacts;
pub mod loaders;

#[cfg(test)]
mod loaders_tests;

pub use loaders::{load_context, load_predictions, load_scenario_metadata, load_selections, TableFormat};
