//! FishFlow depth reports.
//!
//! Estimates how strongly observed choices support a hypothesis model over a
//! reference model, by scoring a family of linear mixtures of the two, and
//! assembles the per-cell occupancy, minimums, and geometry artifacts that
//! the depth report viewer serves.

pub mod algorithms;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod report;
pub mod spacetime;
pub mod storage;

pub use error::{ReportError, ReportResult};
