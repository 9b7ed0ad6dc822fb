//! Depth report assembly: per-cell occupancy tables, the minimums summary,
//! and the orchestration that publishes them.

pub mod builder;
pub mod cell_depths;
pub mod minimums;
pub mod occupancy;

pub use builder::{BuildOptions, BuildSummary, ReportBuilder, ReportInputs};
pub use cell_depths::build_cell_depths;
pub use minimums::{MinimumsSummary, HOURS_PER_DAY};
pub use occupancy::OccupancyTable;
