//! Core domain models for depth-occupancy reports.
//!
//! This module defines the fundamental data structures used throughout the
//! crate, representing model predictions, observed selections, spatial and
//! temporal context, and scenario metadata.

pub mod domain;

pub use domain::{
    ContextRow, DepthBins, Epsilons, Prediction, ReportMetadata, ScenarioMetadata, Selection,
    SpaceTime,
};
