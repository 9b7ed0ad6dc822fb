//! Per-cell occupancy tables.
//!
//! One row per timeline entry; one column per `(member, depth bin)` pair at
//! index `member * depth_bin_count + depth_bin_index`. Cells are `None`
//! where no prediction exists or the depth bin lies below the cell's
//! maximum depth.

use log::warn;

use crate::algorithms::MixtureRow;
use crate::core::domain::{DepthBins, SpaceTime};
use crate::error::{ReportError, ReportResult};
use crate::spacetime::Timeline;

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyTable {
    rows: usize,
    members: usize,
    depth_bins: usize,
    /// Column-major storage.
    columns: Vec<Vec<Option<f64>>>,
}

impl OccupancyTable {
    /// An all-null table.
    pub fn empty(rows: usize, members: usize, depth_bins: usize) -> Self {
        Self {
            rows,
            members,
            depth_bins,
            columns: vec![vec![None; rows]; members * depth_bins],
        }
    }

    /// Wraps decoded columns, checking the layout.
    pub fn from_columns(
        members: usize,
        depth_bins: usize,
        columns: Vec<Vec<Option<f64>>>,
    ) -> ReportResult<Self> {
        if columns.len() != members * depth_bins {
            return Err(ReportError::validation(format!(
                "occupancy table has {} columns, expected {} members x {} depth bins",
                columns.len(),
                members,
                depth_bins
            )));
        }
        let rows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(ReportError::validation(
                "occupancy columns must all have the same length",
            ));
        }
        Ok(Self {
            rows,
            members,
            depth_bins,
            columns,
        })
    }

    /// Pivots one cell's mixture rows onto the global timeline.
    ///
    /// Rows deeper than `max_depth` are left null. When several decisions
    /// land on the same slot (same timestamp, member and depth bin) the slot
    /// takes the first decision's value and the rest are counted in a
    /// warning.
    ///
    /// # Errors
    ///
    /// [`ReportError::Validation`] if a row's timestamp is not on the
    /// timeline, its depth bin is unknown, or its member index is out of
    /// range.
    pub fn from_mixtures(
        mixtures: &[MixtureRow<SpaceTime>],
        timeline: &Timeline,
        depth_bins: &DepthBins,
        members: usize,
        max_depth: f64,
    ) -> ReportResult<Self> {
        let mut table = Self::empty(timeline.len(), members, depth_bins.len());
        let mut collisions = 0_usize;

        for row in mixtures {
            if row.context.depth_bin > max_depth {
                continue;
            }
            let time_idx = timeline.index_of(&row.context.timestamp).ok_or_else(|| {
                ReportError::validation(format!(
                    "timestamp {} of decision {} is not on the timeline",
                    row.context.timestamp, row.decision
                ))
            })?;
            let depth_idx = depth_bins.index_of(row.context.depth_bin).ok_or_else(|| {
                ReportError::validation(format!("unknown depth bin {}", row.context.depth_bin))
            })?;
            if row.member >= members {
                return Err(ReportError::validation(format!(
                    "mixture member {} out of range for {} members",
                    row.member, members
                )));
            }

            let col = table.column_index(row.member, depth_idx);
            let slot = &mut table.columns[col][time_idx];
            if slot.is_none() {
                *slot = Some(row.probability);
            } else {
                collisions += 1;
            }
        }

        if collisions > 0 {
            warn!(
                "{} mixture rows shared an occupancy slot with an earlier decision; kept the first",
                collisions
            );
        }
        Ok(table)
    }

    pub fn column_index(&self, member: usize, depth_idx: usize) -> usize {
        member * self.depth_bins + depth_idx
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn member_count(&self) -> usize {
        self.members
    }

    pub fn depth_bin_count(&self) -> usize {
        self.depth_bins
    }

    pub fn columns(&self) -> &[Vec<Option<f64>>] {
        &self.columns
    }

    pub fn column(&self, member: usize, depth_idx: usize) -> Option<&[Option<f64>]> {
        if member >= self.members || depth_idx >= self.depth_bins {
            return None;
        }
        Some(&self.columns[self.column_index(member, depth_idx)])
    }

    pub fn get(&self, row: usize, member: usize, depth_idx: usize) -> Option<f64> {
        self.column(member, depth_idx)?.get(row).copied().flatten()
    }

    /// For one depth bin, the occupancy timeline of every mixture member.
    pub fn timelines(&self, depth_idx: usize) -> Vec<&[Option<f64>]> {
        (0..self.members)
            .filter_map(|member| self.column(member, depth_idx))
            .collect()
    }
}
