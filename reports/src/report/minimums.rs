//! Minimum occupancy by cell, depth bin, calendar month, and hour of day.
//!
//! Summaries from different cells have disjoint keys, so [`MinimumsSummary::merge`]
//! is a plain union there; on shared keys it takes the elementwise minimum.
//! The merge is commutative and associative with the empty summary as
//! identity, which is what lets the per-cell loop run as a parallel reduce.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};

use crate::algorithms::MixtureRow;
use crate::core::domain::{DepthBins, SpaceTime};
use crate::error::{ReportError, ReportResult};

pub const HOURS_PER_DAY: usize = 24;

/// Per-hour minimums, `None` where the hour was never observed.
pub type HourlyMinimums = [Option<f64>; HOURS_PER_DAY];

/// `cell_id -> depth bin -> month (1-12) -> hourly minimums`, as persisted.
pub type NestedMinimums = BTreeMap<usize, BTreeMap<String, BTreeMap<u32, HourlyMinimums>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub cell_id: usize,
    pub depth_idx: usize,
    /// Calendar month, 1-12.
    pub month: u32,
}

fn min_observed(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinimumsSummary {
    buckets: BTreeMap<BucketKey, HourlyMinimums>,
}

impl MinimumsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one observation into its bucket.
    pub fn observe(&mut self, key: BucketKey, hour: usize, value: f64) {
        if hour >= HOURS_PER_DAY {
            return;
        }
        let hours = self.buckets.entry(key).or_insert([None; HOURS_PER_DAY]);
        hours[hour] = min_observed(hours[hour], Some(value));
    }

    /// Summarizes one mixture member of a cell's mixture rows.
    ///
    /// Every row of `member` no deeper than `max_depth` is observed, so
    /// decisions sharing a timestamp and depth bin all count towards the
    /// minimum.
    ///
    /// # Errors
    ///
    /// [`ReportError::Validation`] if a row's depth bin is not in
    /// `depth_bins`.
    pub fn from_mixtures(
        cell_id: usize,
        mixtures: &[MixtureRow<SpaceTime>],
        depth_bins: &DepthBins,
        member: usize,
        max_depth: f64,
    ) -> ReportResult<Self> {
        let mut summary = Self::new();
        for row in mixtures {
            if row.member != member || row.context.depth_bin > max_depth {
                continue;
            }
            let depth_idx = depth_bins.index_of(row.context.depth_bin).ok_or_else(|| {
                ReportError::validation(format!("unknown depth bin {}", row.context.depth_bin))
            })?;
            let ts = row.context.timestamp;
            let key = BucketKey {
                cell_id,
                depth_idx,
                month: ts.month(),
            };
            summary.observe(key, ts.hour() as usize, row.probability);
        }
        Ok(summary)
    }

    /// Combines two summaries.
    pub fn merge(mut self, other: Self) -> Self {
        for (key, hours) in other.buckets {
            self.buckets
                .entry(key)
                .and_modify(|mine| {
                    for (slot, theirs) in mine.iter_mut().zip(hours) {
                        *slot = min_observed(*slot, theirs);
                    }
                })
                .or_insert(hours);
        }
        self
    }

    pub fn get(&self, cell_id: usize, depth_idx: usize, month: u32) -> Option<&HourlyMinimums> {
        self.buckets.get(&BucketKey {
            cell_id,
            depth_idx,
            month,
        })
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &HourlyMinimums)> {
        self.buckets.iter()
    }

    /// Nested layout with depth bins keyed by their float form (`"10.0"`).
    pub fn to_nested(&self, depth_bins: &DepthBins) -> ReportResult<NestedMinimums> {
        let mut nested = NestedMinimums::new();
        for (key, hours) in &self.buckets {
            let depth = depth_bins.as_slice().get(key.depth_idx).ok_or_else(|| {
                ReportError::validation(format!(
                    "minimums bucket refers to depth bin index {} of {}",
                    key.depth_idx,
                    depth_bins.len()
                ))
            })?;
            nested
                .entry(key.cell_id)
                .or_default()
                .entry(format!("{:?}", depth))
                .or_default()
                .insert(key.month, *hours);
        }
        Ok(nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    fn key(cell_id: usize, depth_idx: usize, month: u32) -> BucketKey {
        BucketKey {
            cell_id,
            depth_idx,
            month,
        }
    }

    fn mixture(ts: NaiveDateTime, depth_bin: f64, member: usize, probability: f64) -> MixtureRow<SpaceTime> {
        MixtureRow {
            decision: ts.to_string(),
            choice: depth_bin.to_string(),
            epsilon: member as f64,
            member,
            probability,
            context: SpaceTime {
                timestamp: ts,
                depth_bin,
            },
        }
    }

    fn mixtures_for(samples: &[(NaiveDateTime, f64, usize, f64)]) -> Vec<MixtureRow<SpaceTime>> {
        samples
            .iter()
            .map(|(ts, depth, member, p)| mixture(*ts, *depth, *member, *p))
            .collect()
    }

    #[test]
    fn test_months_are_one_based() {
        let bins = DepthBins::collect(vec![5.0]).unwrap();
        let jan = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap().and_hms_opt(3, 0, 0).unwrap();
        let dec = NaiveDate::from_ymd_opt(2023, 12, 15).unwrap().and_hms_opt(22, 0, 0).unwrap();
        let rows = mixtures_for(&[(jan, 5.0, 0, 0.25), (dec, 5.0, 0, 0.75)]);

        let summary = MinimumsSummary::from_mixtures(4, &rows, &bins, 0, 5.0).unwrap();

        assert_eq!(summary.get(4, 0, 1).unwrap()[3], Some(0.25));
        assert_eq!(summary.get(4, 0, 12).unwrap()[22], Some(0.75));
        assert!(summary.get(4, 0, 0).is_none());
        assert!(summary.iter().all(|(k, _)| (1..=12).contains(&k.month)));
    }

    #[test]
    fn test_brute_force_minimum() {
        let bins = DepthBins::collect(vec![10.0, 20.0]).unwrap();
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut samples = Vec::new();
        // Every 7 hours for a year, two depth bins, two members.
        for step in 0..1250_i64 {
            let ts = start + Duration::hours(step * 7);
            for (d, depth) in [10.0, 20.0].iter().enumerate() {
                for member in 0..2 {
                    let p = ((step * 37 + d as i64 * 11 + member as i64 * 5) % 101) as f64 / 100.0;
                    samples.push((ts, *depth, member, p));
                }
            }
        }
        let rows = mixtures_for(&samples);

        let summary = MinimumsSummary::from_mixtures(0, &rows, &bins, 1, 20.0).unwrap();

        for (d, depth) in [10.0, 20.0].iter().enumerate() {
            for month in 1..=12 {
                let hours = summary.get(0, d, month).unwrap();
                assert_eq!(hours.len(), HOURS_PER_DAY);
                for (hour, value) in hours.iter().enumerate() {
                    let expected = samples
                        .iter()
                        .filter(|(ts, dep, m, _)| {
                            *m == 1 && dep == depth && ts.month() == month && ts.hour() as usize == hour
                        })
                        .map(|(_, _, _, p)| *p)
                        .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))));
                    assert_eq!(*value, expected);
                }
            }
        }
    }

    #[test]
    fn test_decisions_sharing_a_slot_all_count() {
        let bins = DepthBins::collect(vec![10.0, 20.0]).unwrap();
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(5, 0, 0).unwrap();
        let mut rows = Vec::new();
        // Two fish in the same cell at the same time.
        for (decision, p10, p20) in [("fish-a", 0.9, 0.1), ("fish-b", 0.1, 0.9)] {
            for (depth, p) in [(10.0, p10), (20.0, p20)] {
                let mut row = mixture(ts, depth, 1, p);
                row.decision = decision.to_string();
                rows.push(row);
            }
        }
        rows.push(mixture(ts, 10.0, 0, 0.01));

        let summary = MinimumsSummary::from_mixtures(0, &rows, &bins, 1, 20.0).unwrap();

        assert_eq!(summary.get(0, 0, 3).unwrap()[5], Some(0.1));
        assert_eq!(summary.get(0, 1, 3).unwrap()[5], Some(0.1));
    }

    #[test]
    fn test_rows_deeper_than_cell_are_ignored() {
        let bins = DepthBins::collect(vec![10.0, 20.0]).unwrap();
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(5, 0, 0).unwrap();
        let rows = vec![mixture(ts, 10.0, 0, 0.6), mixture(ts, 20.0, 0, 0.4)];

        let summary = MinimumsSummary::from_mixtures(2, &rows, &bins, 0, 10.0).unwrap();

        assert_eq!(summary.get(2, 0, 3).unwrap()[5], Some(0.6));
        assert!(summary.get(2, 1, 3).is_none());
    }

    #[test]
    fn test_unknown_depth_bin_is_validation_error() {
        let bins = DepthBins::collect(vec![10.0]).unwrap();
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(5, 0, 0).unwrap();
        let rows = vec![mixture(ts, 15.0, 0, 0.6)];

        assert!(MinimumsSummary::from_mixtures(0, &rows, &bins, 0, 20.0)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_merge_takes_elementwise_minimum() {
        let mut a = MinimumsSummary::new();
        a.observe(key(0, 0, 3), 5, 0.4);
        a.observe(key(0, 0, 3), 6, 0.1);
        let mut b = MinimumsSummary::new();
        b.observe(key(0, 0, 3), 5, 0.2);
        b.observe(key(1, 0, 3), 5, 0.9);

        let merged = a.merge(b);

        let hours = merged.get(0, 0, 3).unwrap();
        assert_eq!(hours[5], Some(0.2));
        assert_eq!(hours[6], Some(0.1));
        assert_eq!(hours[7], None);
        assert_eq!(merged.get(1, 0, 3).unwrap()[5], Some(0.9));
    }

    #[test]
    fn test_nested_layout_uses_float_depth_keys() {
        let bins = DepthBins::collect(vec![10.0, 22.5]).unwrap();
        let mut summary = MinimumsSummary::new();
        summary.observe(key(7, 0, 2), 0, 0.3);
        summary.observe(key(7, 1, 2), 23, 0.6);

        let nested = summary.to_nested(&bins).unwrap();
        let json = serde_json::to_value(&nested).unwrap();

        assert_eq!(json["7"]["10.0"]["2"][0], 0.3);
        assert_eq!(json["7"]["22.5"]["2"][23], 0.6);
        assert!(json["7"]["10.0"]["2"][1].is_null());
        assert_eq!(json["7"]["10.0"]["2"].as_array().unwrap().len(), 24);
    }

    #[test]
    fn test_nested_rejects_unknown_depth_index() {
        let bins = DepthBins::collect(vec![10.0]).unwrap();
        let mut summary = MinimumsSummary::new();
        summary.observe(key(0, 3, 1), 0, 0.5);
        assert!(summary.to_nested(&bins).is_err());
    }

    fn summary_strategy() -> impl Strategy<Value = MinimumsSummary> {
        prop::collection::vec((0usize..3, 0usize..2, 1u32..=12, 0usize..24, 0.0f64..1.0), 0..40).prop_map(
            |obs| {
                let mut s = MinimumsSummary::new();
                for (cell, depth, month, hour, v) in obs {
                    s.observe(key(cell, depth, month), hour, v);
                }
                s
            },
        )
    }

    proptest! {
        #[test]
        fn prop_merge_commutative(a in summary_strategy(), b in summary_strategy()) {
            prop_assert_eq!(a.clone().merge(b.clone()), b.merge(a));
        }

        #[test]
        fn prop_merge_associative(a in summary_strategy(), b in summary_strategy(), c in summary_strategy()) {
            let left = a.clone().merge(b.clone()).merge(c.clone());
            let right = a.merge(b.merge(c));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn prop_empty_is_identity(a in summary_strategy()) {
            prop_assert_eq!(a.clone().merge(MinimumsSummary::new()), a);
        }
    }
}
