//! Depth report assembly.
//!
//! A build validates every input, derives the scenario-wide structures
//! (cells, timeline, depth bins, support), then processes one cell at a time
//! so only a single cell's mixture cross product is alive at once. All
//! artifacts go to a staging prefix which replaces the published report
//! only after the last write succeeded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::algorithms::matrices::{validate_same_universe, validate_selections};
use crate::algorithms::{compute_mixtures, compute_support};
use crate::core::domain::{
    ContextRow, DepthBins, Epsilons, Prediction, ReportMetadata, ScenarioMetadata, Selection, SpaceTime,
};
use crate::error::{ReportError, ReportResult};
use crate::io::artifacts::{
    encode_json, encode_occupancy, occupancy_file, report_prefix, staging_prefix, CELL_DEPTHS, GEOMETRIES,
    META_DATA, MINIMUMS, TIMESTAMPS,
};
use crate::report::cell_depths::build_cell_depths;
use crate::report::minimums::MinimumsSummary;
use crate::report::occupancy::OccupancyTable;
use crate::spacetime::{build_geojson_h3, build_timeline, CellAssignment, FeatureCollection, Timeline};
use crate::storage::ArtifactStore;

/// Everything a build reads.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub metadata: ScenarioMetadata,
    /// Hypothesis model predictions for the report period.
    pub hypothesis: Vec<Prediction>,
    /// Reference model predictions for the report period.
    pub reference: Vec<Prediction>,
    /// Where and when each `(decision, choice)` of the report period applies.
    pub context: Vec<ContextRow>,
    /// Hypothesis predictions for the decisions with observed outcomes.
    pub hypothesis_actuals: Vec<Prediction>,
    /// Reference predictions for the decisions with observed outcomes.
    pub reference_actuals: Vec<Prediction>,
    pub selections_actuals: Vec<Selection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Process cells on the rayon pool. Ignored without the `parallel`
    /// feature.
    pub parallel: bool,
}

/// What a successful build published.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub scenario_id: String,
    pub grid_size: usize,
    pub timeline_len: usize,
    pub depth_bins: DepthBins,
    pub support: Vec<f64>,
    pub artifacts: usize,
}

struct CellJob {
    cell_id: usize,
    hypothesis: Vec<Prediction<SpaceTime>>,
    reference: Vec<Prediction>,
}

struct Derived<'a> {
    timeline: &'a Timeline,
    depth_bins: &'a DepthBins,
    cell_depths: &'a BTreeMap<usize, f64>,
}

/// Builds and publishes depth reports into an [`ArtifactStore`].
pub struct ReportBuilder {
    store: Arc<dyn ArtifactStore>,
    support_epsilons: Epsilons,
    mixture_epsilons: Epsilons,
    prior: Option<Vec<f64>>,
    options: BuildOptions,
}

impl ReportBuilder {
    /// Uses `support_epsilons` for both support estimation and mixtures.
    pub fn new(store: Arc<dyn ArtifactStore>, support_epsilons: Epsilons) -> Self {
        Self {
            store,
            mixture_epsilons: support_epsilons.clone(),
            support_epsilons,
            prior: None,
            options: BuildOptions::default(),
        }
    }

    pub fn with_mixture_epsilons(mut self, epsilons: Epsilons) -> Self {
        self.mixture_epsilons = epsilons;
        self
    }

    /// Prior over the support epsilons; uniform when unset.
    pub fn with_prior(mut self, prior: Vec<f64>) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the report for `inputs` and publishes it under
    /// `depth/<scenario_id>/`, replacing any previous report.
    ///
    /// # Errors
    ///
    /// Validation errors are raised before anything is written. Any later
    /// error discards the staged artifacts and leaves the published report
    /// untouched.
    pub fn build(&self, inputs: &ReportInputs) -> ReportResult<BuildSummary> {
        let scenario_id = inputs.metadata.scenario_id.as_str();
        info!("Building depth report for scenario {}", scenario_id);

        validate_inputs(inputs)?;

        let (geometry, cells) = build_geojson_h3(&inputs.context)?;
        info!(
            "Assigned {} cells at resolution {}",
            cells.grid_size(),
            cells.resolution()
        );
        let timeline = build_timeline(&inputs.context)?;
        info!("Timeline has {} timestamps", timeline.len());
        let depth_bins = DepthBins::collect(inputs.context.iter().map(|row| row.depth_bin))?;
        let cell_depths = build_cell_depths(&inputs.context, &cells);

        let support = compute_support(
            &inputs.hypothesis_actuals,
            &inputs.reference_actuals,
            &inputs.selections_actuals,
            &self.support_epsilons,
            self.prior.as_deref(),
        )?;
        info!("Support over {} mixture weights: {:?}", support.len(), support);

        if self.mixture_epsilons.hypothesis_member().is_none() {
            warn!("Mixture weights do not include 1.0; minimums will be empty");
        }
        if self.options.parallel && !cfg!(feature = "parallel") {
            warn!("Parallel build requested but the parallel feature is disabled; running sequentially");
        }

        let time_window = timeline
            .window()
            .ok_or_else(|| ReportError::validation("timeline is empty"))?;
        let metadata = ReportMetadata {
            scenario: inputs.metadata.clone(),
            time_window,
            grid_size: cells.grid_size(),
            depth_bins: depth_bins.clone(),
            resolution: cells.resolution(),
            support: support.clone(),
        };

        let jobs = group_by_cell(inputs, &cells);
        let derived = Derived {
            timeline: &timeline,
            depth_bins: &depth_bins,
            cell_depths: &cell_depths,
        };

        let staging = staging_prefix(scenario_id);
        self.store.remove_all(&staging)?;

        let published = self
            .write_report(&staging, &jobs, &derived, &metadata, &geometry)
            .and_then(|artifacts| {
                self.store.replace(&staging, &report_prefix(scenario_id))?;
                Ok(artifacts)
            });

        match published {
            Ok(artifacts) => {
                info!(
                    "Published {} artifacts for scenario {}",
                    artifacts, scenario_id
                );
                Ok(BuildSummary {
                    scenario_id: scenario_id.to_string(),
                    grid_size: cells.grid_size(),
                    timeline_len: timeline.len(),
                    depth_bins,
                    support,
                    artifacts,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.store.remove_all(&staging) {
                    warn!("Failed to discard staged artifacts at {}: {}", staging, cleanup);
                }
                Err(e)
            }
        }
    }

    fn write_report(
        &self,
        staging: &str,
        jobs: &[CellJob],
        derived: &Derived<'_>,
        metadata: &ReportMetadata,
        geometry: &FeatureCollection,
    ) -> ReportResult<usize> {
        let minimums = self.run_cells(staging, jobs, derived)?;

        let put = |name: &str, bytes: Vec<u8>| self.store.write(&format!("{}/{}", staging, name), &bytes);
        put(META_DATA, encode_json(metadata)?)?;
        put(GEOMETRIES, encode_json(geometry)?)?;
        put(CELL_DEPTHS, encode_json(derived.cell_depths)?)?;
        put(TIMESTAMPS, encode_json(&derived.timeline.to_strings())?)?;
        put(MINIMUMS, encode_json(&minimums.to_nested(derived.depth_bins)?)?)?;

        Ok(jobs.len() + 5)
    }

    fn run_cells(&self, staging: &str, jobs: &[CellJob], derived: &Derived<'_>) -> ReportResult<MinimumsSummary> {
        let total = jobs.len();
        let done = AtomicUsize::new(0);
        let process = |job: &CellJob| -> ReportResult<MinimumsSummary> {
            let summary = self.process_cell(staging, job, derived)?;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 10 == 0 || n == total {
                info!("Processed {}/{} cells", n, total);
            }
            Ok(summary)
        };

        #[cfg(feature = "parallel")]
        {
            if self.options.parallel {
                return jobs
                    .par_iter()
                    .map(&process)
                    .try_reduce(MinimumsSummary::new, |a, b| Ok(a.merge(b)));
            }
        }

        jobs.iter()
            .try_fold(MinimumsSummary::new(), |acc, job| Ok(acc.merge(process(job)?)))
    }

    fn process_cell(&self, staging: &str, job: &CellJob, derived: &Derived<'_>) -> ReportResult<MinimumsSummary> {
        if job.hypothesis.is_empty() {
            warn!("Cell {} has no predictions; its occupancy is all null", job.cell_id);
        }
        let max_depth = derived
            .cell_depths
            .get(&job.cell_id)
            .copied()
            .ok_or_else(|| ReportError::validation(format!("cell {} has no depth bins", job.cell_id)))?;

        let mixtures = compute_mixtures(&job.hypothesis, &job.reference, &self.mixture_epsilons)?;
        let table = OccupancyTable::from_mixtures(
            &mixtures,
            derived.timeline,
            derived.depth_bins,
            self.mixture_epsilons.len(),
            max_depth,
        )?;

        let path = format!("{}/{}", staging, occupancy_file(job.cell_id));
        self.store.write(&path, &encode_occupancy(&table)?)?;
        debug!(
            "Cell {}: {} mixture rows, {} x {} occupancy",
            job.cell_id,
            mixtures.len(),
            table.row_count(),
            table.column_count()
        );

        match self.mixture_epsilons.hypothesis_member() {
            Some(member) => {
                MinimumsSummary::from_mixtures(job.cell_id, &mixtures, derived.depth_bins, member, max_depth)
            }
            None => Ok(MinimumsSummary::new()),
        }
    }
}

fn validate_inputs(inputs: &ReportInputs) -> ReportResult<()> {
    inputs.metadata.validate()?;
    validate_same_universe(&inputs.hypothesis, &inputs.reference, "model predictions")?;
    validate_same_universe(
        &inputs.hypothesis_actuals,
        &inputs.reference_actuals,
        "actuals predictions",
    )?;
    validate_selections(&inputs.hypothesis_actuals, &inputs.selections_actuals)?;

    if inputs.context.is_empty() {
        return Err(ReportError::validation("context must not be empty"));
    }
    let mut seen = HashSet::with_capacity(inputs.context.len());
    for row in &inputs.context {
        if !seen.insert((row.decision.as_str(), row.choice.as_str())) {
            return Err(ReportError::validation(format!(
                "context contains duplicate pair ({}, {})",
                row.decision, row.choice
            )));
        }
    }
    Ok(())
}

/// Splits the report-period predictions by cell, attaching each hypothesis
/// row's time and depth. Every cell gets a job, even without predictions.
fn group_by_cell(inputs: &ReportInputs, cells: &CellAssignment) -> Vec<CellJob> {
    let context: HashMap<(&str, &str), &ContextRow> = inputs
        .context
        .iter()
        .map(|row| ((row.decision.as_str(), row.choice.as_str()), row))
        .collect();

    let mut jobs: Vec<CellJob> = (0..cells.grid_size())
        .map(|cell_id| CellJob {
            cell_id,
            hypothesis: Vec::new(),
            reference: Vec::new(),
        })
        .collect();

    let mut skipped = 0_usize;
    for row in &inputs.hypothesis {
        let placed = context.get(&row.key()).and_then(|ctx| {
            cells
                .cell_of(&row.decision, &row.choice)
                .map(|cell_id| (cell_id, SpaceTime::from(*ctx)))
        });
        match placed {
            Some((cell_id, spacetime)) => jobs[cell_id].hypothesis.push(row.clone().with_context(spacetime)),
            None => skipped += 1,
        }
    }
    for row in &inputs.reference {
        if let Some(cell_id) = cells.cell_of(&row.decision, &row.choice) {
            jobs[cell_id].reference.push(row.clone());
        }
    }

    if skipped > 0 {
        warn!("{} prediction rows have no context row and were skipped", skipped);
    }
    jobs
}
