//! Depth report build tool
//!
//! Reads a `report.toml`, loads the input datasets it names, and publishes
//! one depth report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin build-report -- path/to/report.toml
//!
//! # Without an argument, report.toml is searched in the usual locations
//! RUST_LOG=debug cargo run --bin build-report --features parallel
//! ```

use std::env;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fishflow_reports::config::ReportConfig;
use fishflow_reports::io::loaders;
use fishflow_reports::report::{ReportBuilder, ReportInputs};

fn load_inputs(config: &ReportConfig) -> Result<ReportInputs> {
    let paths = &config.inputs;
    Ok(ReportInputs {
        metadata: loaders::load_scenario_metadata(&paths.metadata)?,
        hypothesis: loaders::load_predictions(&paths.model).context("Failed to load model predictions")?,
        reference: loaders::load_predictions(&paths.reference_model)
            .context("Failed to load reference model predictions")?,
        context: loaders::load_context(&paths.context).context("Failed to load context")?,
        hypothesis_actuals: loaders::load_predictions(&paths.model_actuals)
            .context("Failed to load model actuals")?,
        reference_actuals: loaders::load_predictions(&paths.reference_model_actuals)
            .context("Failed to load reference model actuals")?,
        selections_actuals: loaders::load_selections(&paths.selections_actuals)
            .context("Failed to load actual selections")?,
    })
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => ReportConfig::from_file(&path),
        None => ReportConfig::from_default_location(),
    }
    .context("Failed to load build configuration")?;

    let store = config.create_store()?;
    let inputs = load_inputs(&config)?;
    info!(
        "Loaded {} model rows, {} context rows, {} actual selections",
        inputs.hypothesis.len(),
        inputs.context.len(),
        inputs.selections_actuals.len()
    );

    let builder = ReportBuilder::new(store, config.support_epsilons()?)
        .with_mixture_epsilons(config.mixture_epsilons()?)
        .with_options(config.build_options());
    let builder = match &config.build.prior {
        Some(prior) => builder.with_prior(prior.clone()),
        None => builder,
    };

    let started = Instant::now();
    let summary = builder
        .build(&inputs)
        .with_context(|| format!("Failed to build report for {}", inputs.metadata.scenario_id))?;

    info!(
        "Report {} ready: {} cells, {} timestamps, {} artifacts in {:.1?}",
        summary.scenario_id,
        summary.grid_size,
        summary.timeline_len,
        summary.artifacts,
        started.elapsed()
    );
    info!("Support: {:?}", summary.support);
    Ok(())
}
