//! Build configuration file support.
//!
//! This module reads report build settings from a TOML file:
//!
//! ```toml
//! [storage]
//! kind = "local"
//! root = "./artifacts"
//!
//! [build]
//! epsilon_count = 11
//! parallel = true
//!
//! [inputs]
//! metadata = "scenario.json"
//! model = "model.parquet"
//! reference_model = "reference.parquet"
//! context = "context.parquet"
//! model_actuals = "model_actuals.parquet"
//! reference_model_actuals = "reference_actuals.parquet"
//! selections_actuals = "selections.parquet"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::domain::Epsilons;
use crate::error::{ReportError, ReportResult};
use crate::report::BuildOptions;
use crate::storage::{ArtifactStore, StoreFactory, StoreKind};

/// Report build configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub build: BuildSettings,
    pub inputs: InputPaths,
}

/// Artifact store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub kind: StoreKind,
    /// Root directory for the local store.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Inference and assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Size of the evenly spaced epsilon family used when no explicit
    /// sequence is given.
    #[serde(default = "default_epsilon_count")]
    pub epsilon_count: usize,
    #[serde(default)]
    pub support_epsilons: Option<Vec<f64>>,
    /// Defaults to the support epsilons.
    #[serde(default)]
    pub mixture_epsilons: Option<Vec<f64>>,
    #[serde(default)]
    pub prior: Option<Vec<f64>>,
    #[serde(default)]
    pub parallel: bool,
}

fn default_epsilon_count() -> usize {
    11
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            epsilon_count: default_epsilon_count(),
            support_epsilons: None,
            mixture_epsilons: None,
            prior: None,
            parallel: false,
        }
    }
}

/// Input dataset locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    pub metadata: PathBuf,
    pub model: PathBuf,
    pub reference_model: PathBuf,
    pub context: PathBuf,
    pub model_actuals: PathBuf,
    pub reference_model_actuals: PathBuf,
    pub selections_actuals: PathBuf,
}

impl InputPaths {
    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.metadata,
            &mut self.model,
            &mut self.reference_model,
            &mut self.context,
            &mut self.model_actuals,
            &mut self.reference_model_actuals,
            &mut self.selections_actuals,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

impl ReportConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ReportResult<Self> {
        toml::from_str(content)
            .map_err(|e| ReportError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration from a TOML file.
    ///
    /// Relative input paths and the local store root are resolved against
    /// the directory containing the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ReportResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ReportError::Configuration(format!("Failed to read config file: {}", e)))?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(base) = path.parent() {
            config.inputs.rebase(base);
            if let Some(root) = config.storage.root.as_mut() {
                if root.is_relative() {
                    *root = base.join(&*root);
                }
            }
        }
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `report.toml` in:
    /// 1. Current directory
    /// 2. `reports/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> ReportResult<Self> {
        let search_paths = [
            PathBuf::from("report.toml"),
            PathBuf::from("reports/report.toml"),
            PathBuf::from("../report.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ReportError::Configuration(
            "No report.toml found in standard locations".to_string(),
        ))
    }

    pub fn support_epsilons(&self) -> ReportResult<Epsilons> {
        let epsilons = match &self.build.support_epsilons {
            Some(values) => Epsilons::new(values.clone()),
            None => Epsilons::evenly_spaced(self.build.epsilon_count),
        };
        epsilons.map_err(|e| ReportError::Configuration(format!("Invalid support epsilons: {}", e)))
    }

    pub fn mixture_epsilons(&self) -> ReportResult<Epsilons> {
        match &self.build.mixture_epsilons {
            Some(values) => Epsilons::new(values.clone())
                .map_err(|e| ReportError::Configuration(format!("Invalid mixture epsilons: {}", e))),
            None => self.support_epsilons(),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            parallel: self.build.parallel,
        }
    }

    /// Creates the configured artifact store.
    pub fn create_store(&self) -> ReportResult<Arc<dyn ArtifactStore>> {
        Ok(StoreFactory::create(self.storage.kind, self.storage.root.as_deref())?)
    }
}
