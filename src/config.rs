//! TOML configuration: `[simulation]`, `[batch]` and `[search]` sections.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::analysis::batch::{BatchSpec, DEFAULT_SCALING_FACTOR, RiemannSpec};
use crate::analysis::density::DEFAULT_GRID_SIZE;
use crate::analysis::search::{DEFAULT_MAX_ATTEMPTS, SearchSpace};
use crate::core::engine::RunParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_duration")]
    pub duration: f64,
    #[serde(default = "SimulationConfig::default_noise")]
    pub noise: f64,
    #[serde(default = "SimulationConfig::default_threshold")]
    pub threshold: f64,
    #[serde(default = "SimulationConfig::default_seed")]
    pub seed: i64,
}

impl SimulationConfig {
    fn default_duration() -> f64 {
        20.0
    }
    fn default_noise() -> f64 {
        0.3
    }
    fn default_threshold() -> f64 {
        0.9
    }
    fn default_seed() -> i64 {
        42
    }

    pub fn run_params(&self) -> RunParams {
        RunParams {
            duration: self.duration,
            noise: self.noise,
            threshold: self.threshold,
            seed: self.seed,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: Self::default_duration(),
            noise: Self::default_noise(),
            threshold: Self::default_threshold(),
            seed: Self::default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "BatchConfig::default_runs")]
    pub runs: usize,
    #[serde(default = "BatchConfig::default_workers")]
    pub workers: usize,
    #[serde(default = "BatchConfig::default_scaling_factor")]
    pub scaling_factor: f64,
    #[serde(default = "BatchConfig::default_density_grid")]
    pub density_grid: bool,
    #[serde(default = "BatchConfig::default_grid_size")]
    pub grid_size: usize,
}

impl BatchConfig {
    fn default_runs() -> usize {
        100
    }
    fn default_workers() -> usize {
        1
    }
    fn default_scaling_factor() -> f64 {
        DEFAULT_SCALING_FACTOR
    }
    fn default_density_grid() -> bool {
        true
    }
    fn default_grid_size() -> usize {
        DEFAULT_GRID_SIZE
    }

    pub fn batch_spec(&self, sim: &SimulationConfig) -> BatchSpec {
        BatchSpec::new(sim.duration, sim.noise, sim.threshold).with_workers(self.workers)
    }

    pub fn riemann_spec(&self) -> RiemannSpec {
        RiemannSpec {
            scaling_factor: self.scaling_factor,
            grid: self
                .density_grid
                .then_some((self.grid_size, self.grid_size)),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: Self::default_runs(),
            workers: Self::default_workers(),
            scaling_factor: Self::default_scaling_factor(),
            density_grid: Self::default_density_grid(),
            grid_size: Self::default_grid_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "SearchConfig::default_noise_min")]
    pub noise_min: f64,
    #[serde(default = "SearchConfig::default_noise_max")]
    pub noise_max: f64,
    #[serde(default = "SearchConfig::default_threshold_min")]
    pub threshold_min: f64,
    #[serde(default = "SearchConfig::default_threshold_max")]
    pub threshold_max: f64,
}

impl SearchConfig {
    fn default_max_attempts() -> usize {
        DEFAULT_MAX_ATTEMPTS
    }
    fn default_noise_min() -> f64 {
        SearchSpace::default().noise_min
    }
    fn default_noise_max() -> f64 {
        SearchSpace::default().noise_max
    }
    fn default_threshold_min() -> f64 {
        SearchSpace::default().threshold_min
    }
    fn default_threshold_max() -> f64 {
        SearchSpace::default().threshold_max
    }

    pub fn space(&self) -> SearchSpace {
        SearchSpace {
            noise_min: self.noise_min,
            noise_max: self.noise_max,
            threshold_min: self.threshold_min,
            threshold_max: self.threshold_max,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            noise_min: Self::default_noise_min(),
            noise_max: Self::default_noise_max(),
            threshold_min: Self::default_threshold_min(),
            threshold_max: Self::default_threshold_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl AppConfig {
    /// Parse `path`, reporting read and parse failures as text for the log.
    fn read(path: &Path) -> std::result::Result<Self, String> {
        let text = fs::read_to_string(path).map_err(|err| format!("read failed: {err}"))?;
        toml::from_str(&text).map_err(|err| format!("parse failed: {err}"))
    }

    /// Defaults rendered with every key commented out; section headers stay live.
    fn template() -> std::result::Result<String, toml::ser::Error> {
        let text = toml::to_string_pretty(&Self::default())?;
        let lines: Vec<String> = text
            .lines()
            .map(|line| match line.trim() {
                "" => String::new(),
                t if t.starts_with('[') => line.to_string(),
                _ => format!("# {line}"),
            })
            .collect();
        Ok(lines.join("\n") + "\n")
    }

    /// Load `path`; a missing file is created from the commented template and
    /// any read or parse failure falls back to the defaults.
    pub fn load_or_default(path: &str) -> Self {
        let path = Path::new(path);
        if path.exists() {
            return Self::read(path).unwrap_or_else(|err| {
                warn!(path = %path.display(), "config {err}; using defaults");
                Self::default()
            });
        }

        match Self::template() {
            Ok(text) => {
                if let Err(err) = fs::write(path, text) {
                    warn!(path = %path.display(), "failed to write default config: {err}");
                }
            }
            Err(err) => warn!("failed to serialize default config: {err}"),
        }
        Self::default()
    }
}
