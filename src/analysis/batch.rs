//! Batch statistics over independently seeded runs.
//!
//! Seeds for a batch come from an uncontrolled source (`rand::rng()`); each
//! run is still reproducible from its own seed, and a batch is reproducible
//! from its seed list via `run_batch_with_seeds`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::unbounded;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::density::{DEFAULT_GRID_SIZE, DensityGrid, MAX_GRID_SIZE, TimeHistogram};
use crate::analysis::stats::ScalarStats;
use crate::core::engine::{NodeRecord, RunParams, generate_seeded, validate_inputs};
use crate::error::{ResonodeError, Result, require_finite};

pub const SEED_UPPER: i64 = 1_000_000;
pub const DEFAULT_SCALING_FACTOR: f64 = 0.1;
pub const MAX_RELATIVE_EXCESS: f64 = 5.0;
/// Below this threshold the relative excess falls back to an absolute one.
pub const MIN_RELATIVE_THRESHOLD: f64 = 0.001;

/// Polled before each run; once it reports `true` no further runs start.
pub trait StopSignal: Sync {
    fn should_stop(&self) -> bool;
}

impl StopSignal for AtomicBool {
    fn should_stop(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// Fixed inputs shared by every run of a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchSpec {
    pub duration: f64,
    pub noise: f64,
    pub threshold: f64,
    pub workers: usize,
}

impl BatchSpec {
    pub fn new(duration: f64, noise: f64, threshold: f64) -> Self {
        Self {
            duration,
            noise,
            threshold,
            workers: 1,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    fn run_params(&self, seed: i64) -> RunParams {
        RunParams {
            duration: self.duration,
            noise: self.noise,
            threshold: self.threshold,
            seed,
        }
    }
}

/// Scalar transform settings for the Riemann-analogous batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiemannSpec {
    pub scaling_factor: f64,
    /// `(scalar_bins, time_bins)`; `None` skips the density grid.
    pub grid: Option<(usize, usize)>,
}

impl RiemannSpec {
    pub fn validate(&self) -> Result<()> {
        require_finite("scaling_factor", self.scaling_factor)?;
        if let Some((scalar_bins, time_bins)) = self.grid {
            check_grid_axis("scalar_bins", scalar_bins)?;
            check_grid_axis("time_bins", time_bins)?;
        }
        Ok(())
    }
}

fn check_grid_axis(name: &'static str, bins: usize) -> Result<()> {
    if (1..=MAX_GRID_SIZE).contains(&bins) {
        Ok(())
    } else {
        Err(ResonodeError::invalid(
            name,
            bins as f64,
            "grid size out of range",
        ))
    }
}

impl Default for RiemannSpec {
    fn default() -> Self {
        Self {
            scaling_factor: DEFAULT_SCALING_FACTOR,
            grid: Some((DEFAULT_GRID_SIZE, DEFAULT_GRID_SIZE)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchResult {
    pub duration: f64,
    pub noise: f64,
    pub threshold: f64,
    pub requested_runs: usize,
    pub completed_runs: usize,
    pub cancelled: bool,
    pub seeds: Vec<i64>,
    pub node_counts: Vec<usize>,
    pub total_nodes: usize,
    pub average_per_run: f64,
    pub histogram: TimeHistogram,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NodeScalar {
    pub seed: i64,
    pub time: f64,
    pub energy: f64,
    pub scalar: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiemannBatchResult {
    #[serde(flatten)]
    pub batch: BatchResult,
    pub scaling_factor: f64,
    pub scalars: Vec<NodeScalar>,
    pub stats: ScalarStats,
    pub density: Option<DensityGrid>,
}

/// Nodes of one run, gathered in a run-local buffer.
#[derive(Clone, Debug)]
struct RunTally {
    seed: i64,
    nodes: Vec<NodeRecord>,
}

pub fn draw_seeds<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<i64> {
    (0..n).map(|_| rng.random_range(0..SEED_UPPER)).collect()
}

/// Clamped energy excess over the threshold, relative to the threshold.
pub fn relative_excess(energy: f64, threshold: f64) -> f64 {
    if threshold > MIN_RELATIVE_THRESHOLD {
        ((energy.max(threshold) - threshold) / threshold).clamp(0.0, MAX_RELATIVE_EXCESS)
    } else if energy > 0.0 {
        energy * 2.0
    } else {
        0.0
    }
}

/// Heuristic per-node scalar in `[0, 1]`.
pub fn node_scalar(energy: f64, threshold: f64, noise: f64, scaling_factor: f64) -> f64 {
    let excess = relative_excess(energy, threshold);
    (0.5 + (excess - noise) * scaling_factor).clamp(0.0, 1.0)
}

pub fn run_batch(n: usize, duration: f64, noise: f64, threshold: f64) -> Result<BatchResult> {
    let seeds = draw_seeds(&mut rand::rng(), n);
    run_batch_with_seeds(&BatchSpec::new(duration, noise, threshold), &seeds, None)
}

pub fn run_batch_with_seeds(
    spec: &BatchSpec,
    seeds: &[i64],
    cancel: Option<&dyn StopSignal>,
) -> Result<BatchResult> {
    let (result, _) = execute(spec, seeds, cancel)?;
    Ok(result)
}

pub fn run_riemann_batch(
    n: usize,
    duration: f64,
    noise: f64,
    threshold: f64,
    scaling_factor: f64,
) -> Result<RiemannBatchResult> {
    let seeds = draw_seeds(&mut rand::rng(), n);
    let riemann = RiemannSpec {
        scaling_factor,
        ..RiemannSpec::default()
    };
    run_riemann_batch_with_seeds(
        &BatchSpec::new(duration, noise, threshold),
        &riemann,
        &seeds,
        None,
    )
}

pub fn run_riemann_batch_with_seeds(
    spec: &BatchSpec,
    riemann: &RiemannSpec,
    seeds: &[i64],
    cancel: Option<&dyn StopSignal>,
) -> Result<RiemannBatchResult> {
    riemann.validate()?;
    let (batch, tallies) = execute(spec, seeds, cancel)?;

    let scalars: Vec<NodeScalar> = tallies
        .iter()
        .flat_map(|tally| {
            tally.nodes.iter().map(move |node| NodeScalar {
                seed: tally.seed,
                time: node.time,
                energy: node.energy,
                scalar: node_scalar(
                    node.energy,
                    spec.threshold,
                    spec.noise,
                    riemann.scaling_factor,
                ),
            })
        })
        .collect();
    let values: Vec<f64> = scalars.iter().map(|s| s.scalar).collect();
    let stats = ScalarStats::from_values(&values);
    let density = riemann.grid.map(|(scalar_bins, time_bins)| {
        let points: Vec<(f64, f64)> = scalars.iter().map(|s| (s.scalar, s.time)).collect();
        DensityGrid::build(&points, spec.duration, scalar_bins, time_bins)
    });

    info!(
        nodes = stats.count,
        mean = stats.mean,
        median = stats.median,
        std_dev = stats.std_dev,
        "riemann batch finished"
    );
    Ok(RiemannBatchResult {
        batch,
        scaling_factor: riemann.scaling_factor,
        scalars,
        stats,
        density,
    })
}

fn execute(
    spec: &BatchSpec,
    seeds: &[i64],
    cancel: Option<&dyn StopSignal>,
) -> Result<(BatchResult, Vec<RunTally>)> {
    validate_inputs(spec.duration, spec.noise, spec.threshold)?;
    let (tallies, cancelled) = if spec.workers > 1 && seeds.len() > 1 {
        collect_parallel(spec, seeds, cancel)?
    } else {
        collect_sequential(spec, seeds, cancel)?
    };

    let mut histogram = TimeHistogram::new(spec.duration);
    let mut node_counts = Vec::with_capacity(tallies.len());
    for tally in &tallies {
        for node in &tally.nodes {
            histogram.record(node.time);
        }
        node_counts.push(tally.nodes.len());
    }
    let total_nodes: usize = node_counts.iter().sum();
    let completed_runs = tallies.len();
    let average_per_run = if completed_runs == 0 {
        0.0
    } else {
        total_nodes as f64 / completed_runs as f64
    };

    info!(
        requested = seeds.len(),
        completed = completed_runs,
        total_nodes,
        average_per_run,
        cancelled,
        "batch finished"
    );
    let result = BatchResult {
        duration: spec.duration,
        noise: spec.noise,
        threshold: spec.threshold,
        requested_runs: seeds.len(),
        completed_runs,
        cancelled,
        seeds: tallies.iter().map(|t| t.seed).collect(),
        node_counts,
        total_nodes,
        average_per_run,
        histogram,
    };
    Ok((result, tallies))
}

fn is_cancelled(cancel: Option<&dyn StopSignal>) -> bool {
    cancel.is_some_and(|signal| signal.should_stop())
}

fn tally_run(spec: &BatchSpec, seed: i64) -> Result<RunTally> {
    let run = generate_seeded(&spec.run_params(seed))?;
    Ok(RunTally {
        seed,
        nodes: run.nodes(),
    })
}

fn collect_sequential(
    spec: &BatchSpec,
    seeds: &[i64],
    cancel: Option<&dyn StopSignal>,
) -> Result<(Vec<RunTally>, bool)> {
    let mut tallies = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        if is_cancelled(cancel) {
            return Ok((tallies, true));
        }
        tallies.push(tally_run(spec, seed)?);
    }
    Ok((tallies, false))
}

/// Spread runs over scoped workers; results are merged back in seed order.
fn collect_parallel(
    spec: &BatchSpec,
    seeds: &[i64],
    cancel: Option<&dyn StopSignal>,
) -> Result<(Vec<RunTally>, bool)> {
    let workers = spec.workers.min(seeds.len());
    let (job_tx, job_rx) = unbounded::<(usize, i64)>();
    let (result_tx, result_rx) = unbounded::<(usize, Result<RunTally>)>();
    for job in seeds.iter().copied().enumerate() {
        // receiver is alive until the scope below ends
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                let mut done = 0usize;
                while let Ok((idx, seed)) = job_rx.recv() {
                    if is_cancelled(cancel) {
                        break;
                    }
                    if result_tx.send((idx, tally_run(spec, seed))).is_err() {
                        break;
                    }
                    done += 1;
                }
                debug!(worker, runs = done, "batch worker finished");
            });
        }
    });
    drop(result_tx);

    let mut indexed: Vec<(usize, RunTally)> = Vec::with_capacity(seeds.len());
    for (idx, tally) in result_rx.try_iter() {
        indexed.push((idx, tally?));
    }
    indexed.sort_by_key(|(idx, _)| *idx);
    let cancelled = indexed.len() < seeds.len();
    Ok((indexed.into_iter().map(|(_, t)| t).collect(), cancelled))
}
