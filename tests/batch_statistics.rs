use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use resonode::analysis::batch::{
    BatchSpec, RiemannSpec, StopSignal, node_scalar, run_batch, run_batch_with_seeds, run_riemann_batch,
    run_riemann_batch_with_seeds,
};
use resonode::analysis::stats::{mean, median, std_dev};
use resonode::core::engine::{RunParams, generate_seeded};

fn noisy_spec() -> BatchSpec {
    BatchSpec::new(30.0, 0.6, 0.2)
}

fn seeds() -> Vec<i64> {
    (1..=40).collect()
}

/// Lets `budget` runs start, then asks the batch to stop.
struct StopAfter {
    budget: AtomicUsize,
}

impl StopAfter {
    fn new(budget: usize) -> Self {
        Self {
            budget: AtomicUsize::new(budget),
        }
    }
}

impl StopSignal for StopAfter {
    fn should_stop(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}

#[test]
fn histogram_conserves_total_nodes() {
    let result = run_batch_with_seeds(&noisy_spec(), &seeds(), None).unwrap();
    assert_eq!(result.completed_runs, 40);
    assert!(result.total_nodes > 0);
    assert_eq!(result.histogram.total(), result.total_nodes);
    assert_eq!(result.histogram.buckets.len(), 10);
    assert_eq!(result.node_counts.iter().sum::<usize>(), result.total_nodes);
    assert_eq!(
        result.average_per_run,
        result.total_nodes as f64 / 40.0
    );
}

#[test]
fn batch_counts_match_individual_runs() {
    let spec = noisy_spec();
    let result = run_batch_with_seeds(&spec, &seeds(), None).unwrap();
    for (seed, count) in result.seeds.iter().zip(&result.node_counts) {
        let run = generate_seeded(&RunParams {
            duration: spec.duration,
            noise: spec.noise,
            threshold: spec.threshold,
            seed: *seed,
        })
        .unwrap();
        assert_eq!(run.node_count(), *count, "seed {seed}");
    }
}

#[test]
fn parallel_batch_equals_sequential() {
    let sequential = run_batch_with_seeds(&noisy_spec(), &seeds(), None).unwrap();
    let parallel =
        run_batch_with_seeds(&noisy_spec().with_workers(4), &seeds(), None).unwrap();
    assert_eq!(sequential, parallel);

    let riemann = RiemannSpec::default();
    let a = run_riemann_batch_with_seeds(&noisy_spec(), &riemann, &seeds(), None).unwrap();
    let b = run_riemann_batch_with_seeds(&noisy_spec().with_workers(3), &riemann, &seeds(), None)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn cancelled_parallel_batch_reports_partial_work() {
    let flag = AtomicBool::new(true);
    let result =
        run_batch_with_seeds(&noisy_spec().with_workers(4), &seeds(), Some(&flag)).unwrap();
    assert!(result.cancelled);
    assert_eq!(result.completed_runs, 0);
    assert_eq!(result.total_nodes, 0);
}

#[test]
fn sequential_batch_stops_mid_way() {
    let stop = StopAfter::new(5);
    let result = run_batch_with_seeds(&noisy_spec(), &seeds(), Some(&stop)).unwrap();
    assert!(result.cancelled);
    assert_eq!(result.requested_runs, 40);
    assert_eq!(result.completed_runs, 5);
    assert_eq!(result.seeds, vec![1, 2, 3, 4, 5]);
    assert_eq!(result.histogram.total(), result.total_nodes);
}

#[test]
fn parallel_batch_stops_mid_way() {
    let spec = noisy_spec().with_workers(4);
    let stop = StopAfter::new(7);
    let result = run_batch_with_seeds(&spec, &seeds(), Some(&stop)).unwrap();
    assert!(result.cancelled);
    assert_eq!(result.completed_runs, 7);
    assert!(result.completed_runs < result.requested_runs);
    assert_eq!(result.seeds.len(), 7);
    assert_eq!(result.node_counts.len(), 7);
    assert_eq!(result.histogram.total(), result.total_nodes);
    assert_eq!(result.node_counts.iter().sum::<usize>(), result.total_nodes);

    // Finished runs come back in seed order, whatever subset the workers reached.
    assert!(result.seeds.windows(2).all(|w| w[0] < w[1]));
    let full = run_batch_with_seeds(&noisy_spec(), &seeds(), None).unwrap();
    for (seed, count) in result.seeds.iter().zip(&result.node_counts) {
        let idx = full.seeds.iter().position(|s| s == seed).unwrap();
        assert_eq!(full.node_counts[idx], *count, "seed {seed}");
    }
}

#[test]
fn budget_covering_every_run_is_not_cancelled() {
    let stop = StopAfter::new(40);
    let result =
        run_batch_with_seeds(&noisy_spec().with_workers(3), &seeds(), Some(&stop)).unwrap();
    assert!(!result.cancelled);
    assert_eq!(result.completed_runs, 40);
}

#[test]
fn riemann_stats_cover_every_node() {
    let result =
        run_riemann_batch_with_seeds(&noisy_spec(), &RiemannSpec::default(), &seeds(), None)
            .unwrap();
    assert_eq!(result.stats.count, result.batch.total_nodes);
    assert_eq!(result.scalars.len(), result.batch.total_nodes);

    let values: Vec<f64> = result.scalars.iter().map(|s| s.scalar).collect();
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(result.stats.mean, mean(&values));
    assert_eq!(result.stats.median, median(&values));
    assert_eq!(result.stats.std_dev, std_dev(&values));

    for s in &result.scalars {
        assert_eq!(s.scalar, node_scalar(s.energy, 0.2, 0.6, result.scaling_factor));
    }

    let grid = result.density.as_ref().expect("density grid requested");
    assert_eq!(grid.total(), result.batch.total_nodes);
    assert_eq!(
        grid.max_count,
        grid.cells.iter().map(|c| c.count).max().unwrap_or(0)
    );
    assert!(grid.cells.iter().all(|c| c.scalar_bin < 20 && c.time_bin < 20));
}

#[test]
fn riemann_grid_can_be_skipped() {
    let riemann = RiemannSpec {
        scaling_factor: 0.25,
        grid: None,
    };
    let result = run_riemann_batch_with_seeds(&noisy_spec(), &riemann, &[3, 4], None).unwrap();
    assert!(result.density.is_none());
    assert_eq!(result.scaling_factor, 0.25);
}

#[test]
fn zero_runs_yield_empty_aggregates() {
    let result = run_batch(0, 10.0, 0.3, 0.5).unwrap();
    assert_eq!(result.total_nodes, 0);
    assert_eq!(result.average_per_run, 0.0);
    assert!(result.histogram.counts().iter().all(|c| *c == 0));

    let riemann = run_riemann_batch(0, 10.0, 0.3, 0.5, 0.1).unwrap();
    assert_eq!(riemann.stats.count, 0);
    assert_eq!(riemann.stats.mean, 0.0);
    assert_eq!(riemann.stats.std_dev, 0.0);
    let grid = riemann.density.expect("default grid");
    assert!(grid.cells.is_empty());
    assert_eq!(grid.max_count, 0);
}

#[test]
fn random_seeded_batch_is_internally_consistent() {
    let result = run_batch(5, 8.0, 0.5, 0.3).unwrap();
    assert_eq!(result.seeds.len(), 5);
    assert!(result.seeds.iter().all(|s| (0..1_000_000).contains(s)));
    assert_eq!(result.histogram.total(), result.total_nodes);
}

#[test]
fn invalid_duration_is_rejected() {
    assert!(run_batch(3, -1.0, 0.3, 0.5).is_err());
    assert!(run_riemann_batch(3, 10.0, f64::NAN, 0.5, 0.1).is_err());
}
