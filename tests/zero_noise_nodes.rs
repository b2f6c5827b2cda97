use std::f64::consts::PI;

use resonode::core::engine::{RunParams, generate_seeded};
use resonode::core::node::Characteristic;
use resonode::core::round::round3;

fn analytic_energy(t: f64) -> f64 {
    (2.0 * PI * 0.2 * t).sin()
}

fn analytic_phase(t: f64) -> f64 {
    (2.0 * PI * 0.203 * t + PI / 4.0).sin()
}

fn zero_noise_run(seed: i64) -> resonode::core::engine::SimulationRun {
    generate_seeded(&RunParams {
        duration: 50.0,
        noise: 0.0,
        threshold: -1.0,
        seed,
    })
    .unwrap()
}

#[test]
fn zero_noise_nodes_match_analytic_crossings() {
    let run = zero_noise_run(1);
    let steps = run.samples.len();
    assert_eq!(steps, 5000);

    let mut predicted = Vec::new();
    for i in 0..steps {
        let t = 50.0 * (i as f64 / (steps - 1) as f64);
        let (e, p) = (analytic_energy(t), analytic_phase(t));
        let raw = run.samples[i].point();
        assert!((raw.raw_energy - e).abs() < 1e-12, "energy drift at {i}");
        assert!((raw.raw_phase - p).abs() < 1e-12, "phase drift at {i}");
        if round3(e) == round3(p) {
            predicted.push(i);
        }
    }

    let flagged: Vec<usize> = run
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_node())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flagged, predicted);
    assert_eq!(flagged, vec![2822]);

    let node = &run.nodes()[0];
    assert_eq!(node.time, 28.23);
    assert_eq!(node.energy, -0.791);
    assert_eq!(node.phase, -0.791);
    assert_eq!(node.characteristic, Characteristic::StrongHighEnergyLowNoise);
}

#[test]
fn zero_noise_run_ignores_seed() {
    let a = zero_noise_run(1);
    let b = zero_noise_run(987_654);
    assert_eq!(a.samples, b.samples);
}
