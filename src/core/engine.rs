//! Two-channel wave synthesis with embedded node detection.
//!
//! Every run is a pure function of `(duration, noise, threshold, seed)`.
//! Normal draws are consumed strictly in the order energy(t0), phase(t0),
//! energy(t1), phase(t1), ... and are drawn even when `noise == 0`, so the
//! draw order never depends on the noise level.

use std::f64::consts::{FRAC_PI_4, TAU};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::node::{Characteristic, classify};
use crate::core::rng::SeededRandom;
use crate::core::round::{round2, round3};
use crate::error::{
    ResonodeError, Result, require_finite, require_non_negative, require_positive,
};

pub const ENERGY_FREQ_HZ: f64 = 0.2;
pub const PHASE_FREQ_HZ: f64 = 0.203;
pub const PHASE_OFFSET: f64 = FRAC_PI_4;
pub const SAMPLES_PER_SEC: f64 = 100.0;
pub const MIN_STEPS: usize = 10;
/// Largest run the engine will allocate; `MAX_STEPS / SAMPLES_PER_SEC` seconds.
pub const MAX_STEPS: usize = 1_000_000;

/// Inputs of a single reproducible run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub duration: f64,
    pub noise: f64,
    pub threshold: f64,
    pub seed: i64,
}

impl RunParams {
    pub fn validate(&self) -> Result<()> {
        validate_inputs(self.duration, self.noise, self.threshold)
    }
}

pub(crate) fn validate_inputs(duration: f64, noise: f64, threshold: f64) -> Result<()> {
    require_positive("duration", duration)?;
    if (duration * SAMPLES_PER_SEC).floor() > MAX_STEPS as f64 {
        return Err(ResonodeError::invalid(
            "duration",
            duration,
            "exceeds maximum sample count",
        ));
    }
    require_non_negative("noise", noise)?;
    require_finite("threshold", threshold)?;
    Ok(())
}

/// One point of the series before node classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePoint {
    pub time: f64,
    pub energy: f64,
    pub phase: f64,
    pub raw_energy: f64,
    pub raw_phase: f64,
}

/// A sample that passed the node rule. Only built by the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSample {
    point: SamplePoint,
    characteristic: Characteristic,
}

impl NodeSample {
    pub fn point(&self) -> &SamplePoint {
        &self.point
    }

    /// Node value; equal to both rounded channels.
    pub fn value(&self) -> f64 {
        self.point.energy
    }

    pub fn characteristic(&self) -> Characteristic {
        self.characteristic
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(into = "SampleRecord")]
pub enum Sample {
    Plain(SamplePoint),
    Node(NodeSample),
}

impl Sample {
    pub fn point(&self) -> &SamplePoint {
        match self {
            Self::Plain(point) => point,
            Self::Node(node) => &node.point,
        }
    }

    pub fn time(&self) -> f64 {
        self.point().time
    }

    pub fn node(&self) -> Option<f64> {
        self.as_node().map(NodeSample::value)
    }

    pub fn characteristic(&self) -> Option<Characteristic> {
        self.as_node().map(NodeSample::characteristic)
    }

    pub fn as_node(&self) -> Option<&NodeSample> {
        match self {
            Self::Plain(_) => None,
            Self::Node(node) => Some(node),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

/// Flat wire shape handed to the presentation layer.
#[derive(Serialize)]
struct SampleRecord {
    time: f64,
    energy: f64,
    phase: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    characteristic: Option<Characteristic>,
}

impl From<Sample> for SampleRecord {
    fn from(sample: Sample) -> Self {
        let p = sample.point();
        Self {
            time: p.time,
            energy: p.energy,
            phase: p.phase,
            node: sample.node(),
            characteristic: sample.characteristic(),
        }
    }
}

/// Reduced view over a node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NodeRecord {
    pub time: f64,
    pub energy: f64,
    pub phase: f64,
    pub characteristic: Characteristic,
}

impl From<&NodeSample> for NodeRecord {
    fn from(node: &NodeSample) -> Self {
        Self {
            time: node.point.time,
            energy: node.point.energy,
            phase: node.point.phase,
            characteristic: node.characteristic,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationRun {
    pub params: RunParams,
    pub samples: Vec<Sample>,
}

impl SimulationRun {
    pub fn nodes(&self) -> Vec<NodeRecord> {
        self.samples
            .iter()
            .filter_map(Sample::as_node)
            .map(NodeRecord::from)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_node()).count()
    }
}

/// Sample count for a validated `duration`.
pub fn step_count(duration: f64) -> usize {
    ((duration * SAMPLES_PER_SEC).floor() as usize).max(MIN_STEPS)
}

/// Time of sample `i` out of `steps`, spanning `[0, duration]` inclusive.
pub fn time_at(i: usize, steps: usize, duration: f64) -> f64 {
    if steps <= 1 {
        return 0.0;
    }
    duration * (i as f64 / (steps - 1) as f64)
}

pub fn energy_carrier(t: f64) -> f64 {
    (TAU * ENERGY_FREQ_HZ * t).sin()
}

pub fn phase_carrier(t: f64) -> f64 {
    (TAU * PHASE_FREQ_HZ * t + PHASE_OFFSET).sin()
}

/// Generate one run, drawing noise from the caller's generator.
pub fn generate(
    duration: f64,
    noise: f64,
    threshold: f64,
    rng: &mut SeededRandom,
) -> Result<Vec<Sample>> {
    validate_inputs(duration, noise, threshold)?;
    let steps = step_count(duration);
    let mut samples = Vec::with_capacity(steps);
    for i in 0..steps {
        let t = time_at(i, steps, duration);
        let raw_energy = energy_carrier(t) + noise * rng.next_normal();
        let raw_phase = phase_carrier(t) + noise * rng.next_normal();
        let point = SamplePoint {
            time: round2(t),
            energy: round3(raw_energy),
            phase: round3(raw_phase),
            raw_energy,
            raw_phase,
        };
        let sample = match classify(raw_energy, raw_phase, threshold, noise) {
            Some(characteristic) => Sample::Node(NodeSample {
                point,
                characteristic,
            }),
            None => Sample::Plain(point),
        };
        samples.push(sample);
    }
    Ok(samples)
}

/// Generate one run from an explicit seed.
pub fn generate_seeded(params: &RunParams) -> Result<SimulationRun> {
    let mut rng = SeededRandom::new(params.seed);
    let samples = generate(params.duration, params.noise, params.threshold, &mut rng)?;
    let run = SimulationRun {
        params: *params,
        samples,
    };
    debug!(
        seed = params.seed,
        steps = run.samples.len(),
        nodes = run.node_count(),
        "generated run"
    );
    Ok(run)
}
