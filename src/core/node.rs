//! Resonance node rule.
//!
//! Threshold tests run on the raw channel values; the equality test runs on
//! the 3-decimal display values. Rounding never relaxes the threshold test.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::core::round::round3;

/// Qualitative label attached to every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Characteristic {
    StrongHighEnergyLowNoise,
    HighEnergy,
    LowNoise,
    Standard,
}

impl Characteristic {
    pub fn label(self) -> &'static str {
        match self {
            Self::StrongHighEnergyLowNoise => "strong high-energy node, low noise",
            Self::HighEnergy => "high-energy node",
            Self::LowNoise => "low-noise node",
            Self::Standard => "standard resonance node",
        }
    }

    /// Priority-ordered label table; first match wins.
    pub fn for_node(value: f64, threshold: f64, noise: f64) -> Self {
        if value > threshold * 1.8 && noise < 0.25 {
            Self::StrongHighEnergyLowNoise
        } else if value > threshold * 1.5 {
            Self::HighEnergy
        } else if noise < 0.2 {
            Self::LowNoise
        } else {
            Self::Standard
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Characteristic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Returns the label if the raw pair qualifies as a node.
pub fn classify(
    raw_energy: f64,
    raw_phase: f64,
    threshold: f64,
    noise: f64,
) -> Option<Characteristic> {
    if !(raw_energy > threshold && raw_phase > threshold) {
        return None;
    }
    let e3 = round3(raw_energy);
    let p3 = round3(raw_phase);
    if e3 != p3 {
        return None;
    }
    Some(Characteristic::for_node(e3, threshold, noise))
}
