//! Seeded two-channel wave simulation with resonance node detection.
//!
//! `core` holds the deterministic engine (generator, synthesis, node rule);
//! `analysis` runs the engine over many seeds and searches for parameters
//! that produce nodes.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use error::{ResonodeError, Result};
