//! Deterministic engine: generator, wave synthesis and the node rule.

pub mod engine;
pub mod node;
pub mod rng;
pub mod round;
