//! Aggregation over many runs: batch statistics and parameter search.

pub mod batch;
pub mod density;
pub mod search;
pub mod stats;
