//! Command-line surface: global flags plus one subcommand per operation.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, global = true, default_value = "resonode.toml")]
    pub config: String,

    /// Worker threads for batch runs (overrides config)
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// Simulation inputs; unset values come from the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SimArgs {
    /// Run length in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Noise factor applied to both channels
    #[arg(long)]
    pub noise: Option<f64>,

    /// Node threshold on the raw channel values
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate one reproducible run
    Generate {
        #[command(flatten)]
        sim: SimArgs,

        /// Generator seed
        #[arg(long, allow_negative_numbers = true)]
        seed: Option<i64>,

        /// Print only the detected nodes
        #[arg(long, default_value_t = false)]
        nodes_only: bool,
    },
    /// Aggregate node counts over independently seeded runs
    Batch {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of runs
        #[arg(long)]
        runs: Option<usize>,
    },
    /// Batch with per-node scalar statistics and density grid
    Riemann {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of runs
        #[arg(long)]
        runs: Option<usize>,

        /// Scaling applied to the relative energy excess
        #[arg(long, allow_negative_numbers = true)]
        scaling_factor: Option<f64>,

        /// Skip the (scalar, time) density grid
        #[arg(long, default_value_t = false)]
        no_grid: bool,
    },
    /// Search random parameters until a run produces a node
    Search {
        /// Run length in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Attempt budget
        #[arg(long)]
        max_attempts: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_negative_threshold() {
        let args = Args::try_parse_from([
            "resonode",
            "generate",
            "--duration",
            "50",
            "--threshold",
            "-1",
            "--seed",
            "3",
            "--nodes-only",
        ])
        .unwrap();
        assert_eq!(args.config, "resonode.toml");
        match args.command {
            Command::Generate {
                sim,
                seed,
                nodes_only,
            } => {
                assert_eq!(sim.duration, Some(50.0));
                assert_eq!(sim.threshold, Some(-1.0));
                assert_eq!(sim.noise, None);
                assert_eq!(seed, Some(3));
                assert!(nodes_only);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args =
            Args::try_parse_from(["resonode", "riemann", "--runs", "8", "--workers", "4", "--no-grid"])
                .unwrap();
        assert_eq!(args.workers, Some(4));
        assert!(matches!(
            args.command,
            Command::Riemann {
                runs: Some(8),
                no_grid: true,
                ..
            }
        ));
    }
}
