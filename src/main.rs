//! Entry point: resolves config + flags, runs one command, prints JSON.
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use resonode::analysis::batch::{draw_seeds, run_batch_with_seeds, run_riemann_batch_with_seeds};
use resonode::analysis::search::search_with;
use resonode::cli::{Args, Command, SimArgs};
use resonode::config::{AppConfig, SimulationConfig};
use resonode::core::engine::generate_seeded;

fn apply_sim_args(sim: &mut SimulationConfig, args: &SimArgs) {
    if let Some(d) = args.duration {
        sim.duration = d;
    }
    if let Some(n) = args.noise {
        sim.noise = n;
    }
    if let Some(t) = args.threshold {
        sim.threshold = t;
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{text}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = AppConfig::load_or_default(&args.config);
    if let Some(workers) = args.workers {
        cfg.batch.workers = workers;
    }

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_for_ctrlc = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_for_ctrlc.store(true, Ordering::SeqCst);
    })
    .context("set Ctrl-C handler")?;
    let stop: &AtomicBool = &stop_flag;

    match &args.command {
        Command::Generate {
            sim,
            seed,
            nodes_only,
        } => {
            apply_sim_args(&mut cfg.simulation, sim);
            if let Some(seed) = seed {
                cfg.simulation.seed = *seed;
            }
            let run = generate_seeded(&cfg.simulation.run_params())?;
            info!(
                samples = run.samples.len(),
                nodes = run.node_count(),
                "run generated"
            );
            if *nodes_only {
                print_json(&run.nodes())?;
            } else {
                print_json(&run)?;
            }
        }
        Command::Batch { sim, runs } => {
            apply_sim_args(&mut cfg.simulation, sim);
            let runs = runs.unwrap_or(cfg.batch.runs);
            let seeds = draw_seeds(&mut rand::rng(), runs);
            let spec = cfg.batch.batch_spec(&cfg.simulation);
            let result = run_batch_with_seeds(&spec, &seeds, Some(stop))?;
            print_json(&result)?;
        }
        Command::Riemann {
            sim,
            runs,
            scaling_factor,
            no_grid,
        } => {
            apply_sim_args(&mut cfg.simulation, sim);
            if let Some(s) = scaling_factor {
                cfg.batch.scaling_factor = *s;
            }
            if *no_grid {
                cfg.batch.density_grid = false;
            }
            let runs = runs.unwrap_or(cfg.batch.runs);
            let seeds = draw_seeds(&mut rand::rng(), runs);
            let spec = cfg.batch.batch_spec(&cfg.simulation);
            let result = run_riemann_batch_with_seeds(
                &spec,
                &cfg.batch.riemann_spec(),
                &seeds,
                Some(stop),
            )?;
            print_json(&result)?;
        }
        Command::Search {
            duration,
            max_attempts,
        } => {
            let duration = duration.unwrap_or(cfg.simulation.duration);
            let max_attempts = max_attempts.unwrap_or(cfg.search.max_attempts);
            let outcome = search_with(
                &cfg.search.space(),
                duration,
                max_attempts,
                &mut rand::rng(),
            )?;
            print_json(&outcome)?;
        }
    }
    Ok(())
}
