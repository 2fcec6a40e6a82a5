//! Driftmind CLI
//!
//! Command-line interface for the emergent-dimensional reasoning engine.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use directories::ProjectDirs;
use driftmind_core::{snapshot, Engine, Mode};

/// Driftmind - Emergent-Dimensional Reasoning Engine CLI
#[derive(Parser)]
#[command(name = "driftmind")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Driftmind reasoning engine")]
struct Cli {
    /// Path to the state snapshot file (default: platform data dir)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Teach the engine a sentence, growing the concept graph
    Learn {
        /// Sentence to ingest
        text: String,
    },

    /// Ask a question; runs one full reasoning cycle
    Reason {
        /// Query text
        text: String,
        /// Reasoning mode
        #[arg(long, value_enum, default_value = "balanced")]
        mode: ModeArg,
    },

    /// Show engine metrics: graph size, active dimensions, chemistry stats
    Stats,

    /// Update one evolution parameter (alpha, beta, lambda, tau, rollout_horizon, rollout_branches)
    SetParam {
        name: String,
        value: f32,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Balanced,
    Exploration,
    Exploitation,
    Accuracy,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Balanced => Mode::Balanced,
            ModeArg::Exploration => Mode::Exploration,
            ModeArg::Exploitation => Mode::Exploitation,
            ModeArg::Accuracy => Mode::Accuracy,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp || e.kind() == clap::error::ErrorKind::DisplayVersion => {
            print!("{e}");
            return ExitCode::from(0);
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };
    let state_path = cli.state.clone().unwrap_or_else(default_state_path);

    match run(&cli.command, &state_path) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn default_state_path() -> PathBuf {
    ProjectDirs::from("dev", "driftmind", "driftmind")
        .map(|dirs| dirs.data_dir().join("state.json"))
        .unwrap_or_else(|| PathBuf::from("driftmind-state.json"))
}

fn load_engine(path: &PathBuf) -> anyhow::Result<Engine> {
    if !path.exists() {
        return Ok(Engine::new());
    }
    let data = fs::read_to_string(path)?;
    Ok(snapshot::import(&data)?)
}

fn save_engine(path: &PathBuf, engine: &Engine) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let data = snapshot::export(engine)?;
    fs::write(path, data)?;
    Ok(())
}

fn run(command: &Commands, state_path: &PathBuf) -> anyhow::Result<()> {
    match command {
        Commands::Learn { text } => {
            let mut engine = load_engine(state_path)?;
            engine.learn(text);
            save_engine(state_path, &engine)?;
            println!("{} {}", "learned:".green().bold(), text);
            println!("{}: {}", "nodes".white().bold(), engine.node_count());
        }
        Commands::Reason { text, mode } => {
            let mut engine = load_engine(state_path)?;
            let reply = engine.answer(text, (*mode).into())?;
            save_engine(state_path, &engine)?;
            println!("{}", reply);
        }
        Commands::Stats => {
            let engine = load_engine(state_path)?;
            let m = engine.get_metrics();
            println!("{}", "=== Driftmind Stats ===".cyan().bold());
            println!("{}: {}", "Nodes".white().bold(), m.node_count);
            println!("{}: {}", "Edges".white().bold(), m.edge_count);
            println!("{}: {}", "Active dimensions".white().bold(), m.active_dimensions);
            println!("{}: {:.3}", "Promotion threshold".white().bold(), m.promotion_threshold);
            println!("{}: {:.3}", "Learning rate".white().bold(), m.learning_rate);
            println!("{}: {:.3}", "Baseline fitness".white().bold(), m.baseline_fitness);
            println!("{}: {:.3}", "Mean conductivity".white().bold(), m.chemistry_stats.mean_conductivity);
            println!("{}: {:.3}", "Mean affinity".white().bold(), m.chemistry_stats.mean_affinity);
            println!("{}: {:.3}", "Mean stability".white().bold(), m.chemistry_stats.mean_stability);
            println!("{}: {}", "Leap edges".white().bold(), m.chemistry_stats.leap_edges);
            if m.degraded {
                println!("{}", "DEGRADED — call reset before further use".red().bold());
            }
        }
        Commands::SetParam { name, value } => {
            let mut engine = load_engine(state_path)?;
            engine.set_evolution_param(name, *value)?;
            save_engine(state_path, &engine)?;
            println!("{} {} = {}", "set:".green().bold(), name, value);
        }
    }
    Ok(())
}
