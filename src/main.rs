use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use forcelayout::{LayoutSnapshot, Scenario, Ticks};

/// Force-directed graph layout from the command line.
#[derive(Parser)]
#[command(name = "forcelayout")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and write the resulting layout as JSON
    Run {
        /// Scenario file (.yaml, .yml or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output layout file
        #[arg(short, long, default_value = "layout.json")]
        output: PathBuf,

        /// Run exactly this many ticks instead of until stable
        #[arg(short, long)]
        ticks: Option<usize>,
    },
    /// Write a starter scenario built around a generated graph
    Generate {
        /// Graph generator
        #[arg(short, long, value_enum)]
        kind: GraphKind,

        /// Lattice width or ring segment count
        #[arg(short, long, default_value = "10")]
        size: usize,

        /// Output scenario file (.yaml, .yml or .json)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GraphKind {
    Lattice,
    Ring,
}

fn run(input: &Path, output: &Path, ticks: Option<usize>) -> anyhow::Result<()> {
    let scenario = Scenario::load(input)?;
    let mut simulation = scenario.build()?;
    let duration = ticks.map(Ticks::Iterations).unwrap_or(scenario.duration());

    let ran = simulation.run(duration, None);
    let snapshot = LayoutSnapshot::from_simulation(&simulation, ran);
    snapshot.write(output)?;

    info!(
        nodes = simulation.node_count(),
        ticks = ran,
        alpha = simulation.alpha(),
        "Wrote layout to {}",
        output.display()
    );
    Ok(())
}

fn generate(kind: GraphKind, size: usize, output: &Path) -> anyhow::Result<()> {
    let scenario = match kind {
        GraphKind::Lattice => Scenario::lattice(size),
        GraphKind::Ring => Scenario::ring(size),
    };
    scenario.save(output)?;
    info!(?kind, size, "Wrote scenario to {}", output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            output,
            ticks,
        } => run(&input, &output, ticks)?,
        Commands::Generate { kind, size, output } => generate(kind, size, &output)?,
    }

    Ok(())
}
