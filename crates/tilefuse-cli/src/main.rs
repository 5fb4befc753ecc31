mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tilefuse", about = "Grid stitching for tiled 3D microscopy volumes")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a project file from a directory of raw tiles
    Import(commands::import::ImportArgs),
    /// Show project metadata and stitching state
    Info(commands::info::InfoArgs),
    /// Print a default stitch configuration as TOML
    Config,
    /// Compute pairwise displacements for adjacent tile pairs
    Align(commands::align::AlignArgs),
    /// Project candidate displacements and mark stitchable tiles
    Threshold(commands::threshold::ThresholdArgs),
    /// Assign absolute tile coordinates over the displacement MST
    Place(commands::place::PlaceArgs),
    /// Blend placed tiles into a multi-resolution output
    Merge(commands::merge::MergeArgs),
    /// Run the full stitching pipeline
    Run(commands::pipeline::RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Import(args) => commands::import::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config => commands::config::run(),
        Commands::Align(args) => commands::align::run(args),
        Commands::Threshold(args) => commands::threshold::run(args),
        Commands::Place(args) => commands::place::run(args),
        Commands::Merge(args) => commands::merge::run(args),
        Commands::Run(args) => commands::pipeline::run(args),
    }
}
