use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tilefuse_core::merge::{merge_tiles, MergeConfig, SliceFormat};
use tilefuse_core::pipeline::run_stitch_reported;
use tilefuse_core::project::Project;

use super::progress::BarReporter;
use crate::summary;

#[derive(Args)]
pub struct RunArgs {
    /// Project file
    pub project: PathBuf,

    /// Stitch config file (TOML) overriding the project parameters
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Blend the placed tiles into an output volume afterwards
    #[arg(long)]
    pub merge: bool,

    /// Output directory for the merged volume
    #[arg(short, long, default_value = "stitched")]
    pub output: PathBuf,

    /// Number of resolution levels for the merged volume
    #[arg(long, default_value_t = 1)]
    pub resolutions: usize,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let mut project = Project::load(&args.project)
        .with_context(|| format!("cannot load {}", args.project.display()))?;

    if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        project.params = toml::from_str(&contents).context("Invalid stitch config")?;
    }

    summary::print_project_summary(&project);

    let mut grid = project.build_grid()?;
    let project_dir = args.project.parent().unwrap_or_else(|| Path::new("."));
    let tiles = project.open_tiles(project_dir)?;

    let reporter = Arc::new(BarReporter::new());
    let cancel = AtomicBool::new(false);
    let (graph, report) =
        run_stitch_reported(&mut grid, &tiles, &project.params, reporter, &cancel)?;

    project.failures = report.failures.clone();
    project.sync(&grid, &graph);
    project.save(&args.project)?;

    summary::print_stitch_report(&report);

    if args.merge {
        let config = MergeConfig {
            output_dir: args.output.clone(),
            resolutions: args.resolutions,
            format: SliceFormat::Tiff,
        };
        merge_tiles(&grid, &tiles, &config, |_| {})?;
        println!("\nMerged volume written to {}", args.output.display());
    }

    Ok(())
}
