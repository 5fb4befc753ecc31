use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::ProgressBar;
use tilefuse_core::merge::{merge_tiles, MergeConfig, SliceFormat};
use tilefuse_core::project::Project;

#[derive(Clone, ValueEnum)]
pub enum FormatArg {
    Tiff,
    Png,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Project file
    pub project: PathBuf,

    /// Output directory for the resolution pyramid
    #[arg(short, long, default_value = "stitched")]
    pub output: PathBuf,

    /// Number of resolution levels to export
    #[arg(long, default_value_t = 1)]
    pub resolutions: usize,

    /// Slice image format
    #[arg(long, value_enum, default_value = "tiff")]
    pub format: FormatArg,
}

pub fn run(args: &MergeArgs) -> Result<()> {
    let project = Project::load(&args.project)
        .with_context(|| format!("cannot load {}", args.project.display()))?;

    let grid = project.build_grid()?;
    let project_dir = args.project.parent().unwrap_or_else(|| Path::new("."));
    let tiles = project.open_tiles(project_dir)?;

    let config = MergeConfig {
        output_dir: args.output.clone(),
        resolutions: args.resolutions,
        format: match args.format {
            FormatArg::Tiff => SliceFormat::Tiff,
            FormatArg::Png => SliceFormat::Png,
        },
    };

    let pb = ProgressBar::new_spinner();
    pb.set_message("Merging tiles");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    merge_tiles(&grid, &tiles, &config, |done| {
        pb.set_position(done as u64);
    })?;
    pb.finish_and_clear();

    println!(
        "Merged volume written to {} ({} resolution level(s))",
        args.output.display(),
        args.resolutions.max(1)
    );
    Ok(())
}
