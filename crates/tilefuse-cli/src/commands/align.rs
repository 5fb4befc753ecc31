use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Args;
use tilefuse_core::pairwise::{compute_displacements, pair_count};
use tilefuse_core::project::Project;

use super::progress::phase_bar;

#[derive(Args)]
pub struct AlignArgs {
    /// Project file
    pub project: PathBuf,

    /// Override the number of slices per D-chunk
    #[arg(long)]
    pub subvol: Option<usize>,

    /// First grid row to process (inclusive)
    #[arg(long)]
    pub start_row: Option<usize>,

    /// Last grid row to process (inclusive)
    #[arg(long)]
    pub end_row: Option<usize>,

    /// First grid column to process (inclusive)
    #[arg(long)]
    pub start_col: Option<usize>,

    /// Last grid column to process (inclusive)
    #[arg(long)]
    pub end_col: Option<usize>,
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let mut project = Project::load(&args.project)
        .with_context(|| format!("cannot load {}", args.project.display()))?;

    if let Some(subvol) = args.subvol {
        project.params.subvol_dim_d = subvol;
    }
    project.params.start_row = args.start_row.or(project.params.start_row);
    project.params.end_row = args.end_row.or(project.params.end_row);
    project.params.start_col = args.start_col.or(project.params.start_col);
    project.params.end_col = args.end_col.or(project.params.end_col);

    let grid = project.build_grid()?;
    let mut graph = project.build_graph()?;
    let project_dir = args.project.parent().unwrap_or_else(|| Path::new("."));
    let tiles = project.open_tiles(project_dir)?;

    let pairs = pair_count(&grid, &project.params);
    let pb = phase_bar("Correlating tile pairs", pairs);
    let cancel = AtomicBool::new(false);
    let failures = compute_displacements(
        &grid,
        &tiles,
        &mut graph,
        &project.params,
        &cancel,
        |done| pb.set_position(done as u64),
    )?;
    pb.finish_and_clear();

    let candidates: usize = graph
        .edge_ids()
        .filter_map(|id| graph.edge(id))
        .map(|e| e.candidates.len())
        .sum();
    println!(
        "Correlated {pairs} pairs: {candidates} candidates, {} failed chunks",
        failures.len()
    );

    project.failures = failures;
    project.sync(&grid, &graph);
    project.save(&args.project)?;
    Ok(())
}
