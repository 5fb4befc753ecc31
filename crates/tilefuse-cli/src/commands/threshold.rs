use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tilefuse_core::consensus::{mark_stitchable, project_displacements};
use tilefuse_core::project::Project;

#[derive(Args)]
pub struct ThresholdArgs {
    /// Project file
    pub project: PathBuf,

    /// Override the reliability threshold
    #[arg(long)]
    pub threshold: Option<f32>,
}

pub fn run(args: &ThresholdArgs) -> Result<()> {
    let mut project = Project::load(&args.project)
        .with_context(|| format!("cannot load {}", args.project.display()))?;
    if let Some(threshold) = args.threshold {
        project.params.reliability_threshold = threshold;
    }

    let mut grid = project.build_grid()?;
    let mut graph = project.build_graph()?;

    let inf_w = project
        .params
        .ncc
        .clone()
        .clamped_to_search(project.params.search_radii())
        .inf_width();
    project_displacements(&mut graph, project.params.reliability_threshold, inf_w);
    let stitchable = mark_stitchable(&mut grid, &graph, project.params.reliability_threshold);

    println!(
        "Projected {} edges; {stitchable}/{} tiles stitchable at threshold {}",
        graph.edge_ids().count(),
        grid.n_rows() * grid.n_cols(),
        project.params.reliability_threshold
    );

    project.sync(&grid, &graph);
    project.save(&args.project)?;
    Ok(())
}
