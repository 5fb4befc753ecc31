use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tilefuse_core::placement::place_tiles;
use tilefuse_core::project::Project;

#[derive(Args)]
pub struct PlaceArgs {
    /// Project file
    pub project: PathBuf,
}

pub fn run(args: &PlaceArgs) -> Result<()> {
    let mut project = Project::load(&args.project)
        .with_context(|| format!("cannot load {}", args.project.display()))?;

    let mut grid = project.build_grid()?;
    let graph = project.build_graph()?;

    let outcome = place_tiles(&mut grid, &graph)?;
    println!(
        "Placed {} tiles from source ({},{})",
        grid.n_rows() * grid.n_cols(),
        outcome.source.0,
        outcome.source.1
    );
    if outcome.unreliable_steps > 0 {
        println!(
            "  warning: {} chain steps crossed unreliable edges",
            outcome.unreliable_steps
        );
    }
    if outcome.non_stitchable_routes > 0 {
        println!(
            "  warning: {} chain steps routed through non-stitchable tiles",
            outcome.non_stitchable_routes
        );
    }

    project.sync(&grid, &graph);
    project.save(&args.project)?;
    Ok(())
}
