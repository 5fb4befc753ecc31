use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tilefuse_core::project::Project;

use crate::summary;

#[derive(Args)]
pub struct InfoArgs {
    /// Project file
    pub project: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let project = Project::load(&args.project)
        .with_context(|| format!("cannot load {}", args.project.display()))?;
    summary::print_project_summary(&project);
    summary::print_project_state(&project);
    Ok(())
}
