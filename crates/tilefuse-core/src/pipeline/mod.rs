pub mod config;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;

use crate::consensus::{mark_stitchable, project_displacements};
use crate::error::Result;
use crate::graph::DisplacementGraph;
use crate::grid::VolumeGrid;
use crate::io::SlabSource;
use crate::pairwise::{compute_displacements, PairFailure};
use crate::placement::{place_tiles, PlacementOutcome};

use self::config::StitchConfig;

/// Pipeline phase, used for progress reporting.
#[derive(Clone, Debug)]
pub enum PipelineStage {
    PairwiseAlignment,
    Projection,
    Placement,
    Merging,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PairwiseAlignment => write!(f, "Correlating tile pairs"),
            Self::Projection => write!(f, "Projecting displacements"),
            Self::Placement => write!(f, "Placing tiles"),
            Self::Merging => write!(f, "Merging tiles"),
        }
    }
}

/// Callback surface for observing pipeline progress.
///
/// The pairwise phase invokes it from rayon workers, hence the `Send + Sync`
/// bound. Every hook defaults to doing nothing, so a front-end overrides
/// only what it renders.
pub trait ProgressReporter: Send + Sync {
    /// A stage is about to run. `total_items` carries its work-item count
    /// when that is known up front (tile pairs, output slices).
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Running count of work items completed within the current stage.
    fn advance(&self, _items_done: usize) {}

    /// The current stage has run to completion.
    fn finish_stage(&self) {}
}

/// Reporter that swallows every progress event.
struct SilentReporter;
impl ProgressReporter for SilentReporter {}

/// Summary of one full stitching run.
#[derive(Clone, Debug)]
pub struct StitchReport {
    pub pairs: usize,
    pub candidates: usize,
    pub stitchable_tiles: usize,
    pub placement: PlacementOutcome,
    pub failures: Vec<PairFailure>,
}

/// Run the phase-sequential pipeline: pairwise correlation, projection and
/// thresholding, MST placement. Absolute coordinates are written back into
/// the grid; the graph and a run summary are returned.
pub fn run_stitch_reported<S: SlabSource>(
    grid: &mut VolumeGrid,
    tiles: &[S],
    config: &StitchConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: &AtomicBool,
) -> Result<(DisplacementGraph, StitchReport)> {
    let mut graph = DisplacementGraph::new(grid.n_rows(), grid.n_cols());

    let pairs = crate::pairwise::pair_count(grid, config);
    info!(
        rows = grid.n_rows(),
        cols = grid.n_cols(),
        pairs,
        "Starting stitching pipeline"
    );

    reporter.begin_stage(PipelineStage::PairwiseAlignment, Some(pairs));
    let r = reporter.clone();
    let failures = compute_displacements(grid, tiles, &mut graph, config, cancel, move |done| {
        r.advance(done);
    })?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Projection, None);
    let inf_w = config
        .ncc
        .clone()
        .clamped_to_search(config.search_radii())
        .inf_width();
    project_displacements(&mut graph, config.reliability_threshold, inf_w);
    let stitchable_tiles = mark_stitchable(grid, &graph, config.reliability_threshold);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Placement, None);
    let placement = place_tiles(grid, &graph)?;
    reporter.finish_stage();

    let candidates = graph
        .edge_ids()
        .filter_map(|id| graph.edge(id))
        .map(|e| e.candidates.len())
        .sum();

    Ok((
        graph,
        StitchReport {
            pairs,
            candidates,
            stitchable_tiles,
            placement,
            failures,
        },
    ))
}

/// Run the full pipeline without progress feedback.
pub fn run_stitch<S: SlabSource>(
    grid: &mut VolumeGrid,
    tiles: &[S],
    config: &StitchConfig,
    cancel: &AtomicBool,
) -> Result<(DisplacementGraph, StitchReport)> {
    run_stitch_reported(grid, tiles, config, Arc::new(SilentReporter), cancel)
}
