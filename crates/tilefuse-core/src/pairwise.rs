//! Pairwise displacement computation over the tile grid.
//!
//! Every N-S and W-E adjacency inside the processing window is correlated
//! chunk by chunk along D. Pairs are independent: workers read their own
//! slabs, correlate, and hand back candidates that are merged into the graph
//! in a fixed edge order, so results do not depend on the worker count.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ndarray::Array3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::PARALLEL_PAIR_THRESHOLD;
use crate::error::{Result, StitchError};
use crate::graph::{CandidateDisplacement, DisplacementGraph, EdgeId};
use crate::grid::{EdgeKind, VolumeGrid};
use crate::io::SlabSource;
use crate::mipncc::{correlate, NccParams};
use crate::pipeline::config::StitchConfig;

/// Record of a pair chunk that failed to correlate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairFailure {
    pub kind: EdgeKind,
    pub row: usize,
    pub col: usize,
    pub chunk: usize,
    pub message: String,
}

/// Correlate every adjacent pair in the window and append the resulting
/// candidates to the graph. Returns the failure log; a failing chunk leaves
/// no candidate behind but never aborts the run.
pub fn compute_displacements<S, F>(
    grid: &VolumeGrid,
    tiles: &[S],
    graph: &mut DisplacementGraph,
    config: &StitchConfig,
    cancel: &AtomicBool,
    on_pair_done: F,
) -> Result<Vec<PairFailure>>
where
    S: SlabSource,
    F: Fn(usize) + Send + Sync,
{
    let expected = grid.n_rows() * grid.n_cols();
    if tiles.len() != expected {
        return Err(StitchError::InconsistentTopology(format!(
            "expected {expected} tile sources, got {}",
            tiles.len()
        )));
    }
    for (i, tile) in tiles.iter().enumerate() {
        if tile.shape() != grid.shape() {
            return Err(StitchError::InconsistentTopology(format!(
                "tile source {i} has shape {:?}, grid expects {:?}",
                tile.shape(),
                grid.shape()
            )));
        }
    }

    let pairs = enumerate_pairs(grid, config);
    let params = config.ncc.clone().clamped_to_search(config.search_radii());
    info!(pairs = pairs.len(), "Computing pairwise displacements");

    let counter = AtomicUsize::new(0);
    let process = |id: &EdgeId| {
        if cancel.load(Ordering::Relaxed) {
            return (*id, Vec::new(), Vec::new());
        }
        let out = correlate_pair(grid, tiles, *id, config, &params);
        let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
        on_pair_done(done);
        out
    };

    let results: Vec<(EdgeId, Vec<CandidateDisplacement>, Vec<PairFailure>)> =
        if pairs.len() >= PARALLEL_PAIR_THRESHOLD {
            pairs.par_iter().map(process).collect()
        } else {
            pairs.iter().map(process).collect()
        };

    let mut failures = Vec::new();
    for (id, candidates, mut fails) in results {
        if !candidates.is_empty() {
            graph.append_candidates(id, candidates)?;
        }
        failures.append(&mut fails);
    }

    if !failures.is_empty() {
        warn!(failed = failures.len(), "Some pair chunks failed to correlate");
    }
    Ok(failures)
}

/// Number of adjacent pairs inside the configured processing window.
pub fn pair_count(grid: &VolumeGrid, config: &StitchConfig) -> usize {
    enumerate_pairs(grid, config).len()
}

/// Adjacent pairs inside the processing window, in fixed row-major order.
fn enumerate_pairs(grid: &VolumeGrid, config: &StitchConfig) -> Vec<EdgeId> {
    let (r0, r1) = config.row_window(grid.n_rows());
    let (c0, c1) = config.col_window(grid.n_cols());

    let mut pairs = Vec::new();
    for r in r0..=r1 {
        for c in c0..=c1 {
            if r + 1 <= r1 {
                pairs.push(EdgeId::north_south(r, c));
            }
            if c + 1 <= c1 {
                pairs.push(EdgeId::west_east(r, c));
            }
        }
    }
    pairs
}

/// Partition `depth` into chunks of `subvol` slices. A trailing runt is
/// folded into the preceding chunk so every chunk satisfies the engine's
/// minimum-extent precondition.
pub fn chunk_bounds(depth: usize, subvol: usize) -> Vec<(usize, usize)> {
    let subvol = subvol.max(1);
    let mut bounds = Vec::new();
    let mut d0 = 0;
    while d0 < depth {
        bounds.push((d0, (d0 + subvol).min(depth)));
        d0 += subvol;
    }
    if bounds.len() > 1 {
        let (last0, last1) = bounds[bounds.len() - 1];
        if last1 - last0 < subvol {
            let n = bounds.len();
            bounds[n - 2].1 = last1;
            bounds.pop();
        }
    }
    bounds
}

fn correlate_pair<S: SlabSource>(
    grid: &VolumeGrid,
    tiles: &[S],
    id: EdgeId,
    config: &StitchConfig,
    params: &NccParams,
) -> (EdgeId, Vec<CandidateDisplacement>, Vec<PairFailure>) {
    let (r2, c2) = id.second();
    let first = &tiles[id.row * grid.n_cols() + id.col];
    let second = &tiles[r2 * grid.n_cols() + c2];
    let search = config.search_radii();

    let mut candidates = Vec::new();
    let mut failures = Vec::new();
    for (chunk, &(d0, d1)) in chunk_bounds(grid.shape().depth, config.subvol_dim_d)
        .iter()
        .enumerate()
    {
        // Both slabs live only for this chunk's correlation.
        let outcome = read_overlap(first, second, id.kind, grid, d0, d1)
            .and_then(|(a, b)| correlate(&a, &b, [0, 0, 0], search, id.kind, params));
        match outcome {
            Ok(descr) => candidates.push(CandidateDisplacement::new(descr, chunk, d0, d1)),
            Err(err) => {
                warn!(edge = %id, chunk, error = %err, "pair correlation failed");
                failures.push(PairFailure {
                    kind: id.kind,
                    row: id.row,
                    col: id.col,
                    chunk,
                    message: err.to_string(),
                });
            }
        }
    }
    (id, candidates, failures)
}

/// Read the nominal overlap slab of both tiles of an edge for one D-chunk.
fn read_overlap<S: SlabSource>(
    first: &S,
    second: &S,
    kind: EdgeKind,
    grid: &VolumeGrid,
    d0: usize,
    d1: usize,
) -> Result<(Array3<f32>, Array3<f32>)> {
    let shape = grid.shape();
    match kind {
        EdgeKind::NorthSouth => {
            let ov = grid.overlap_v();
            let a = first.read_slab(shape.height - ov, shape.height, 0, shape.width, d0, d1)?;
            let b = second.read_slab(0, ov, 0, shape.width, d0, d1)?;
            Ok((a, b))
        }
        EdgeKind::WestEast => {
            let ov = grid.overlap_h();
            let a = first.read_slab(0, shape.height, shape.width - ov, shape.width, d0, d1)?;
            let b = second.read_slab(0, shape.height, 0, ov, d0, d1)?;
            Ok((a, b))
        }
    }
}
