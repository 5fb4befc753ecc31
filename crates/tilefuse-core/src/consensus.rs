//! Projection of per-edge candidate lists to consensus displacements, and
//! stitchability marking.

use tracing::info;

use crate::graph::{CandidateDisplacement, DisplacementGraph, EdgeId};
use crate::grid::VolumeGrid;
use crate::mipncc::NccDescriptor;

/// Collapse each edge's candidates into exactly one consensus displacement.
///
/// Per axis, candidates qualify when their reliability reaches `threshold`
/// and their width is finite; the consensus coordinate is the qualifying
/// median, the reliability the maximum, the width the minimum. Axes with no
/// qualifying candidate are marked unreliable.
pub fn project_displacements(graph: &mut DisplacementGraph, threshold: f32, inf_w: i32) {
    let ids: Vec<EdgeId> = graph.edge_ids().collect();
    for id in ids {
        let descr = {
            let edge = graph.edge(id).expect("edge ids come from the graph");
            consensus_of(&edge.candidates, threshold, inf_w)
        };
        graph
            .set_consensus(id, descr)
            .expect("edge ids come from the graph");
    }
    info!(edges = graph.edge_ids().count(), threshold, "Displacements projected");
}

fn consensus_of(
    candidates: &[CandidateDisplacement],
    threshold: f32,
    inf_w: i32,
) -> NccDescriptor {
    let mut descr = NccDescriptor::unreliable(inf_w);
    for k in 0..3 {
        let mut qualifying: Vec<(i32, f32, i32)> = candidates
            .iter()
            .filter(|c| c.ncc_max[k] >= threshold && c.ncc_width[k] < inf_w)
            .map(|c| (c.coord[k], c.ncc_max[k], c.ncc_width[k]))
            .collect();
        if qualifying.is_empty() {
            continue;
        }

        qualifying.sort_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));
        let n = qualifying.len();
        let chosen = if n % 2 == 1 {
            qualifying[n / 2]
        } else {
            // Of the two middle values the lower width wins, ties to the
            // lower value.
            let (lo, hi) = (qualifying[n / 2 - 1], qualifying[n / 2]);
            if hi.2 < lo.2 {
                hi
            } else {
                lo
            }
        };

        descr.coord[k] = chosen.0;
        descr.ncc_max[k] = qualifying
            .iter()
            .map(|q| q.1)
            .fold(f32::NEG_INFINITY, f32::max);
        descr.ncc_width[k] = qualifying.iter().map(|q| q.2).min().expect("non-empty");
    }
    descr
}

/// Mark each tile stitchable iff some incident edge has consensus
/// reliability at or above `threshold` on all three axes. Returns the
/// stitchable count.
pub fn mark_stitchable(grid: &mut VolumeGrid, graph: &DisplacementGraph, threshold: f32) -> usize {
    let mut count = 0;
    for row in 0..grid.n_rows() {
        for col in 0..grid.n_cols() {
            let stitchable = graph.incident(row, col).iter().any(|id| {
                graph
                    .edge(*id)
                    .and_then(|e| e.consensus.as_ref())
                    .is_some_and(|c| (0..3).all(|k| c.ncc_max[k] >= threshold))
            });
            grid.tile_mut(row, col).set_stitchable(stitchable);
            count += stitchable as usize;
        }
    }
    info!(stitchable = count, threshold, "Stitchable tiles marked");
    count
}
