//! Tile placement via per-axis minimum spanning trees.
//!
//! The tile grid is a graph whose edge weights are the inverse of the
//! consensus reliabilities, so a fully reliable displacement weighs 1 and an
//! unreliable one a large sentinel. A shortest-path tree from a stitchable
//! source tile is computed independently for each axis, then absolute
//! coordinates are accumulated by walking each tile's predecessor chain back
//! to the source.

use tracing::{debug, info, warn};

use crate::consts::UNRELIABLE_WEIGHT;
use crate::error::{Result, StitchError};
use crate::graph::DisplacementGraph;
use crate::grid::VolumeGrid;
use crate::mipncc::NccDescriptor;

/// Summary of one placement run.
#[derive(Clone, Copy, Debug)]
pub struct PlacementOutcome {
    pub source: (usize, usize),
    /// Chain steps that crossed an edge with non-positive reliability.
    pub unreliable_steps: usize,
    /// Chain steps that routed a stitchable tile through a non-stitchable one.
    pub non_stitchable_routes: usize,
}

/// Assign absolute coordinates to every tile, normalized so tile (0,0) sits
/// at the origin.
pub fn place_tiles(grid: &mut VolumeGrid, graph: &DisplacementGraph) -> Result<PlacementOutcome> {
    let rows = grid.n_rows();
    let cols = grid.n_cols();

    // Source: the stitchable tile nearest the grid origin; the row-major
    // scan with a strict comparison breaks ties lexicographically.
    let mut source = None;
    let mut best = f64::INFINITY;
    for row in 0..rows {
        for col in 0..cols {
            if grid.tile(row, col).is_stitchable() {
                let d = ((row * row + col * col) as f64).sqrt();
                if d < best {
                    best = d;
                    source = Some((row, col));
                }
            }
        }
    }
    let (src_row, src_col) = source.ok_or(StitchError::NoStitchableSource)?;
    info!(row = src_row, col = src_col, "Placement source selected");

    let consensus = |r: usize, c: usize, vertical: bool| -> Option<NccDescriptor> {
        let id = if vertical {
            crate::graph::EdgeId::north_south(r, c)
        } else {
            crate::graph::EdgeId::west_east(r, c)
        };
        graph.edge(id).and_then(|e| e.consensus)
    };
    let weight = |descr: Option<NccDescriptor>, k: usize| -> f32 {
        match descr {
            Some(d) if d.ncc_max[k] > 0.0 => 1.0 / d.ncc_max[k],
            _ => UNRELIABLE_WEIGHT,
        }
    };

    // Relaxation over all edges, iterated up to R*C times per axis.
    let idx = |r: usize, c: usize| r * cols + c;
    let mut dist = vec![[f32::INFINITY; 3]; rows * cols];
    let mut pred = vec![[(usize::MAX, usize::MAX); 3]; rows * cols];
    dist[idx(src_row, src_col)] = [0.0; 3];

    for _pass in 0..rows * cols {
        let mut changed = false;
        for r in 0..rows {
            for c in 0..cols {
                for k in 0..3 {
                    if r + 1 < rows {
                        let w = weight(consensus(r, c, true), k);
                        let (i, j) = (idx(r, c), idx(r + 1, c));
                        if dist[i][k] + w < dist[j][k] {
                            dist[j][k] = dist[i][k] + w;
                            pred[j][k] = (r, c);
                            changed = true;
                        }
                        if dist[j][k] + w < dist[i][k] {
                            dist[i][k] = dist[j][k] + w;
                            pred[i][k] = (r + 1, c);
                            changed = true;
                        }
                    }
                    if c + 1 < cols {
                        let w = weight(consensus(r, c, false), k);
                        let (i, j) = (idx(r, c), idx(r, c + 1));
                        if dist[i][k] + w < dist[j][k] {
                            dist[j][k] = dist[i][k] + w;
                            pred[j][k] = (r, c);
                            changed = true;
                        }
                        if dist[j][k] + w < dist[i][k] {
                            dist[i][k] = dist[j][k] + w;
                            pred[i][k] = (r, c + 1);
                            changed = true;
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Accumulate absolute coordinates by tracing each predecessor chain.
    let mut abs = vec![[0i32; 3]; rows * cols];
    let mut unreliable_steps = 0usize;
    let mut non_stitchable_routes = 0usize;

    for r in 0..rows {
        for c in 0..cols {
            if (r, c) == (src_row, src_col) {
                continue;
            }
            for k in 0..3 {
                let mut v = (r, c);
                let mut steps = 0usize;
                while v != (src_row, src_col) {
                    steps += 1;
                    if steps > rows * cols {
                        return Err(StitchError::PredecessorGraphCorrupt(format!(
                            "cycle while tracing tile ({r},{c}) on axis {k}"
                        )));
                    }
                    let (ur, uc) = pred[idx(v.0, v.1)][k];
                    if ur >= rows || uc >= cols {
                        return Err(StitchError::PredecessorGraphCorrupt(format!(
                            "predecessor of ({},{}) on axis {k} out of range",
                            v.0, v.1
                        )));
                    }
                    let (edge_id, u_is_first) =
                        graph.between((ur, uc), v).ok_or_else(|| {
                            StitchError::PredecessorGraphCorrupt(format!(
                                "predecessor ({ur},{uc}) is not adjacent to ({},{})",
                                v.0, v.1
                            ))
                        })?;

                    let (delta, rel) = match graph.edge(edge_id).and_then(|e| e.consensus) {
                        Some(d) => (d.coord[k], d.ncc_max[k]),
                        None => (NccDescriptor::INV_COORD, NccDescriptor::UNR_NCC),
                    };
                    let total = grid.nominal_pitch(edge_id.kind)[k] + delta;
                    abs[idx(r, c)][k] += if u_is_first { total } else { -total };

                    if rel <= 0.0 {
                        unreliable_steps += 1;
                        debug!(edge = %edge_id, axis = k, "placement crossed an unreliable edge");
                    }
                    if grid.tile(r, c).is_stitchable() && !grid.tile(ur, uc).is_stitchable() {
                        warn!(
                            tile = ?(r, c),
                            through = ?(ur, uc),
                            axis = k,
                            "placement path passes through a non-stitchable tile"
                        );
                        non_stitchable_routes += 1;
                    }
                    v = (ur, uc);
                }
            }
        }
    }

    // Re-base on tile (0,0).
    let base = abs[0];
    for r in 0..rows {
        for c in 0..cols {
            let a = abs[idx(r, c)];
            let tile = grid.tile_mut(r, c);
            tile.clear_abs();
            tile.set_abs([a[0] - base[0], a[1] - base[1], a[2] - base[2]]);
        }
    }

    if unreliable_steps > 0 {
        warn!(
            unreliable_steps,
            "placement used unreliable-weight edges; coordinates fall back to the nominal pitch there"
        );
    }
    info!(
        source = ?(src_row, src_col),
        unreliable_steps,
        non_stitchable_routes,
        "Tiles placed"
    );

    Ok(PlacementOutcome {
        source: (src_row, src_col),
        unreliable_steps,
        non_stitchable_routes,
    })
}
