//! The MIP-NCC correlation engine.
//!
//! Projects two overlapping sub-volumes onto their three
//! maximum-intensity-projection images, correlates each MIP pair over a
//! bounded offset range, and combines the three 2-D peaks into one 3-D
//! displacement with independent per-axis reliabilities.

use ndarray::{s, Array2, Array3};

use crate::consts::{AXIS_D, AXIS_H, AXIS_V};
use crate::error::{Result, StitchError};
use crate::grid::EdgeKind;

use super::enhance::enhance_stack;
use super::mip::{mip_d, mip_h, mip_v};
use super::ncc::{analyze_peak, ncc_map, PeakAnalysis};
use super::{NccDescriptor, NccParams};

/// Correlate two equal-shape stacks stored depth-major, each slice row-major.
///
/// `initial_offset` is the (V,H,D) nominal offset of `b`'s origin inside `a`;
/// the engine correlates the overlap that remains beyond it. `search` holds
/// the (V,H,D) half-ranges explored around the nominal alignment. `side`
/// names the adjacency being measured and is validated against the offset.
pub fn correlate(
    a: &Array3<f32>,
    b: &Array3<f32>,
    initial_offset: [i32; 3],
    search: [usize; 3],
    side: EdgeKind,
    params: &NccParams,
) -> Result<NccDescriptor> {
    let (dim_d, dim_v, dim_h) = a.dim();
    if a.dim() != b.dim() {
        return Err(StitchError::InvalidInput(format!(
            "stacks must have equal shape, got {:?} vs {:?}",
            a.dim(),
            b.dim()
        )));
    }

    let off_v = initial_offset[AXIS_V];
    let off_h = initial_offset[AXIS_H];
    if initial_offset[AXIS_D] != 0 {
        return Err(StitchError::InvalidInput(
            "depth-axis nominal offset is not supported".into(),
        ));
    }
    match side {
        EdgeKind::NorthSouth if off_h != 0 => {
            return Err(StitchError::InvalidInput(
                "N-S correlation cannot carry a horizontal nominal offset".into(),
            ));
        }
        EdgeKind::WestEast if off_v != 0 => {
            return Err(StitchError::InvalidInput(
                "W-E correlation cannot carry a vertical nominal offset".into(),
            ));
        }
        _ => {}
    }
    if off_v < 0 || off_v >= dim_v as i32 || off_h < 0 || off_h >= dim_h as i32 {
        return Err(StitchError::InvalidInput(format!(
            "nominal offset ({off_v},{off_h}) outside the {dim_v}x{dim_h} slice"
        )));
    }

    // Overlap extents (V,H,D) beyond the nominal offset.
    let ov = [
        dim_v - off_v as usize,
        dim_h - off_h as usize,
        dim_d,
    ];
    for k in [AXIS_V, AXIS_H, AXIS_D] {
        if ov[k] <= 2 * search[k] {
            return Err(StitchError::InvalidInput(format!(
                "overlap extent {} on axis {k} does not exceed twice the search radius {}",
                ov[k], search[k]
            )));
        }
        if params.w_range_thr(k) > 2 * search[k] as i32 {
            return Err(StitchError::InvalidInput(format!(
                "width range {} on axis {k} exceeds the searchable span {}",
                params.w_range_thr(k),
                2 * search[k]
            )));
        }
    }

    let a_ov = a.slice(s![.., off_v as usize.., off_h as usize..]);
    let b_ov = b.slice(s![..ov[AXIS_D], ..ov[AXIS_V], ..ov[AXIS_H]]);
    let (a_ov, b_ov) = if params.enhance {
        (enhance_stack(&a_ov, params)?, enhance_stack(&b_ov, params)?)
    } else {
        (a_ov.to_owned(), b_ov.to_owned())
    };

    // Six projections, computed once; the search loop only recomputes maps.
    let a_mip_d = mip_d(&a_ov.view());
    let b_mip_d = mip_d(&b_ov.view());
    let a_mip_v = mip_v(&a_ov.view());
    let b_mip_v = mip_v(&b_ov.view());
    let a_mip_h = mip_h(&a_ov.view());
    let b_mip_h = mip_h(&b_ov.view());

    let inf_w = params.inf_width();
    let max_off = [
        (ov[AXIS_V] as i32 - params.min_dim_ncc_src as i32).max(0),
        (ov[AXIS_H] as i32 - params.min_dim_ncc_src as i32).max(0),
        (ov[AXIS_D] as i32 - params.min_dim_ncc_src as i32).max(0),
    ];

    let mut center = [0i32; 3];
    let mut radius = [
        search[AXIS_V] as i32,
        search[AXIS_H] as i32,
        search[AXIS_D] as i32,
    ];
    let mut descr = NccDescriptor::unreliable(inf_w);

    for iter in 0..params.max_iter.max(1) {
        let range = |k: usize| (center[k] - radius[k], center[k] + radius[k]);

        // Map axes: (u,v) of map_d are (V,H); of map_v are (D,H); of map_h
        // are (D,V).
        let map_d = checked_peak(&a_mip_d, &b_mip_d, range(AXIS_V), range(AXIS_H), params);
        let map_v = checked_peak(&a_mip_v, &b_mip_v, range(AXIS_D), range(AXIS_H), params);
        let map_h = checked_peak(&a_mip_h, &b_mip_h, range(AXIS_D), range(AXIS_V), params);

        let prev = descr;
        descr = NccDescriptor::unreliable(inf_w);
        for k in [AXIS_V, AXIS_H, AXIS_D] {
            let contributions = match k {
                AXIS_V => [u_component(&map_d), v_component(&map_h)],
                AXIS_H => [v_component(&map_d), v_component(&map_v)],
                _ => [u_component(&map_v), u_component(&map_h)],
            };
            if let Some((offset, value, width)) = pick_axis(contributions, params, k) {
                if value >= params.max_thr {
                    descr.coord[k] = offset;
                    descr.ncc_max[k] = value;
                    descr.ncc_width[k] = if width >= params.w_range_thr(k) {
                        inf_w
                    } else {
                        width
                    };
                }
            }
            // A retry pass must never lose an axis the previous pass had.
            if !descr.axis_reliable(k) && prev.axis_reliable(k) {
                descr.coord[k] = prev.coord[k];
                descr.ncc_max[k] = prev.ncc_max[k];
                descr.ncc_width[k] = prev.ncc_width[k];
            }
        }

        let failing: Vec<usize> = [AXIS_V, AXIS_H, AXIS_D]
            .into_iter()
            .filter(|&k| !descr.axis_reliable(k))
            .collect();
        if failing.is_empty() || iter + 1 >= params.max_iter.max(1) {
            break;
        }

        // Re-center reliable axes on their peak and widen the failing ones,
        // as far as the minimum-window constraint allows.
        for k in [AXIS_V, AXIS_H, AXIS_D] {
            if descr.axis_reliable(k) {
                let bound = (max_off[k] - radius[k]).max(0);
                center[k] = descr.coord[k].clamp(-bound, bound);
            }
        }
        let mut grew = false;
        for &k in &failing {
            let headroom = (max_off[k] - center[k].abs()).max(0);
            let wider = (radius[k] * 2).min(headroom);
            if wider > radius[k] {
                radius[k] = wider;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    Ok(descr)
}

/// Compute one MIP pair's NCC map and peak, applying the map-dimension and
/// isolation guards. `None` means the pair contributes to neither axis.
fn checked_peak(
    a: &Array2<f32>,
    b: &Array2<f32>,
    u_range: (i32, i32),
    v_range: (i32, i32),
    params: &NccParams,
) -> Option<PeakAnalysis> {
    let nu = (u_range.1 - u_range.0 + 1) as usize;
    let nv = (v_range.1 - v_range.0 + 1) as usize;
    if nu < params.min_dim_ncc_map || nv < params.min_dim_ncc_map {
        return None;
    }

    let map = ncc_map(a, b, u_range, v_range, params.min_dim_ncc_src)?;
    let peak = analyze_peak(&map, params.width_thr);
    if peak.support() < params.min_points {
        return None;
    }
    Some(peak)
}

fn u_component(map: &Option<PeakAnalysis>) -> Option<(i32, f32, i32)> {
    map.as_ref().map(|p| (p.u, p.value, p.width_u))
}

fn v_component(map: &Option<PeakAnalysis>) -> Option<(i32, f32, i32)> {
    map.as_ref().map(|p| (p.v, p.value, p.width_v))
}

/// Choose between the two maps covering an axis: the tighter peak wins, ties
/// go to the higher peak value, then to the first map in declaration order.
fn pick_axis(
    contributions: [Option<(i32, f32, i32)>; 2],
    params: &NccParams,
    axis: usize,
) -> Option<(i32, f32, i32)> {
    let effective = |w: i32| {
        if w >= params.w_range_thr(axis) {
            params.inf_width()
        } else {
            w
        }
    };
    match contributions {
        [Some(a), Some(b)] => {
            let (wa, wb) = (effective(a.2), effective(b.2));
            if wb < wa || (wb == wa && b.1 > a.1) {
                Some(b)
            } else {
                Some(a)
            }
        }
        [Some(a), None] => Some(a),
        [None, Some(b)] => Some(b),
        [None, None] => None,
    }
}
