//! Blending of placed tiles into a stitched volume, with multi-resolution
//! export of the output slices.

use std::fs;
use std::path::PathBuf;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, StitchError};
use crate::grid::VolumeGrid;
use crate::io::image_io::save_slice;
use crate::io::SlabSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SliceFormat {
    #[default]
    Tiff,
    Png,
}

impl SliceFormat {
    fn extension(&self) -> &'static str {
        match self {
            SliceFormat::Tiff => "tif",
            SliceFormat::Png => "png",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergeConfig {
    pub output_dir: PathBuf,
    /// Resolution levels to export; level `i+1` halves level `i`.
    pub resolutions: usize,
    pub format: SliceFormat,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("stitched"),
            resolutions: 1,
            format: SliceFormat::default(),
        }
    }
}

/// Blend all tiles into the stitched volume and write one image per output
/// slice under `RES_0 .. RES_{n-1}` directories.
///
/// Voxels covered by several tiles are feathered with a linear ramp across
/// the overlap. Requires placement to have run.
pub fn merge_tiles<S, F>(
    grid: &VolumeGrid,
    tiles: &[S],
    config: &MergeConfig,
    on_slice_done: F,
) -> Result<()>
where
    S: SlabSource,
    F: Fn(usize),
{
    let volume = assemble_volume(grid, tiles)?;
    let (out_d, out_v, out_h) = volume.dim();
    info!(
        height = out_v,
        width = out_h,
        depth = out_d,
        levels = config.resolutions.max(1),
        "Merging tiles"
    );

    let mut level_volume = volume;
    for level in 0..config.resolutions.max(1) {
        let dir = config.output_dir.join(format!("RES_{level}"));
        fs::create_dir_all(&dir)?;
        let depth = level_volume.dim().0;
        for d in 0..depth {
            let slice: Array2<f32> = level_volume.index_axis(ndarray::Axis(0), d).to_owned();
            let path = dir.join(format!("slice_{d:05}.{}", config.format.extension()));
            save_slice(&slice, &path)?;
            if level == 0 {
                on_slice_done(d + 1);
            }
        }
        if level + 1 < config.resolutions.max(1) {
            level_volume = if level_volume.dim().0 == 1 {
                halve_sample_2d(&level_volume)
            } else {
                halve_sample(&level_volume)
            };
        }
    }
    Ok(())
}

/// Assemble the full-resolution stitched volume from placed tiles.
pub fn assemble_volume<S: SlabSource>(grid: &VolumeGrid, tiles: &[S]) -> Result<Array3<f32>> {
    let shape = grid.shape();
    let mut min = [i32::MAX; 3];
    let mut max = [i32::MIN; 3];
    for tile in grid.tiles() {
        let abs = tile.abs().ok_or_else(|| {
            StitchError::InvalidInput(format!(
                "tile ({},{}) has no absolute position; run placement first",
                tile.row(),
                tile.col()
            ))
        })?;
        for k in 0..3 {
            min[k] = min[k].min(abs[k]);
            max[k] = max[k].max(abs[k] + shape.extent(k) as i32);
        }
    }

    let out_v = (max[0] - min[0]) as usize;
    let out_h = (max[1] - min[1]) as usize;
    let out_d = (max[2] - min[2]) as usize;

    let weights = tile_weights(grid);
    let mut num = Array3::<f32>::zeros((out_d, out_v, out_h));
    let mut den = Array3::<f32>::zeros((out_d, out_v, out_h));

    for tile in grid.tiles() {
        let abs = tile.abs().expect("checked above");
        let source = &tiles[tile.row() * grid.n_cols() + tile.col()];
        let slab = source.read_slab(0, shape.height, 0, shape.width, 0, shape.depth)?;
        let v0 = (abs[0] - min[0]) as usize;
        let h0 = (abs[1] - min[1]) as usize;
        let d0 = (abs[2] - min[2]) as usize;
        for d in 0..shape.depth {
            for v in 0..shape.height {
                for h in 0..shape.width {
                    let w = weights[[v, h]];
                    num[[d0 + d, v0 + v, h0 + h]] += w * slab[[d, v, h]];
                    den[[d0 + d, v0 + v, h0 + h]] += w;
                }
            }
        }
    }

    let mut out = num;
    out.zip_mut_with(&den, |n, &d| {
        *n = if d > 0.0 { *n / d } else { 0.0 };
    });
    Ok(out)
}

/// Per-tile blending weight: a linear ramp from the tile border, saturating
/// one voxel past the configured overlap so interior voxels share a plateau.
fn tile_weights(grid: &VolumeGrid) -> Array2<f32> {
    let shape = grid.shape();
    let ramp_v = grid.overlap_v() + 1;
    let ramp_h = grid.overlap_h() + 1;
    let mut weights = Array2::<f32>::zeros((shape.height, shape.width));
    for v in 0..shape.height {
        let wv = (v + 1).min(shape.height - v).min(ramp_v) as f32;
        for h in 0..shape.width {
            let wh = (h + 1).min(shape.width - h).min(ramp_h) as f32;
            weights[[v, h]] = wv * wh;
        }
    }
    weights
}

/// 2x2x2 mean down-sampling; odd borders average the samples available.
pub fn halve_sample(vol: &Array3<f32>) -> Array3<f32> {
    let (d, v, h) = vol.dim();
    let (od, ov, oh) = (d.div_ceil(2), v.div_ceil(2), h.div_ceil(2));
    let mut out = Array3::<f32>::zeros((od, ov, oh));
    for zd in 0..od {
        for zv in 0..ov {
            for zh in 0..oh {
                let mut sum = 0.0f32;
                let mut count = 0u32;
                for sd in (2 * zd)..(2 * zd + 2).min(d) {
                    for sv in (2 * zv)..(2 * zv + 2).min(v) {
                        for sh in (2 * zh)..(2 * zh + 2).min(h) {
                            sum += vol[[sd, sv, sh]];
                            count += 1;
                        }
                    }
                }
                out[[zd, zv, zh]] = sum / count as f32;
            }
        }
    }
    out
}

/// 2x2 in-plane mean down-sampling, keeping the depth extent.
pub fn halve_sample_2d(vol: &Array3<f32>) -> Array3<f32> {
    let (d, v, h) = vol.dim();
    let (ov, oh) = (v.div_ceil(2), h.div_ceil(2));
    let mut out = Array3::<f32>::zeros((d, ov, oh));
    for zd in 0..d {
        for zv in 0..ov {
            for zh in 0..oh {
                let mut sum = 0.0f32;
                let mut count = 0u32;
                for sv in (2 * zv)..(2 * zv + 2).min(v) {
                    for sh in (2 * zh)..(2 * zh + 2).min(h) {
                        sum += vol[[zd, sv, sh]];
                        count += 1;
                    }
                }
                out[[zd, zv, zh]] = sum / count as f32;
            }
        }
    }
    out
}
