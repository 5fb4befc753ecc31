pub mod enhance;
mod engine;
pub mod mip;
pub mod ncc;

use serde::{Deserialize, Serialize};

use crate::consts::NCC_WIDTH_MAX;

pub use engine::correlate;
pub use mip::{mip_d, mip_h, mip_v};
pub use ncc::{analyze_peak, ncc_map, NccMap, PeakAnalysis};

/// Result of one MIP-NCC correlation: offset of the second stack relative to
/// the first (beyond the nominal overlap), with per-axis peak value and width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NccDescriptor {
    /// (V,H,D) offset in voxels.
    pub coord: [i32; 3],
    /// NCC peak per axis, in [-1,1]; `UNR_NCC` marks an unreliable axis.
    pub ncc_max: [f32; 3],
    /// Peak width per axis; `inf_width` marks a flat or capped peak.
    pub ncc_width: [i32; 3],
}

impl NccDescriptor {
    /// Reliability reported for an axis with no usable peak.
    pub const UNR_NCC: f32 = -1.0;
    /// Coordinate reported for an axis with no usable peak.
    pub const INV_COORD: i32 = 0;

    pub fn unreliable(inf_w: i32) -> Self {
        Self {
            coord: [Self::INV_COORD; 3],
            ncc_max: [Self::UNR_NCC; 3],
            ncc_width: [inf_w; 3],
        }
    }

    /// True when the axis carries a real NCC peak rather than the
    /// unreliable sentinel.
    pub fn axis_reliable(&self, axis: usize) -> bool {
        self.ncc_max[axis] >= 0.0
    }
}

/// Parameters controlling the MIP-NCC engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NccParams {
    /// Enable the piecewise-linear contrast enhancement before projection.
    pub enhance: bool,
    /// Maximum number of search passes (re-centered retries included).
    pub max_iter: usize,
    /// Minimum accepted NCC peak value.
    pub max_thr: f32,
    /// Fraction of the peak value defining its width support, in [0,1].
    pub width_thr: f32,
    /// Width along V beyond which the width is reported as infinite.
    pub w_range_thr_v: i32,
    /// Width along H beyond which the width is reported as infinite.
    pub w_range_thr_h: i32,
    /// Width along D beyond which the width is reported as infinite.
    pub w_range_thr_d: i32,
    /// Minimum samples in the width cross for a peak to be considered.
    pub min_points: i32,
    /// Minimum correlation-window dimension for NCC to be attempted.
    pub min_dim_ncc_src: usize,
    /// Minimum NCC-map dimension for a map to be considered.
    pub min_dim_ncc_map: usize,
    /// Enhancement breakpoints: cumulative pixel fractions, last must be 1.0.
    pub enhance_percents: Vec<f32>,
    /// Grey levels the breakpoints map to.
    pub enhance_levels: Vec<f32>,
}

impl Default for NccParams {
    fn default() -> Self {
        Self {
            enhance: false,
            max_iter: 2,
            max_thr: 0.10,
            width_thr: 0.80,
            w_range_thr_v: 10,
            w_range_thr_h: 10,
            w_range_thr_d: 10,
            min_points: 3,
            min_dim_ncc_src: 25,
            min_dim_ncc_map: 3,
            enhance_percents: vec![0.85, 0.97, 1.0],
            enhance_levels: vec![0.35, 0.80, 1.0],
        }
    }
}

impl NccParams {
    /// Sentinel width value; every finite width is strictly below it.
    pub fn inf_width(&self) -> i32 {
        self.w_range_thr_v.max(self.w_range_thr_h).max(self.w_range_thr_d) + 1
    }

    pub fn w_range_thr(&self, axis: usize) -> i32 {
        [self.w_range_thr_v, self.w_range_thr_h, self.w_range_thr_d][axis]
    }

    /// Clamp the per-axis width ranges to the configured search radii,
    /// bounded by `NCC_WIDTH_MAX`.
    pub fn clamped_to_search(mut self, search: [usize; 3]) -> Self {
        self.w_range_thr_v = (search[0] as i32).min(NCC_WIDTH_MAX - 1);
        self.w_range_thr_h = (search[1] as i32).min(NCC_WIDTH_MAX - 1);
        self.w_range_thr_d = (search[2] as i32).min(NCC_WIDTH_MAX - 1);
        self
    }
}
