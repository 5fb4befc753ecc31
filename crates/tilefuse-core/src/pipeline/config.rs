use serde::{Deserialize, Serialize};

use crate::mipncc::NccParams;

/// Tunable parameters of a stitching session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Half-range of the offset search around the nominal overlap, along V.
    pub search_radius_v: usize,
    /// Half-range of the offset search along H.
    pub search_radius_h: usize,
    /// Half-range of the offset search along D.
    pub search_radius_d: usize,
    /// Number of slices per D-chunk in the pairwise phase.
    pub subvol_dim_d: usize,
    /// Minimum per-axis NCC peak for a candidate to enter the consensus;
    /// also defines tile stitchability.
    pub reliability_threshold: f32,
    /// Processing window within the grid, inclusive. `None` spans the grid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_col: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_col: Option<usize>,
    /// MIP-NCC engine parameters.
    pub ncc: NccParams,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            search_radius_v: 10,
            search_radius_h: 10,
            search_radius_d: 5,
            subvol_dim_d: 100,
            reliability_threshold: 0.7,
            start_row: None,
            end_row: None,
            start_col: None,
            end_col: None,
            ncc: NccParams::default(),
        }
    }
}

impl StitchConfig {
    pub fn search_radii(&self) -> [usize; 3] {
        [
            self.search_radius_v,
            self.search_radius_h,
            self.search_radius_d,
        ]
    }

    /// Inclusive row window, clamped to the grid.
    pub fn row_window(&self, rows: usize) -> (usize, usize) {
        let r0 = self.start_row.unwrap_or(0).min(rows - 1);
        let r1 = self.end_row.unwrap_or(rows - 1).min(rows - 1);
        (r0, r1.max(r0))
    }

    /// Inclusive column window, clamped to the grid.
    pub fn col_window(&self, cols: usize) -> (usize, usize) {
        let c0 = self.start_col.unwrap_or(0).min(cols - 1);
        let c1 = self.end_col.unwrap_or(cols - 1).min(cols - 1);
        (c0, c1.max(c0))
    }
}
