use serde::{Deserialize, Serialize};

use crate::consts::{AXIS_H, AXIS_V};
use crate::error::{Result, StitchError};

/// Direction of an adjacency between two neighboring tiles.
///
/// The NORTH-SOUTH edge joins `(r,c)` to `(r+1,c)`; the WEST-EAST edge joins
/// `(r,c)` to `(r,c+1)`. The lower-index tile is always the edge's first tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    NorthSouth,
    WestEast,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::NorthSouth => write!(f, "N-S"),
            EdgeKind::WestEast => write!(f, "W-E"),
        }
    }
}

/// Voxel dimensions shared by every tile of a volume.
/// `height` counts rows (V), `width` columns (H), `depth` slices (D).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileShape {
    pub height: usize,
    pub width: usize,
    pub depth: usize,
}

impl TileShape {
    /// Extent along a coordinate axis (`AXIS_V`/`AXIS_H`/`AXIS_D`).
    pub fn extent(&self, axis: usize) -> usize {
        [self.height, self.width, self.depth][axis]
    }
}

/// One acquired stack sitting at a `(row, col)` of the mechanical grid.
#[derive(Clone, Debug)]
pub struct Tile {
    row: usize,
    col: usize,
    /// Nominal origin in voxels (V,H,D), derived from stage metadata.
    pub origin: [i32; 3],
    abs: Option<[i32; 3]>,
    stitchable: bool,
}

impl Tile {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    /// Absolute position in voxels, once placement has run.
    pub fn abs(&self) -> Option<[i32; 3]> {
        self.abs
    }

    pub fn is_stitchable(&self) -> bool {
        self.stitchable
    }

    /// Placement writes the absolute position exactly once per tile.
    pub(crate) fn set_abs(&mut self, abs: [i32; 3]) {
        debug_assert!(self.abs.is_none(), "absolute position assigned twice");
        self.abs = Some(abs);
    }

    pub(crate) fn set_stitchable(&mut self, stitchable: bool) {
        self.stitchable = stitchable;
    }

    pub(crate) fn clear_abs(&mut self) {
        self.abs = None;
    }
}

/// Dense `R×C` grid of tiles with uniform dimensions and bit depth.
#[derive(Clone, Debug)]
pub struct VolumeGrid {
    rows: usize,
    cols: usize,
    shape: TileShape,
    bit_depth: u8,
    channels: u8,
    overlap_v: usize,
    overlap_h: usize,
    tiles: Vec<Tile>,
}

impl VolumeGrid {
    pub fn new(
        rows: usize,
        cols: usize,
        shape: TileShape,
        bit_depth: u8,
        channels: u8,
        overlap_v: usize,
        overlap_h: usize,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(StitchError::InconsistentTopology(format!(
                "grid must be non-empty, got {rows}x{cols}"
            )));
        }
        if shape.height == 0 || shape.width == 0 || shape.depth == 0 {
            return Err(StitchError::InvalidInput(format!(
                "tile dimensions must be positive, got {}x{}x{}",
                shape.height, shape.width, shape.depth
            )));
        }
        if overlap_v == 0 || overlap_v >= shape.height {
            return Err(StitchError::InvalidInput(format!(
                "overlap_v = {overlap_v} outside (0, {})",
                shape.height
            )));
        }
        if overlap_h == 0 || overlap_h >= shape.width {
            return Err(StitchError::InvalidInput(format!(
                "overlap_h = {overlap_h} outside (0, {})",
                shape.width
            )));
        }
        if bit_depth != 8 && bit_depth != 16 {
            return Err(StitchError::InvalidInput(format!(
                "unsupported bit depth {bit_depth}"
            )));
        }

        let pitch_v = (shape.height - overlap_v) as i32;
        let pitch_h = (shape.width - overlap_h) as i32;
        let mut tiles = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                tiles.push(Tile {
                    row,
                    col,
                    origin: [row as i32 * pitch_v, col as i32 * pitch_h, 0],
                    abs: None,
                    stitchable: false,
                });
            }
        }

        Ok(Self {
            rows,
            cols,
            shape,
            bit_depth,
            channels,
            overlap_v,
            overlap_h,
            tiles,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn n_slices(&self) -> usize {
        self.shape.depth
    }

    pub fn shape(&self) -> TileShape {
        self.shape
    }

    pub fn bit_depth(&self) -> u8 {
        self.bit_depth
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn overlap_v(&self) -> usize {
        self.overlap_v
    }

    pub fn overlap_h(&self) -> usize {
        self.overlap_h
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        assert!(row < self.rows && col < self.cols, "tile index out of range");
        row * self.cols + col
    }

    pub fn tile(&self, row: usize, col: usize) -> &Tile {
        &self.tiles[self.idx(row, col)]
    }

    pub(crate) fn tile_mut(&mut self, row: usize, col: usize) -> &mut Tile {
        let idx = self.idx(row, col);
        &mut self.tiles[idx]
    }

    /// Checked lookup for indices coming from external inputs.
    pub fn try_tile(&self, row: usize, col: usize) -> Result<&Tile> {
        if row >= self.rows || col >= self.cols {
            return Err(StitchError::TileIndexOutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(self.tile(row, col))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Nominal displacement (V,H,D) of an edge's second tile relative to its
    /// first, before any correlation-measured correction.
    pub fn nominal_pitch(&self, kind: EdgeKind) -> [i32; 3] {
        let mut pitch = [0i32; 3];
        match kind {
            EdgeKind::NorthSouth => {
                pitch[AXIS_V] = (self.shape.height - self.overlap_v) as i32;
            }
            EdgeKind::WestEast => {
                pitch[AXIS_H] = (self.shape.width - self.overlap_h) as i32;
            }
        }
        pitch
    }
}
