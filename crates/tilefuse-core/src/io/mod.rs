pub mod image_io;
pub mod raw;

use ndarray::Array3;

use crate::error::{Result, StitchError};
use crate::grid::TileShape;

pub use raw::{write_raw_tile, RawHeader, RawTileReader};

/// Storage capability the stitching core sees: tile dimensions plus windowed
/// voxel reads. Implementations must be safe for concurrent independent
/// reads; workers in the pairwise phase read distinct slabs in parallel.
pub trait SlabSource: Send + Sync {
    fn shape(&self) -> TileShape;

    /// Read the sub-volume `[v0,v1) × [h0,h1) × [d0,d1)` as a (D,V,H) stack
    /// of grey values normalized to [0,1].
    fn read_slab(
        &self,
        v0: usize,
        v1: usize,
        h0: usize,
        h1: usize,
        d0: usize,
        d1: usize,
    ) -> Result<Array3<f32>>;
}

pub(crate) fn check_window(
    shape: TileShape,
    v0: usize,
    v1: usize,
    h0: usize,
    h1: usize,
    d0: usize,
    d1: usize,
) -> Result<()> {
    if v0 >= v1 || h0 >= h1 || d0 >= d1 {
        return Err(StitchError::InvalidInput(format!(
            "empty slab window [{v0},{v1})x[{h0},{h1})x[{d0},{d1})"
        )));
    }
    if v1 > shape.height || h1 > shape.width || d1 > shape.depth {
        return Err(StitchError::InvalidInput(format!(
            "slab window [{v0},{v1})x[{h0},{h1})x[{d0},{d1}) exceeds tile {}x{}x{}",
            shape.height, shape.width, shape.depth
        )));
    }
    Ok(())
}

/// In-memory tile, used by tests and as the merge accumulator's source.
#[derive(Clone, Debug)]
pub struct MemoryTile {
    data: Array3<f32>,
}

impl MemoryTile {
    /// Wrap a (D,V,H) stack of values in [0,1].
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }
}

impl SlabSource for MemoryTile {
    fn shape(&self) -> TileShape {
        let (d, v, h) = self.data.dim();
        TileShape {
            height: v,
            width: h,
            depth: d,
        }
    }

    fn read_slab(
        &self,
        v0: usize,
        v1: usize,
        h0: usize,
        h1: usize,
        d0: usize,
        d1: usize,
    ) -> Result<Array3<f32>> {
        check_window(self.shape(), v0, v1, h0, h1, d0, d1)?;
        Ok(self
            .data
            .slice(ndarray::s![d0..d1, v0..v1, h0..h1])
            .to_owned())
    }
}
