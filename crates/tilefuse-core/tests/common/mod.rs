#![allow(dead_code)]

use ndarray::Array3;

/// Deterministic pseudo-random sequence (no RNG dependency, bit-identical
/// across runs and platforms).
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 33) as u32
    }

    /// Uniform in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1 << 24) as f32
    }

    /// Uniform in [lo, hi).
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }
}

/// A field of smooth Gaussian blobs on an unbounded (V,H,D) domain.
///
/// Smoothness is what the correlation tests rely on: with sigma around 1.6
/// the lag-1 autocorrelation of the rendered images sits comfortably above
/// the 0.8 width threshold while lag-2 stays below it, so NCC peaks come out
/// sharp but not single-sample.
pub struct BlobScene {
    centers: Vec<[f32; 3]>,
    amplitudes: Vec<f32>,
    sigma: f32,
}

impl BlobScene {
    /// Scatter `count` blobs over `extent` voxels per axis (with margin so
    /// shifted samplings stay inside the populated region).
    pub fn new(seed: u64, count: usize, extent: [f32; 3], sigma: f32) -> Self {
        let mut rng = Lcg::new(seed);
        let margin = 4.0 * sigma;
        let mut centers = Vec::with_capacity(count);
        let mut amplitudes = Vec::with_capacity(count);
        for _ in 0..count {
            centers.push([
                rng.range_f32(-margin, extent[0] + margin),
                rng.range_f32(-margin, extent[1] + margin),
                rng.range_f32(-margin, extent[2] + margin),
            ]);
            amplitudes.push(rng.range_f32(0.4, 1.0));
        }
        Self {
            centers,
            amplitudes,
            sigma,
        }
    }

    /// Scene value at a (V,H,D) point; blobs combine by maximum, like the
    /// bright puncta the pipeline is built for.
    pub fn value(&self, v: f32, h: f32, d: f32) -> f32 {
        let inv = 1.0 / (2.0 * self.sigma * self.sigma);
        let mut best = 0.0f32;
        for (c, &a) in self.centers.iter().zip(&self.amplitudes) {
            let dv = v - c[0];
            let dh = h - c[1];
            let dd = d - c[2];
            let val = a * (-(dv * dv + dh * dh + dd * dd) * inv).exp();
            if val > best {
                best = val;
            }
        }
        best
    }

    /// Render a (D,V,H) stack sampling the scene from `origin` (V,H,D).
    pub fn render(&self, origin: [i32; 3], depth: usize, height: usize, width: usize) -> Array3<f32> {
        let mut out = Array3::<f32>::zeros((depth, height, width));
        for d in 0..depth {
            for v in 0..height {
                for h in 0..width {
                    out[[d, v, h]] = self.value(
                        (origin[0] + v as i32) as f32,
                        (origin[1] + h as i32) as f32,
                        (origin[2] + d as i32) as f32,
                    );
                }
            }
        }
        out
    }
}

/// White-noise stack in [0,1), for unreliable-pair scenarios.
pub fn noise_volume(seed: u64, depth: usize, height: usize, width: usize) -> Array3<f32> {
    let mut rng = Lcg::new(seed);
    let mut out = Array3::<f32>::zeros((depth, height, width));
    for value in out.iter_mut() {
        *value = rng.next_f32();
    }
    out
}

/// Add uniform noise of the given amplitude, clamped to [0,1].
pub fn add_noise(stack: &mut Array3<f32>, seed: u64, amplitude: f32) {
    let mut rng = Lcg::new(seed);
    for value in stack.iter_mut() {
        *value = (*value + rng.range_f32(-amplitude, amplitude)).clamp(0.0, 1.0);
    }
}

use tilefuse_core::grid::{TileShape, VolumeGrid};
use tilefuse_core::io::MemoryTile;
use tilefuse_core::mipncc::NccParams;
use tilefuse_core::pipeline::config::StitchConfig;

/// Per-tile placement jitter of the shared 2x2 end-to-end fixture.
pub const JITTER_2X2: [[[i32; 3]; 2]; 2] = [
    [[0, 0, 0], [1, 2, -1]],
    [[-2, 1, 2], [1, -1, 1]],
];

/// True absolute position of a fixture tile; (0,0) sits at the origin, so
/// these equal the expected post-normalization coordinates.
pub fn truth_2x2(r: usize, c: usize) -> [i32; 3] {
    let j = JITTER_2X2[r][c];
    [24 * r as i32 + j[0], 24 * c as i32 + j[1], j[2]]
}

/// A 2x2 grid of 48x48x24 tiles with 24-voxel overlaps, all sampling one
/// smooth scene from their true (jittered) origins.
pub fn grid_2x2() -> (VolumeGrid, Vec<MemoryTile>) {
    let shape = TileShape {
        height: 48,
        width: 48,
        depth: 24,
    };
    let grid = VolumeGrid::new(2, 2, shape, 8, 1, 24, 24).unwrap();
    let scene = BlobScene::new(1234, 30, [76.0, 76.0, 28.0], 1.6);
    let mut tiles = Vec::new();
    for r in 0..2 {
        for c in 0..2 {
            tiles.push(MemoryTile::new(scene.render(truth_2x2(r, c), 24, 48, 48)));
        }
    }
    (grid, tiles)
}

/// Stitch parameters matched to the fixture's small tiles.
pub fn config_2x2() -> StitchConfig {
    StitchConfig {
        search_radius_v: 4,
        search_radius_h: 4,
        search_radius_d: 3,
        subvol_dim_d: 12,
        reliability_threshold: 0.7,
        ncc: NccParams {
            min_dim_ncc_src: 8,
            ..NccParams::default()
        },
        ..StitchConfig::default()
    }
}
