//! On-disk project descriptor, carried between pipeline phases.
//!
//! A project file records the grid topology and metadata produced by import,
//! the stitch parameters, and every phase's outputs: candidate lists,
//! consensus displacements, absolute coordinates, stitchable flags and the
//! pairwise failure log.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};
use crate::graph::{CandidateDisplacement, DisplacementGraph, EdgeId};
use crate::grid::{EdgeKind, TileShape, VolumeGrid};
use crate::io::{RawTileReader, SlabSource};
use crate::mipncc::NccDescriptor;
use crate::pairwise::PairFailure;
use crate::pipeline::config::StitchConfig;

/// Volume-level metadata of a stitching session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolumeMeta {
    pub rows: usize,
    pub cols: usize,
    pub tile_height: usize,
    pub tile_width: usize,
    pub depth: usize,
    pub bit_depth: u8,
    pub channels: u8,
    pub overlap_v: usize,
    pub overlap_h: usize,
    /// Voxel pitch in microns (V,H,D), informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voxel_um: Option<[f32; 3]>,
    /// Directory holding the raw tile files, relative to the project file.
    pub tiles_dir: PathBuf,
}

impl VolumeMeta {
    pub fn tile_shape(&self) -> TileShape {
        TileShape {
            height: self.tile_height,
            width: self.tile_width,
            depth: self.depth,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileRecord {
    pub row: usize,
    pub col: usize,
    pub origin: [i32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs: Option<[i32; 3]>,
    #[serde(default)]
    pub stitchable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub kind: EdgeKind,
    pub row: usize,
    pub col: usize,
    #[serde(default)]
    pub candidates: Vec<CandidateDisplacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus: Option<NccDescriptor>,
}

/// The full project descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub volume: VolumeMeta,
    #[serde(default)]
    pub params: StitchConfig,
    #[serde(default)]
    pub tiles: Vec<TileRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub failures: Vec<PairFailure>,
}

impl Project {
    pub fn new(volume: VolumeMeta, params: StitchConfig) -> Self {
        Self {
            volume,
            params,
            tiles: Vec::new(),
            edges: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Build the in-memory grid from the records, validating that they form
    /// a dense rectangular grid.
    pub fn build_grid(&self) -> Result<VolumeGrid> {
        let m = &self.volume;
        let mut grid = VolumeGrid::new(
            m.rows,
            m.cols,
            m.tile_shape(),
            m.bit_depth,
            m.channels,
            m.overlap_v,
            m.overlap_h,
        )?;

        if self.tiles.is_empty() {
            return Ok(grid);
        }

        let mut seen = vec![false; m.rows * m.cols];
        for rec in &self.tiles {
            grid.try_tile(rec.row, rec.col)?;
            let i = rec.row * m.cols + rec.col;
            if seen[i] {
                return Err(StitchError::InconsistentTopology(format!(
                    "tile ({},{}) listed twice",
                    rec.row, rec.col
                )));
            }
            seen[i] = true;
            let tile = grid.tile_mut(rec.row, rec.col);
            tile.origin = rec.origin;
            tile.set_stitchable(rec.stitchable);
            if let Some(abs) = rec.abs {
                tile.set_abs(abs);
            }
        }
        if seen.iter().any(|&s| !s) {
            return Err(StitchError::InconsistentTopology(
                "tile records leave holes in the grid".into(),
            ));
        }
        Ok(grid)
    }

    /// Build the in-memory displacement graph from the edge records.
    pub fn build_graph(&self) -> Result<DisplacementGraph> {
        let mut graph = DisplacementGraph::new(self.volume.rows, self.volume.cols);
        for rec in &self.edges {
            let id = EdgeId {
                kind: rec.kind,
                row: rec.row,
                col: rec.col,
            };
            let edge = graph
                .edge_mut(id)
                .ok_or_else(|| StitchError::Project(format!("{id} outside the grid")))?;
            edge.candidates = rec.candidates.clone();
            edge.consensus = rec.consensus;
        }
        Ok(graph)
    }

    /// Refresh the records from in-memory state after a phase completes.
    pub fn sync(&mut self, grid: &VolumeGrid, graph: &DisplacementGraph) {
        self.tiles = grid
            .tiles()
            .map(|t| TileRecord {
                row: t.row(),
                col: t.col(),
                origin: t.origin,
                abs: t.abs(),
                stitchable: t.is_stitchable(),
            })
            .collect();
        self.edges = graph
            .edge_ids()
            .map(|id| {
                let e = graph.edge(id).expect("edge ids come from the graph");
                EdgeRecord {
                    kind: id.kind,
                    row: id.row,
                    col: id.col,
                    candidates: e.candidates.clone(),
                    consensus: e.consensus,
                }
            })
            .collect();
    }

    /// Open every tile's raw store, row-major, validating uniform shape.
    pub fn open_tiles(&self, project_dir: &Path) -> Result<Vec<RawTileReader>> {
        let dir = project_dir.join(&self.volume.tiles_dir);
        let shape = self.volume.tile_shape();
        let mut readers = Vec::with_capacity(self.volume.rows * self.volume.cols);
        for row in 0..self.volume.rows {
            for col in 0..self.volume.cols {
                let path = dir.join(tile_file_name(row, col));
                let reader = RawTileReader::open(&path)?;
                if reader.shape() != shape {
                    return Err(StitchError::InconsistentTopology(format!(
                        "tile {} has shape {:?}, project expects {:?}",
                        path.display(),
                        reader.shape(),
                        shape
                    )));
                }
                readers.push(reader);
            }
        }
        Ok(readers)
    }
}

/// Canonical file name of the tile at `(row, col)`.
pub fn tile_file_name(row: usize, col: usize) -> String {
    format!("r{row:03}_c{col:03}.raw")
}
