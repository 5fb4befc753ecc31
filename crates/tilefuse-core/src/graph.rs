use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};
use crate::grid::EdgeKind;
use crate::mipncc::NccDescriptor;

/// Identity of an edge: its kind plus the grid position of its first tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId {
    pub kind: EdgeKind,
    pub row: usize,
    pub col: usize,
}

impl EdgeId {
    pub fn north_south(row: usize, col: usize) -> Self {
        Self {
            kind: EdgeKind::NorthSouth,
            row,
            col,
        }
    }

    pub fn west_east(row: usize, col: usize) -> Self {
        Self {
            kind: EdgeKind::WestEast,
            row,
            col,
        }
    }

    /// Grid position of the edge's second tile.
    pub fn second(&self) -> (usize, usize) {
        match self.kind {
            EdgeKind::NorthSouth => (self.row + 1, self.col),
            EdgeKind::WestEast => (self.row, self.col + 1),
        }
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} edge at ({},{})", self.kind, self.row, self.col)
    }
}

/// One candidate displacement measured on a single D-chunk of an edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateDisplacement {
    /// (V,H,D) offset of the second tile relative to the first, beyond the
    /// nominal overlap.
    pub coord: [i32; 3],
    pub ncc_max: [f32; 3],
    pub ncc_width: [i32; 3],
    /// Index of the D-chunk that produced this candidate.
    pub chunk: usize,
    /// Slice bounds `[d0, d1)` of that chunk.
    pub d0: usize,
    pub d1: usize,
}

impl CandidateDisplacement {
    pub fn new(descr: NccDescriptor, chunk: usize, d0: usize, d1: usize) -> Self {
        Self {
            coord: descr.coord,
            ncc_max: descr.ncc_max,
            ncc_width: descr.ncc_width,
            chunk,
            d0,
            d1,
        }
    }
}

/// Candidates plus, once projection has run, the consensus for one edge.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EdgeDisplacements {
    pub candidates: Vec<CandidateDisplacement>,
    pub consensus: Option<NccDescriptor>,
}

/// Undirected displacement graph over the tile grid.
///
/// Stored as an index-keyed adjacency array of `2·R·C` slots: one SOUTH and
/// one EAST slot per tile position. The last row's SOUTH slots and the last
/// column's EAST slots stay unused; no pointer-chased nodes anywhere.
#[derive(Clone, Debug)]
pub struct DisplacementGraph {
    rows: usize,
    cols: usize,
    edges: Vec<EdgeDisplacements>,
}

impl DisplacementGraph {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            edges: vec![EdgeDisplacements::default(); 2 * rows * cols],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    fn slot(&self, id: EdgeId) -> Option<usize> {
        let base = id.row * self.cols + id.col;
        match id.kind {
            EdgeKind::NorthSouth if id.row + 1 < self.rows && id.col < self.cols => Some(base),
            EdgeKind::WestEast if id.row < self.rows && id.col + 1 < self.cols => {
                Some(self.rows * self.cols + base)
            }
            _ => None,
        }
    }

    pub fn contains(&self, id: EdgeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&EdgeDisplacements> {
        self.slot(id).map(|s| &self.edges[s])
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut EdgeDisplacements> {
        self.slot(id).map(move |s| &mut self.edges[s])
    }

    pub fn append_candidates(
        &mut self,
        id: EdgeId,
        candidates: Vec<CandidateDisplacement>,
    ) -> Result<()> {
        let edge = self
            .edge_mut(id)
            .ok_or_else(|| StitchError::InvalidInput(format!("no {id} in the grid")))?;
        edge.candidates.extend(candidates);
        Ok(())
    }

    pub fn set_consensus(&mut self, id: EdgeId, descr: NccDescriptor) -> Result<()> {
        let edge = self
            .edge_mut(id)
            .ok_or_else(|| StitchError::InvalidInput(format!("no {id} in the grid")))?;
        edge.consensus = Some(descr);
        Ok(())
    }

    /// All valid edges in a fixed order: N-S edges row-major, then W-E.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        let ns = (0..self.rows.saturating_sub(1))
            .flat_map(move |r| (0..self.cols).map(move |c| EdgeId::north_south(r, c)));
        let we = (0..self.rows).flat_map(move |r| {
            (0..self.cols.saturating_sub(1)).map(move |c| EdgeId::west_east(r, c))
        });
        ns.chain(we)
    }

    /// Edges incident to a tile, in N, S, W, E order.
    pub fn incident(&self, row: usize, col: usize) -> Vec<EdgeId> {
        let mut ids = Vec::with_capacity(4);
        if row > 0 {
            ids.push(EdgeId::north_south(row - 1, col));
        }
        if row + 1 < self.rows {
            ids.push(EdgeId::north_south(row, col));
        }
        if col > 0 {
            ids.push(EdgeId::west_east(row, col - 1));
        }
        if col + 1 < self.cols {
            ids.push(EdgeId::west_east(row, col));
        }
        ids
    }

    /// The edge joining two adjacent tiles, plus whether `a` is its first
    /// tile. `None` when the tiles are not grid neighbors.
    pub fn between(
        &self,
        a: (usize, usize),
        b: (usize, usize),
    ) -> Option<(EdgeId, bool)> {
        let id = if a.1 == b.1 && a.0 + 1 == b.0 {
            Some((EdgeId::north_south(a.0, a.1), true))
        } else if a.1 == b.1 && b.0 + 1 == a.0 {
            Some((EdgeId::north_south(b.0, b.1), false))
        } else if a.0 == b.0 && a.1 + 1 == b.1 {
            Some((EdgeId::west_east(a.0, a.1), true))
        } else if a.0 == b.0 && b.1 + 1 == a.1 {
            Some((EdgeId::west_east(b.0, b.1), false))
        } else {
            None
        };
        id.filter(|(id, _)| self.contains(*id))
    }
}
