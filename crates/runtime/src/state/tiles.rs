//! Per-cell knowledge of the grid.

use zk::Commitment;

use super::ledger::CommitmentLedger;
use super::types::{CommitmentMetadata, Tile, TileKnowledge, WorldCoords};

#[derive(Debug, Clone, Default)]
struct Cell {
    knowledge: TileKnowledge,
    /// Commitments that hash to this cell, in first-seen order.
    metas: Vec<Commitment>,
}

/// Largest grid the client keeps a full cell map for.
pub const MAX_GRID_UPPER_BOUND: u64 = 4096;

/// `gridUpperBound × gridUpperBound` cells, all unknown at session start.
///
/// Cells only reference commitments; metadata is resolved against the ledger
/// when a snapshot is taken, so supersession is always reflected.
#[derive(Debug, Clone)]
pub struct TileGrid {
    size: u64,
    cells: Vec<Cell>,
}

impl TileGrid {
    /// `None` when `size` exceeds [`MAX_GRID_UPPER_BOUND`].
    pub fn new(size: u64) -> Option<Self> {
        if size > MAX_GRID_UPPER_BOUND {
            return None;
        }
        let side = usize::try_from(size).ok()?;
        let len = side.checked_mul(side)?;
        Some(Self {
            size,
            cells: vec![Cell::default(); len],
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn contains(&self, x: u64, y: u64) -> bool {
        x < self.size && y < self.size
    }

    fn cell_mut(&mut self, x: u64, y: u64) -> Option<&mut Cell> {
        if !self.contains(x, y) {
            return None;
        }
        let index = (x * self.size + y) as usize;
        self.cells.get_mut(index)
    }

    fn cell(&self, x: u64, y: u64) -> Option<&Cell> {
        if !self.contains(x, y) {
            return None;
        }
        self.cells.get((x * self.size + y) as usize)
    }

    /// Marks a cell known. Returns `true` on the first transition.
    pub fn reveal(&mut self, x: u64, y: u64) -> bool {
        match self.cell_mut(x, y) {
            Some(cell) if cell.knowledge == TileKnowledge::Unknown => {
                cell.knowledge = TileKnowledge::Known;
                true
            }
            _ => false,
        }
    }

    /// Associates a posted commitment with the cell it hashes to.
    pub fn attach(&mut self, x: u64, y: u64, commitment: Commitment) {
        if let Some(cell) = self.cell_mut(x, y) {
            if !cell.metas.contains(&commitment) {
                cell.metas.push(commitment);
            }
        }
    }

    pub fn knowledge(&self, x: u64, y: u64) -> Option<TileKnowledge> {
        self.cell(x, y).map(|cell| cell.knowledge)
    }

    pub fn known_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.knowledge == TileKnowledge::Known)
            .count()
    }

    /// Resolves one cell for display.
    ///
    /// Each metadata `block_num` is rewritten as the number of blocks between
    /// the post and `latest_block`.
    pub fn tile(&self, x: u64, y: u64, ledger: &CommitmentLedger, latest_block: u64) -> Option<Tile> {
        let cell = self.cell(x, y)?;
        let metas = cell
            .metas
            .iter()
            .filter_map(|commitment| ledger.metadata(commitment))
            .map(|meta| CommitmentMetadata {
                block_num: latest_block.saturating_sub(meta.block_num),
                ..meta.clone()
            })
            .collect();

        Some(Tile {
            coords: WorldCoords::new(x, y),
            tile_type: cell.knowledge,
            metas,
        })
    }

    /// Every cell, indexed `[x][y]`.
    pub fn snapshot(&self, ledger: &CommitmentLedger, latest_block: u64) -> Vec<Vec<Tile>> {
        (0..self.size)
            .map(|x| {
                (0..self.size)
                    .filter_map(|y| self.tile(x, y, ledger, latest_block))
                    .collect()
            })
            .collect()
    }
}
