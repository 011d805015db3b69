//! Piece catalog
//!
//! Every piece is a 3x3 occupancy pattern centred on its middle cell. Patterns are
//! indexed `[x][y]`, so `blocks[0]` is the left column of the piece.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, TetrecsError};

/// Number of pieces in the catalog
pub const PIECE_COUNT: u8 = 15;

type Pattern = [[u8; 3]; 3];

// Both peers of a multiplayer game must agree on these patterns for a given index
const CATALOG: [(&str, Pattern); PIECE_COUNT as usize] = [
    ("Line", [[0, 0, 0], [1, 1, 1], [0, 0, 0]]),
    ("C", [[0, 0, 0], [1, 1, 1], [1, 0, 1]]),
    ("Plus", [[0, 1, 0], [1, 1, 1], [0, 1, 0]]),
    ("Dot", [[0, 0, 0], [0, 1, 0], [0, 0, 0]]),
    ("Square", [[1, 1, 0], [1, 1, 0], [0, 0, 0]]),
    ("L", [[0, 0, 0], [1, 1, 1], [0, 0, 1]]),
    ("J", [[0, 0, 1], [1, 1, 1], [0, 0, 0]]),
    ("S", [[0, 0, 0], [0, 1, 1], [1, 1, 0]]),
    ("Z", [[1, 1, 0], [0, 1, 1], [0, 0, 0]]),
    ("T", [[1, 0, 0], [1, 1, 0], [1, 0, 0]]),
    ("X", [[1, 0, 1], [0, 1, 0], [1, 0, 1]]),
    ("Corner", [[0, 0, 0], [1, 1, 0], [0, 1, 0]]),
    ("Inverse Corner", [[1, 0, 0], [1, 1, 0], [0, 0, 0]]),
    ("Diagonal", [[1, 0, 0], [0, 1, 0], [0, 0, 1]]),
    ("Double", [[0, 1, 0], [0, 1, 0], [0, 0, 0]]),
];

/// A piece from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GamePiece {
    index: u8,
    #[serde(skip)]
    name: &'static str,
    blocks: [[bool; 3]; 3],
}

impl GamePiece {
    /// Create the piece for a catalog index
    pub fn new(index: u32) -> Result<Self> {
        match u8::try_from(index) {
            Ok(i) if i < PIECE_COUNT => Ok(Self::from_catalog(i)),
            _ => Err(TetrecsError::InvalidPieceIndex(index)),
        }
    }

    /// Build the catalog entry `index % PIECE_COUNT`
    pub(crate) fn from_catalog(index: u8) -> Self {
        let index = index % PIECE_COUNT;
        let (name, pattern) = CATALOG[index as usize];
        let mut blocks = [[false; 3]; 3];
        for (x, column) in pattern.iter().enumerate() {
            for (y, cell) in column.iter().enumerate() {
                blocks[x][y] = *cell != 0;
            }
        }
        Self {
            index,
            name,
            blocks,
        }
    }

    /// Catalog index (0..15)
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Value written into the grid, `index + 1`
    pub fn value(&self) -> u8 {
        self.index + 1
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Occupancy pattern, indexed `[x][y]`
    pub fn blocks(&self) -> &[[bool; 3]; 3] {
        &self.blocks
    }

    /// Whether the piece fills the pattern cell at `(x, y)`, both in 0..3
    pub fn is_filled(&self, x: usize, y: usize) -> bool {
        self.blocks
            .get(x)
            .and_then(|column| column.get(y))
            .copied()
            .unwrap_or(false)
    }

    /// Filled cells as offsets from the centre, each in -1..=1
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..3).flat_map(move |x| {
            (0..3).filter_map(move |y| {
                self.blocks[x][y].then(|| (x as i32 - 1, y as i32 - 1))
            })
        })
    }

    /// Number of filled cells
    pub fn block_count(&self) -> usize {
        self.offsets().count()
    }

    /// Same piece rotated 90 degrees clockwise
    pub fn rotated(&self) -> Self {
        let mut blocks = [[false; 3]; 3];
        for x in 0..3 {
            for y in 0..3 {
                blocks[2 - y][x] = self.blocks[x][y];
            }
        }
        Self { blocks, ..*self }
    }
}

impl fmt::Display for GamePiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.index)
    }
}

/// Create the catalog piece for an index
///
/// Same as [`GamePiece::new`]; kept as a free function for call sites that map indices
pub fn create_piece(index: u32) -> Result<GamePiece> {
    GamePiece::new(index)
}
