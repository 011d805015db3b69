//! Grid module - the board of cell values
//!
//! The grid is a `cols x rows` matrix where `0` is an empty cell and `1..=15` is a cell
//! filled by the piece with that value. Cells are stored in a flat row-major vector.
//!
//! Line handling is two-phase: [`Grid::detect_full_lines`] only reports the cells of
//! every full row and column, and [`Grid::clear_cells`] zeroes them later. Callers run
//! their clear effect in between.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::piece::{GamePiece, PIECE_COUNT};

/// Position of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Full rows and columns found by [`Grid::detect_full_lines`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineClear {
    /// Indices of full rows
    pub rows: Vec<i32>,
    /// Indices of full columns
    pub cols: Vec<i32>,
    /// Every cell of every full line, intersections counted once
    pub cells: HashSet<Coordinate>,
}

impl LineClear {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of full rows plus full columns
    pub fn lines(&self) -> u32 {
        (self.rows.len() + self.cols.len()) as u32
    }

    /// Number of distinct cells to clear
    pub fn blocks(&self) -> u32 {
        self.cells.len() as u32
    }
}

/// Grid position of a piece cell; None when it lies outside the `i32` range
fn piece_cell(x: i32, y: i32, (dx, dy): (i32, i32)) -> Option<(i32, i32)> {
    Some((x.checked_add(dx)?, y.checked_add(dy)?))
}

/// The game grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cols: usize,
    rows: usize,
    /// Row-major cells (y * cols + x)
    cells: Vec<u8>,
}

impl Grid {
    /// Create an empty grid
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![0; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|x| *x < self.cols)?;
        let y = usize::try_from(y).ok().filter(|y| *y < self.rows)?;
        Some(y * self.cols + x)
    }

    /// Get cell value at (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        self.index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell value at (x, y)
    /// Out-of-bounds writes are ignored; placement validation bounds-checks first
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        debug_assert!(value <= PIECE_COUNT, "cell value {} out of range", value);
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = value;
        }
    }

    /// Check whether a piece centred on (x, y) fits
    ///
    /// Every filled piece cell must land on an in-bounds empty grid cell.
    pub fn can_place_piece(&self, piece: &GamePiece, x: i32, y: i32) -> bool {
        piece.offsets().all(|offset| {
            piece_cell(x, y, offset).is_some_and(|(cx, cy)| self.get(cx, cy) == Some(0))
        })
    }

    /// Write a piece centred on (x, y) into the grid
    ///
    /// Assumes [`Grid::can_place_piece`] has been checked; occupied cells are overwritten.
    pub fn place_piece(&mut self, piece: &GamePiece, x: i32, y: i32) {
        let value = piece.value();
        for (cx, cy) in piece.offsets().filter_map(|offset| piece_cell(x, y, offset)) {
            self.set(cx, cy, value);
        }
    }

    /// Whether every cell of row `y` is filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= self.rows {
            return false;
        }
        let start = y * self.cols;
        self.cells[start..start + self.cols].iter().all(|v| *v != 0)
    }

    /// Whether every cell of column `x` is filled
    pub fn is_col_full(&self, x: usize) -> bool {
        if x >= self.cols {
            return false;
        }
        (0..self.rows).all(|y| self.cells[y * self.cols + x] != 0)
    }

    /// Find every full row and column without modifying the grid
    pub fn detect_full_lines(&self) -> LineClear {
        let mut clear = LineClear::default();

        for y in 0..self.rows {
            if self.is_row_full(y) {
                clear.rows.push(y as i32);
                clear
                    .cells
                    .extend((0..self.cols).map(|x| Coordinate::new(x as i32, y as i32)));
            }
        }

        for x in 0..self.cols {
            if self.is_col_full(x) {
                clear.cols.push(x as i32);
                clear
                    .cells
                    .extend((0..self.rows).map(|y| Coordinate::new(x as i32, y as i32)));
            }
        }

        clear
    }

    /// Zero the given cells
    pub fn clear_cells<'a>(&mut self, cells: impl IntoIterator<Item = &'a Coordinate>) {
        for coord in cells {
            self.set(coord.x, coord.y, 0);
        }
    }

    /// Zero every cell
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Row-major view of all cells
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Rows as vectors, top to bottom
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.cells.chunks(self.cols).map(|row| row.to_vec()).collect()
    }
}
