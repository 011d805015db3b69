//! Score, level, lives and multiplier

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::piece::GamePiece;

/// Points per cleared block at multiplier 1
const POINTS_PER_BLOCK: u32 = 10;

/// Score needed per level
const POINTS_PER_LEVEL: u32 = 1000;

/// Observable game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub score: u32,
    /// Always `score / 1000`
    pub level: u32,
    pub lives: u32,
    /// Starts at 1, grows with consecutive clears
    pub multiplier: u32,
}

impl GameState {
    /// Fresh state with the given lives
    pub fn new(lives: u32) -> Self {
        Self {
            score: 0,
            level: 0,
            lives,
            multiplier: 1,
        }
    }

    /// Score one placement round
    ///
    /// Returns the points awarded. A round without lines awards nothing and resets the
    /// multiplier.
    pub fn record_round(&mut self, lines: u32, blocks: u32) -> u32 {
        let points = if lines > 0 {
            let points = lines
                .saturating_mul(blocks)
                .saturating_mul(POINTS_PER_BLOCK)
                .saturating_mul(self.multiplier);
            self.score = self.score.saturating_add(points);
            self.multiplier = self.multiplier.saturating_add(1);
            points
        } else {
            self.multiplier = 1;
            0
        };
        self.level = self.score / POINTS_PER_LEVEL;
        points
    }

    /// Lose one life on countdown expiry
    ///
    /// Returns true when no lives are left.
    pub fn lose_life(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        self.multiplier = 1;
        self.lives == 0
    }

    pub fn is_dead(&self) -> bool {
        self.lives == 0
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(3)
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "score {} level {} lives {} x{}",
            self.score, self.level, self.lives, self.multiplier
        )
    }
}

/// Result of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameSummary {
    pub score: u32,
    pub level: u32,
    /// Rows plus columns cleared over the whole game
    pub lines_cleared: u32,
    pub highest_multiplier: u32,
}

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Pieces spawned, countdown not running
    Created,
    Running,
    /// Terminal
    Over,
}

/// Point-in-time copy of everything a front end needs to draw the game
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub state: GameState,
    /// Rows top to bottom
    pub grid: Vec<Vec<u8>>,
    pub current: GamePiece,
    pub next: GamePiece,
}

impl GameSnapshot {
    pub(crate) fn capture(
        phase: GamePhase,
        state: GameState,
        grid: &Grid,
        current: GamePiece,
        next: GamePiece,
    ) -> Self {
        Self {
            phase,
            state,
            grid: grid.to_rows(),
            current,
            next,
        }
    }
}
