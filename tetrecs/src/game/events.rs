//! Notifications published by the engine

use std::collections::HashSet;
use std::time::Duration;

use crate::grid::Coordinate;
use crate::piece::GamePiece;

use super::state::GameState;

/// Everything a front end observes about a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Current or next piece changed
    NextPiece { current: GamePiece, next: GamePiece },
    /// Full lines detected; the cells are zeroed after the clear delay
    LinesCleared(HashSet<Coordinate>),
    /// Countdown (re)started with this length
    CountdownReset { delay: Duration },
    /// Score, lives or multiplier changed
    StateChanged(GameState),
    /// Sent once, when the last life is lost
    GameOver,
}
