//! Extension points called by the engine
//!
//! Hooks let a multiplayer adapter react to spawns, scoring and countdown ticks without
//! the engine knowing about the network. Every method defaults to a no-op.

use crate::piece::GamePiece;

use super::state::GameState;

/// Callbacks invoked synchronously by [`Game`](super::Game)
pub trait GameHooks: Send {
    /// A piece was drawn from the piece source
    fn on_spawn(&mut self, _piece: &GamePiece) {}

    /// A placement round was scored
    fn on_score(&mut self, _state: &GameState) {}

    /// The countdown expired and a life was taken
    fn on_tick(&mut self, _state: &GameState) {}
}

/// No hooks
impl GameHooks for () {}
