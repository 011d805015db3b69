//! Game engine: placement, clearing, scoring and the countdown

// Module declarations
pub mod engine;
pub mod events;
pub mod hooks;
pub mod state;

// Re-exports for convenience
pub use engine::{Activation, Game, Tick};
pub use events::GameEvent;
pub use hooks::GameHooks;
pub use state::{GamePhase, GameSnapshot, GameState, GameSummary};
