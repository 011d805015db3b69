//! # tetrecs
//!
//! Game state engine for a grid-placement puzzle game with optional networked
//! multiplayer.
//!
//! ## Overview
//!
//! Players place 3x3 pieces on a small grid. Every full row or column is cleared and
//! scored; a countdown takes a life whenever the player waits too long. The
//! [`GameSession`] owns a [`Game`] and serializes every mutation, whether it comes from
//! the player, the countdown, the deferred clear or the network.
//!
//! ## Key Features
//!
//! - Fifteen-piece catalog with rotation and swap
//! - Two-phase line clearing (detect, then clear after a delay)
//! - Multiplier scoring and level-based countdown
//! - Local random or server-fed piece sources
//! - Multiplayer sync adapter over a pluggable [`Transport`]
//! - High-score lists, settings and statistics persistence
//!
//! ## Example
//!
//! ```rust,no_run
//! use tetrecs::{GameConfig, SessionBuilder, SessionCommand, StepResult};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (mut session, _events) = SessionBuilder::new(GameConfig::default()).build();
//!     session.start();
//!     session.sender().send(SessionCommand::BlockActivated { x: 2, y: 2 })?;
//!
//!     loop {
//!         match session.step().await? {
//!             StepResult::State(state) => println!("{}", state),
//!             StepResult::GameOver(summary) => println!("Final score {}", summary.score),
//!             StepResult::Timeout => continue,
//!             StepResult::Stop => break,
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod game;
pub mod grid;
pub mod multiplayer;
pub mod piece;
pub mod piece_source;
pub mod scores;
pub mod session;
pub mod settings;
pub mod stats;

// Re-exports for convenience
pub use config::GameConfig;
pub use error::{Result, TetrecsError};
pub use game::{Game, GameEvent, GameHooks, GamePhase, GameSnapshot, GameState, GameSummary};
pub use grid::{Coordinate, Grid, LineClear};
pub use multiplayer::{LoopbackTransport, MultiplayerSync, Transport};
pub use piece::{create_piece, GamePiece, PIECE_COUNT};
pub use piece_source::{LocalPieceSource, PieceSource, RemotePieceQueue};
pub use scores::{HighScorePlacement, ScoreEntry, ScoreList};
pub use session::{GameSession, SessionBuilder, SessionCommand, StepResult};
pub use settings::{Profile, Settings};
pub use stats::Statistics;
