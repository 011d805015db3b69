//! Multiplayer support: wire vocabulary, transport seam, leaderboard and the sync adapter

// Module declarations
pub mod leaderboard;
pub mod protocol;
pub mod sync;
pub mod transport;

// Re-exports for convenience
pub use leaderboard::{Leaderboard, LeaderboardEntry, Lives};
pub use protocol::{InboundMessage, OutboundMessage};
pub use sync::{MultiplayerSync, SyncHooks};
pub use transport::{ListenerId, LoopbackTransport, MessageListener, Transport};
