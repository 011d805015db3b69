//! Lifetime player statistics

use serde::{Deserialize, Serialize};

use crate::game::GameSummary;

/// Counters kept across games
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    /// Number of finished games
    pub games_played: u32,
    /// Rows plus columns cleared over all games
    pub lines_cleared: u64,
    pub highest_score: u32,
    pub highest_multiplier: u32,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished game into the counters
    pub fn record_game(&mut self, summary: &GameSummary) {
        self.games_played = self.games_played.saturating_add(1);
        self.lines_cleared = self
            .lines_cleared
            .saturating_add(u64::from(summary.lines_cleared));
        self.highest_score = self.highest_score.max(summary.score);
        self.highest_multiplier = self.highest_multiplier.max(summary.highest_multiplier);
        tracing::debug!("Statistics updated: {}", self);
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Games: {}, Lines: {}, Best score: {}, Best multiplier: x{}",
            self.games_played, self.lines_cleared, self.highest_score, self.highest_multiplier
        )
    }
}
