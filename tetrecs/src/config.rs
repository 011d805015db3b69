//! Configuration for a game

use std::time::Duration;

/// Main configuration for a game and the session driving it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Number of grid columns
    pub cols: usize,

    /// Number of grid rows
    pub rows: usize,

    /// Lives at game start
    pub starting_lives: u32,

    /// Visual-effect window between line detection and clearing (in milliseconds)
    pub clear_delay_ms: u64,

    /// Countdown length at level 0 (in milliseconds)
    pub timer_base_ms: u64,

    /// Countdown reduction per level (in milliseconds)
    pub timer_step_ms: u64,

    /// Shortest countdown regardless of level (in milliseconds)
    pub timer_floor_ms: u64,

    /// Timeout for a session step() in milliseconds
    /// step() returns when either something happened or this timeout elapses
    pub step_timeout_ms: u64,

    /// Seed for the local piece source (random if None)
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: 5,
            rows: 5,
            starting_lives: 3,
            clear_delay_ms: 500,
            timer_base_ms: 12000,
            timer_step_ms: 500,
            timer_floor_ms: 2500,
            step_timeout_ms: 1000,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grid dimensions
    pub fn with_size(mut self, cols: usize, rows: usize) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Set the number of lives at game start
    pub fn with_starting_lives(mut self, lives: u32) -> Self {
        self.starting_lives = lives;
        self
    }

    /// Set the clear effect window in milliseconds
    pub fn with_clear_delay_ms(mut self, delay_ms: u64) -> Self {
        self.clear_delay_ms = delay_ms;
        self
    }

    /// Set the countdown curve: `max(floor, base - step * level)`
    pub fn with_timer(mut self, base_ms: u64, step_ms: u64, floor_ms: u64) -> Self {
        self.timer_base_ms = base_ms;
        self.timer_step_ms = step_ms;
        self.timer_floor_ms = floor_ms;
        self
    }

    /// Set the step timeout in milliseconds
    pub fn with_step_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.step_timeout_ms = timeout_ms;
        self
    }

    /// Set the seed of the local piece source
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Countdown length for the given level
    pub fn timer_delay(&self, level: u32) -> Duration {
        let reduction = self.timer_step_ms.saturating_mul(u64::from(level));
        let ms = self
            .timer_base_ms
            .saturating_sub(reduction)
            .max(self.timer_floor_ms);
        Duration::from_millis(ms)
    }

    /// Clear effect window
    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }

    /// Step timeout
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}
