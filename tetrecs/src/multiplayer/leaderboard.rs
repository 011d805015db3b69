//! Leaderboard view-model built from `SCORES` messages

use std::fmt;

use crate::error::{Result, TetrecsError};

/// Remaining lives of a leaderboard player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lives {
    Alive(u32),
    Dead,
}

/// One player on the leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub lives: Lives,
}

impl LeaderboardEntry {
    /// Parse a `name:score:lives` line, where lives is a count or `DEAD`
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.trim().split(':').collect();
        let [name, score, lives] = parts.as_slice() else {
            return Err(TetrecsError::MalformedLeaderboard(line.to_string()));
        };
        let score = score
            .parse::<u32>()
            .map_err(|_| TetrecsError::MalformedLeaderboard(line.to_string()))?;
        let lives = match *lives {
            "DEAD" => Lives::Dead,
            count => count
                .parse::<u32>()
                .map(Lives::Alive)
                .map_err(|_| TetrecsError::MalformedLeaderboard(line.to_string()))?,
        };
        Ok(Self {
            name: name.to_string(),
            score,
            lives,
        })
    }

    pub fn is_dead(&self) -> bool {
        self.lives == Lives::Dead
    }
}

impl fmt::Display for LeaderboardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lives {
            Lives::Alive(n) => write!(f, "{}: {} ({} Lives)", self.name, self.score, n),
            Lives::Dead => write!(f, "{}: {} (DEAD)", self.name, self.score),
        }
    }
}

/// Latest leaderboard, in server order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Build from raw lines, skipping and logging the ones that do not parse
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match LeaderboardEntry::parse(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping leaderboard line: {}", e);
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
