//! High-score lists
//!
//! Scores are stored one `name:score` record per line, highest first, at most
//! [`MAX_SCORES`] records.

use std::fmt;
use std::path::Path;

use crate::error::{Result, TetrecsError};

/// Records kept in a list
pub const MAX_SCORES: usize = 10;

/// Name used when the player leaves it blank
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// One high-score record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

impl ScoreEntry {
    pub fn new(name: impl Into<String>, score: u32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }

    /// Parse a `name:score` line
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, score) = line
            .rsplit_once(':')
            .ok_or_else(|| TetrecsError::MalformedScore(line.to_string()))?;
        let score = score
            .trim()
            .parse::<u32>()
            .map_err(|_| TetrecsError::MalformedScore(line.to_string()))?;
        Ok(Self::new(name, score))
    }
}

impl fmt::Display for ScoreEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.score)
    }
}

/// Turn user input into a name safe for the score format
pub fn normalize_name(name: &str) -> String {
    let name: String = name
        .trim()
        .chars()
        .map(|c| if c == ':' || c.is_control() { '_' } else { c })
        .collect();
    if name.is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        name
    }
}

/// Sorted, capped list of high scores
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreList {
    entries: Vec<ScoreEntry>,
}

impl ScoreList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name:score` lines, skipping malformed ones
    pub fn parse(text: &str) -> Self {
        let mut list = Self::new();
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            match ScoreEntry::parse(line) {
                Ok(entry) => list.entries.push(entry),
                Err(e) => tracing::warn!("Skipping score line: {}", e),
            }
        }
        list.normalize();
        list
    }

    /// Load a score file; a missing file is an empty list
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let list = Self::parse(&text);
                tracing::info!("Loaded {} scores from {}", list.len(), path.display());
                Ok(list)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No score file at {}, starting empty", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the list as `name:score` lines
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_text())?;
        tracing::info!("Saved {} scores to {}", self.len(), path.display());
        Ok(())
    }

    /// File representation, one record per line
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}\n", entry))
            .collect()
    }

    /// Add a record, keeping order and cap
    ///
    /// Returns the position of the new record, or None if it did not make the list.
    pub fn insert(&mut self, entry: ScoreEntry) -> Option<usize> {
        // After existing records with the same score
        let position = self.entries.partition_point(|e| e.score >= entry.score);
        if position >= MAX_SCORES {
            return None;
        }
        self.entries.insert(position, entry);
        self.entries.truncate(MAX_SCORES);
        Some(position)
    }

    /// Whether `score` would enter the list
    pub fn qualifies(&self, score: u32) -> bool {
        match self.lowest() {
            Some(lowest) if self.entries.len() >= MAX_SCORES => score > lowest,
            _ => true,
        }
    }

    /// Lowest recorded score
    pub fn lowest(&self) -> Option<u32> {
        self.entries.last().map(|e| e.score)
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn normalize(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_SCORES);
    }
}

/// Where a finished game's score should be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighScorePlacement {
    /// Submit to the server list
    Online,
    /// Record in the local list
    Local,
    None,
}

impl HighScorePlacement {
    /// Decide placement; the online list wins when it is known and the score beats it
    pub fn decide(score: u32, local: &ScoreList, online: Option<&ScoreList>) -> Self {
        if online.is_some_and(|online| online.qualifies(score)) {
            HighScorePlacement::Online
        } else if local.qualifies(score) {
            HighScorePlacement::Local
        } else {
            HighScorePlacement::None
        }
    }
}
