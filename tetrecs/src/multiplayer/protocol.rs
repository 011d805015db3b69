//! Wire vocabulary of the multiplayer server
//!
//! Messages are single strings of the form `COMMAND payload`. The command ends at the
//! first space; everything after it is the payload, which may span several lines.

use std::fmt;

use crate::error::{Result, TetrecsError};

/// Message received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Next piece index for the local queue
    Piece(u32),
    /// Leaderboard lines, `name:score:lives`
    Scores(Vec<String>),
    /// Online high-score list, `name:score` per line
    HiScores(String),
}

impl InboundMessage {
    /// Parse one message
    pub fn parse(message: &str) -> Result<Self> {
        let message = message.trim_end_matches(['\r', '\n']);
        let (command, payload) = message.split_once(' ').unwrap_or((message, ""));
        match command {
            "PIECE" => {
                let index = payload
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| TetrecsError::malformed(message, e.to_string()))?;
                Ok(InboundMessage::Piece(index))
            }
            "SCORES" => Ok(InboundMessage::Scores(
                payload
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            "HISCORES" => Ok(InboundMessage::HiScores(payload.to_string())),
            "" => Err(TetrecsError::malformed(message, "empty message")),
            other => Err(TetrecsError::UnknownCommand(other.to_string())),
        }
    }
}

/// Message sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Ask for one more piece
    RequestPiece,
    Score(u32),
    Lives(u32),
    /// Ask for the online high-score list
    RequestHiScores,
    /// Submit a high score
    HiScore { name: String, score: u32 },
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundMessage::RequestPiece => write!(f, "PIECE"),
            OutboundMessage::Score(score) => write!(f, "SCORE {}", score),
            OutboundMessage::Lives(lives) => write!(f, "LIVES {}", lives),
            OutboundMessage::RequestHiScores => write!(f, "HISCORES"),
            OutboundMessage::HiScore { name, score } => write!(f, "HISCORE {}:{}", name, score),
        }
    }
}
