/// Error types for the tetrecs library
use thiserror::Error;

/// Result type alias for tetrecs operations
pub type Result<T> = std::result::Result<T, TetrecsError>;

/// Errors that can occur in tetrecs operations
#[derive(Debug, Error)]
pub enum TetrecsError {
    /// Piece index outside of the catalog
    #[error("Invalid piece index: {0}. Must be in 0..15")]
    InvalidPieceIndex(u32),

    /// Network message that could not be parsed
    #[error("Malformed message '{message}': {reason}")]
    MalformedMessage {
        /// Offending message text
        message: String,
        /// What was wrong with it
        reason: String,
    },

    /// Network message with a command outside of the vocabulary
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Score line that is not `name:score`
    #[error("Malformed score line: {0}")]
    MalformedScore(String),

    /// Leaderboard line that is not `name:score:lives`
    #[error("Malformed leaderboard line: {0}")]
    MalformedLeaderboard(String),

    /// Channel peer has been dropped
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TetrecsError {
    pub(crate) fn malformed(message: &str, reason: impl Into<String>) -> Self {
        TetrecsError::MalformedMessage {
            message: message.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_display() {
        let err = TetrecsError::malformed("PIECE x", "piece index is not a number");
        assert_eq!(
            err.to_string(),
            "Malformed message 'PIECE x': piece index is not a number"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: TetrecsError = io.into();
        assert!(matches!(err, TetrecsError::Io(_)));
    }
}
