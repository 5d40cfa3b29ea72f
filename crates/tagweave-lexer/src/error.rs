//! Lexical errors.

use thiserror::Error;

use crate::position::Position;

/// Errors raised while splitting template source into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A tag was opened but its close delimiter never appeared.
    #[error("unterminated tag starting at {position}")]
    UnterminatedTag { position: Position },

    /// Something inside a tag marker is not a valid attribute.
    #[error("invalid attribute at {position}: {reason}")]
    InvalidAttribute { position: Position, reason: String },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedTag { position } | LexError::InvalidAttribute { position, .. } => {
                *position
            }
        }
    }
}

/// Result type for lexer operations.
pub type Result<T> = std::result::Result<T, LexError>;
