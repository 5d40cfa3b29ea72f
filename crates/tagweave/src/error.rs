//! Error types for parsing, rendering and registry configuration.
//!
//! Each pipeline stage has its own error enum so callers can match on the
//! failure they care about. [`Error`] wraps all of them for the one-shot
//! entry points such as [`render_template`](crate::render_template).
//!
//! The pipeline is fail-fast: the first error aborts the call and no
//! partial tree or partial output is ever returned.

use tagweave_lexer::{LexError, Position};
use thiserror::Error;

fn expected_close(expected: &Option<String>) -> String {
    match expected {
        Some(name) => format!("expected close of '{}'", name),
        None => "no tag is open".to_string(),
    }
}

/// Errors raised while matching tokens into a template tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    /// The tag name is not in the registry.
    #[error("unknown tag '{name}' at {position}")]
    UnknownTag { name: String, position: Position },

    /// A close tag does not match the innermost open tag.
    #[error("mismatched close tag '{found}' at {position}: {}", expected_close(.expected))]
    MismatchedClose {
        expected: Option<String>,
        found: String,
        position: Position,
    },

    /// End of input with a tag still open. The position is where it opened.
    #[error("unclosed tag '{name}' opened at {position}")]
    UnclosedTag { name: String, position: Position },

    /// A tag that does not accept nested tags got one.
    #[error("tag '{parent}' does not allow nested tag '{child}' (at {position})")]
    ChildrenNotAllowed {
        parent: String,
        child: String,
        position: Position,
    },

    /// A tag that must not contain itself was nested inside itself.
    #[error("tag '{name}' cannot be nested inside itself (at {position})")]
    SelfNestingNotAllowed { name: String, position: Position },

    /// Attributes do not satisfy the tag's schema.
    #[error("invalid attributes for tag '{name}' at {position}: {reason}")]
    InvalidAttributes {
        name: String,
        reason: String,
        position: Position,
    },

    /// A registered validator rejected the tag.
    #[error("tag '{name}' at {position} failed validation: {message}")]
    Validation {
        name: String,
        message: String,
        position: Position,
    },

    /// A parse hook rejected its body.
    #[error("tag '{name}' at {position}: {message}")]
    Hook {
        name: String,
        message: String,
        position: Position,
    },

    /// Nesting exceeds the configured limit.
    #[error("tags nested deeper than {limit} levels at {position}")]
    TooDeep { limit: usize, position: Position },
}

impl ParseError {
    /// Where in the source the error was detected.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(err) => err.position(),
            ParseError::UnknownTag { position, .. }
            | ParseError::MismatchedClose { position, .. }
            | ParseError::UnclosedTag { position, .. }
            | ParseError::ChildrenNotAllowed { position, .. }
            | ParseError::SelfNestingNotAllowed { position, .. }
            | ParseError::InvalidAttributes { position, .. }
            | ParseError::Validation { position, .. }
            | ParseError::Hook { position, .. }
            | ParseError::TooDeep { position, .. } => *position,
        }
    }
}

/// Errors raised while rendering a template tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The tree references a tag the registry no longer knows.
    #[error("unknown tag '{name}' at render time")]
    UnknownTag { name: String },

    /// The tag has neither a behavior for the requested format nor a default.
    #[error("tag '{name}' cannot render format '{format}'")]
    NoBehavior { name: String, format: String },

    /// A tag required a context value that is not bound.
    #[error("tag '{tag}' could not resolve '{path}' in the render context")]
    MissingValue { tag: String, path: String },

    /// A tag behavior reported its own failure.
    #[error("tag '{name}' failed: {message}")]
    Tag { name: String, message: String },
}

impl RenderError {
    /// Builds the error a tag behavior returns for its own failures.
    pub fn tag(name: impl Into<String>, message: impl Into<String>) -> Self {
        RenderError::Tag {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Configuration-time errors from tag registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tag '{0}' is already registered")]
    Duplicate(String),

    #[error("'{0}' is not a valid tag name")]
    InvalidName(String),

    #[error("tag '{tag}' refers to unknown behavior '{behavior}'")]
    UnknownBehavior { tag: String, behavior: String },

    #[error("tag '{tag}' refers to unknown validator '{validator}'")]
    UnknownValidator { tag: String, validator: String },

    #[error("tag '{tag}' refers to unknown decoder '{decoder}'")]
    UnknownDecoder { tag: String, decoder: String },
}

/// Errors raised while turning rendered output back into markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The tag renders in this format but cannot be decoded from it.
    #[error("tag '{name}' has no decoder for format '{format}'")]
    NoDecoder { name: String, format: String },

    /// A decoder reported its own failure.
    #[error("decoding tag '{name}' failed: {message}")]
    Tag { name: String, message: String },
}

/// Any error the engine can produce.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("context error: {0}")]
    Context(String),
}

impl From<LexError> for Error {
    fn from(err: LexError) -> Self {
        Error::Parse(ParseError::Lex(err))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
