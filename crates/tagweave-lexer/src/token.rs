//! Token types produced by the lexer.

use std::fmt;

use crate::position::Span;

/// A `key` or `key=value` pair written inside an opening tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        Self {
            key: key.into(),
            value: value.map(Into::into),
        }
    }

    /// A valueless attribute such as `nofollow`.
    pub fn flag(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// Writes the attribute back in tag syntax, quoting the value.
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)?;
        if let Some(value) = &self.value {
            f.write_str("=\"")?;
            for c in value.chars() {
                if matches!(c, '"' | '\\') {
                    f.write_str("\\")?;
                }
                write!(f, "{}", c)?;
            }
            f.write_str("\"")?;
        }
        Ok(())
    }
}

/// What a token is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of literal text, whitespace preserved. Escapes are already
    /// resolved, so the text may differ from the source slice.
    Literal(String),

    /// `[name attrs]` or, with `self_closing`, `[name attrs/]`.
    TagOpen {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },

    /// `[/name]`
    TagClose { name: String },
}

/// A token together with the source range it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The tag name for open and close tokens.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Literal(_) => None,
            TokenKind::TagOpen { name, .. } | TokenKind::TagClose { name } => Some(name),
        }
    }
}
