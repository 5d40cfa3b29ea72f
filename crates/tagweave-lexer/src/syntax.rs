//! Delimiter configuration.
//!
//! A [`Syntax`] describes how tags are spelled. The default is BBCode style:
//!
//! ```text
//! [name attr=value]content[/name]     paired tag
//! [name attr=value/]                  self-closing tag
//! [[                                  escaped literal "["
//! ```
//!
//! Delimiters can be any non-empty strings, so `<b>..</b>` or
//! `{%b%}..{%/b%}` work as well. Build custom syntaxes through
//! [`SyntaxSpec`], which is also the serde representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::Attribute;

/// Errors raised when a delimiter configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("the {which} delimiter must not be empty")]
    EmptyDelimiter { which: &'static str },

    #[error("open and close delimiters must differ (both are {0:?})")]
    SameDelimiters(String),

    #[error("the {which} delimiter must not start with whitespace")]
    LeadingWhitespace { which: &'static str },

    #[error("{0:?} cannot be used as a tag marker")]
    InvalidMarker(char),
}

/// Plain description of a syntax, as written in configuration files.
///
/// Every field is optional and falls back to the BBCode value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxSpec {
    pub open: String,
    pub close: String,
    pub end_marker: char,
    pub self_close_marker: char,
}

impl Default for SyntaxSpec {
    fn default() -> Self {
        Self {
            open: "[".to_string(),
            close: "]".to_string(),
            end_marker: '/',
            self_close_marker: '/',
        }
    }
}

impl SyntaxSpec {
    /// Validates the delimiters and markers and turns them into a usable [`Syntax`].
    pub fn build(self) -> Result<Syntax, SyntaxError> {
        Syntax::try_from(self)
    }
}

/// Validated delimiter configuration used by the lexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SyntaxSpec", into = "SyntaxSpec")]
pub struct Syntax {
    open: String,
    close: String,
    end_marker: char,
    self_close_marker: char,
}

impl Default for Syntax {
    fn default() -> Self {
        Self::bbcode()
    }
}

impl Syntax {
    /// `[b]bold[/b]`, `[br/]`.
    pub fn bbcode() -> Self {
        Self {
            open: "[".to_string(),
            close: "]".to_string(),
            end_marker: '/',
            self_close_marker: '/',
        }
    }

    /// `<b>bold</b>`, `<br/>`.
    pub fn angle() -> Self {
        Self {
            open: "<".to_string(),
            close: ">".to_string(),
            end_marker: '/',
            self_close_marker: '/',
        }
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    pub fn end_marker(&self) -> char {
        self.end_marker
    }

    pub fn self_close_marker(&self) -> char {
        self.self_close_marker
    }

    /// Spells an opening (or self-closing) tag.
    pub fn open_tag(&self, name: &str, attributes: &[Attribute], self_closing: bool) -> String {
        let mut out = String::with_capacity(name.len() + self.open.len() + self.close.len() + 2);
        out.push_str(&self.open);
        out.push_str(name);
        for attr in attributes {
            out.push(' ');
            out.push_str(&attr.to_string());
        }
        if self_closing {
            out.push(self.self_close_marker);
        }
        out.push_str(&self.close);
        out
    }

    /// Spells a closing tag.
    pub fn close_tag(&self, name: &str) -> String {
        format!("{}{}{}{}", self.open, self.end_marker, name, self.close)
    }

    /// Escapes literal text so that it lexes back to itself.
    ///
    /// Every open delimiter is doubled.
    pub fn escape_literal(&self, text: &str) -> String {
        let doubled = format!("{0}{0}", self.open);
        text.replace(&self.open, &doubled)
    }
}

fn valid_marker(c: char) -> bool {
    !(c.is_whitespace() || c.is_alphanumeric() || matches!(c, '_' | '-' | '=' | '"' | '\''))
}

impl TryFrom<SyntaxSpec> for Syntax {
    type Error = SyntaxError;

    fn try_from(spec: SyntaxSpec) -> Result<Self, Self::Error> {
        for (which, delim) in [("open", &spec.open), ("close", &spec.close)] {
            if delim.is_empty() {
                return Err(SyntaxError::EmptyDelimiter { which });
            }
            if delim.starts_with(char::is_whitespace) {
                return Err(SyntaxError::LeadingWhitespace { which });
            }
        }
        if spec.open == spec.close {
            return Err(SyntaxError::SameDelimiters(spec.open));
        }
        for marker in [spec.end_marker, spec.self_close_marker] {
            if !valid_marker(marker) {
                return Err(SyntaxError::InvalidMarker(marker));
            }
        }
        Ok(Self {
            open: spec.open,
            close: spec.close,
            end_marker: spec.end_marker,
            self_close_marker: spec.self_close_marker,
        })
    }
}

impl From<Syntax> for SyntaxSpec {
    fn from(syntax: Syntax) -> Self {
        Self {
            open: syntax.open,
            close: syntax.close,
            end_marker: syntax.end_marker,
            self_close_marker: syntax.self_close_marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_bbcode() {
        let syntax = Syntax::default();
        assert_eq!(syntax.open(), "[");
        assert_eq!(syntax.close(), "]");
        assert_eq!(syntax.end_marker(), '/');
    }

    #[test]
    fn spec_builds_custom_syntax() {
        let syntax = SyntaxSpec {
            open: "{%".into(),
            close: "%}".into(),
            ..SyntaxSpec::default()
        }
        .build()
        .unwrap();
        assert_eq!(syntax.close_tag("if"), "{%/if%}");
    }

    #[test]
    fn empty_delimiter_rejected() {
        let err = SyntaxSpec {
            open: String::new(),
            ..SyntaxSpec::default()
        }
        .build()
        .unwrap_err();
        assert_eq!(err, SyntaxError::EmptyDelimiter { which: "open" });
    }

    #[test]
    fn identical_delimiters_rejected() {
        let err = SyntaxSpec {
            open: "|".into(),
            close: "|".into(),
            ..SyntaxSpec::default()
        }
        .build()
        .unwrap_err();
        assert!(matches!(err, SyntaxError::SameDelimiters(_)));
    }

    #[test]
    fn alphanumeric_marker_rejected() {
        let err = SyntaxSpec {
            end_marker: 'x',
            ..SyntaxSpec::default()
        }
        .build()
        .unwrap_err();
        assert_eq!(err, SyntaxError::InvalidMarker('x'));
    }

    #[test]
    fn open_tag_spelling() {
        let syntax = Syntax::bbcode();
        let attrs = vec![
            Attribute::new("href", Some("/a b")),
            Attribute::new("nofollow", None::<String>),
        ];
        assert_eq!(
            syntax.open_tag("link", &attrs, false),
            r#"[link href="/a b" nofollow]"#
        );
        assert_eq!(syntax.open_tag("br", &[], true), "[br/]");
    }

    #[test]
    fn escape_doubles_open_delimiter() {
        assert_eq!(Syntax::bbcode().escape_literal("a[0]"), "a[[0]");
    }

    #[test]
    fn deserializes_partial_spec() {
        let syntax: Syntax = serde_json::from_str(r#"{"open": "<", "close": ">"}"#).unwrap();
        assert_eq!(syntax, Syntax::angle());
    }

    #[test]
    fn deserialization_validates() {
        let result: Result<Syntax, _> = serde_json::from_str(r#"{"open": "", "close": ">"}"#);
        assert!(result.is_err());
    }
}
