//! The tokenizer.

use std::iter::FusedIterator;

use crate::error::{LexError, Result};
use crate::position::{LineIndex, Position, Span};
use crate::syntax::Syntax;
use crate::token::{Attribute, Token, TokenKind};

/// Checks if a string is a valid tag or attribute name.
///
/// Names follow CSS identifier rules, accepting both letter cases:
/// `[A-Za-z_][A-Za-z0-9_-]*`.
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_name_start(first) => chars.all(is_name_char),
        _ => false,
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Splits `source` into tokens, failing on the first lexical error.
pub fn tokenize(source: &str, syntax: &Syntax) -> Result<Vec<Token>> {
    Lexer::new(source, syntax).collect()
}

/// Streaming tokenizer over a template source.
///
/// Yields `Result<Token, LexError>` items and stops after the first error.
/// Besides plain iteration, the lexer exposes its cursor ([`rest`](Self::rest),
/// [`advance_to`](Self::advance_to)) so that callers can consume a stretch
/// of raw text without tokenizing it.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    syntax: &'a Syntax,
    lines: LineIndex,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, syntax: &'a Syntax) -> Self {
        Self {
            source,
            syntax,
            lines: LineIndex::new(source),
            pos: 0,
            done: false,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn syntax(&self) -> &'a Syntax {
        self.syntax
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The unread remainder of the source.
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Position of the next unread character.
    pub fn cursor_position(&self) -> Position {
        self.position_at(self.pos)
    }

    pub fn position_at(&self, offset: usize) -> Position {
        self.lines.position(self.source, offset)
    }

    /// Skips ahead to `offset` without producing tokens.
    ///
    /// Offsets behind the cursor or off a character boundary are ignored.
    pub fn advance_to(&mut self, offset: usize) {
        let offset = offset.min(self.source.len());
        if offset > self.pos && self.source.is_char_boundary(offset) {
            self.pos = offset;
        }
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.source.get(offset..)?.chars().next()
    }

    fn skip_ws(&self, offset: usize) -> usize {
        let rest = &self.source[offset..];
        offset + (rest.len() - rest.trim_start().len())
    }

    fn scan_name(&self, offset: usize) -> usize {
        self.source[offset..]
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map_or(self.source.len(), |(i, _)| offset + i)
    }

    fn unterminated(&self, start: usize) -> LexError {
        LexError::UnterminatedTag {
            position: self.position_at(start),
        }
    }

    fn invalid(&self, offset: usize, reason: impl Into<String>) -> LexError {
        LexError::InvalidAttribute {
            position: self.position_at(offset),
            reason: reason.into(),
        }
    }

    /// An open delimiter starts a tag only when a name follows immediately
    /// (optionally after the end marker). Anything else is literal text.
    fn looks_like_tag(&self, after_open: usize) -> bool {
        let mut offset = after_open;
        let marker = self.syntax.end_marker();
        if self.char_at(offset) == Some(marker) {
            offset += marker.len_utf8();
        }
        self.char_at(offset).is_some_and(is_name_start)
    }

    fn lex_next(&mut self) -> Result<Option<Token>> {
        if self.pos >= self.source.len() {
            return Ok(None);
        }

        let open = self.syntax.open();
        let start = self.pos;
        let mut text = String::new();
        let mut cursor = start;

        loop {
            let rest = &self.source[cursor..];
            let Some(found) = rest.find(open) else {
                text.push_str(rest);
                self.pos = self.source.len();
                return Ok(Some(self.literal(text, start)));
            };

            let at = cursor + found;
            text.push_str(&self.source[cursor..at]);
            let after = at + open.len();

            if self.source[after..].starts_with(open) {
                // Escaped delimiter
                text.push_str(open);
                cursor = after + open.len();
            } else if self.looks_like_tag(after) {
                if at > start {
                    self.pos = at;
                    return Ok(Some(self.literal(text, start)));
                }
                return self.lex_tag(at).map(Some);
            } else {
                text.push_str(open);
                cursor = after;
            }
        }
    }

    fn literal(&self, text: String, start: usize) -> Token {
        Token::new(
            TokenKind::Literal(text),
            Span::new(self.position_at(start), self.pos),
        )
    }

    fn lex_tag(&mut self, start: usize) -> Result<Token> {
        let mut cursor = start + self.syntax.open().len();
        let marker = self.syntax.end_marker();
        let closing = self.char_at(cursor) == Some(marker);
        if closing {
            cursor += marker.len_utf8();
        }

        let name_end = self.scan_name(cursor);
        let name = self.source[cursor..name_end].to_string();

        let (kind, end) = if closing {
            let end = self.expect_close(start, self.skip_ws(name_end))?;
            (TokenKind::TagClose { name }, end)
        } else {
            let (attributes, self_closing, end) = self.lex_attributes(start, &name, name_end)?;
            (
                TokenKind::TagOpen {
                    name,
                    attributes,
                    self_closing,
                },
                end,
            )
        };

        self.pos = end;
        Ok(Token::new(kind, Span::new(self.position_at(start), end)))
    }

    fn expect_close(&self, start: usize, offset: usize) -> Result<usize> {
        let close = self.syntax.close();
        if offset >= self.source.len() {
            Err(self.unterminated(start))
        } else if self.source[offset..].starts_with(close) {
            Ok(offset + close.len())
        } else {
            Err(self.invalid(offset, "closing tags take no attributes"))
        }
    }

    /// Returns the end offset when a self-close marker (plus optional
    /// whitespace) and the close delimiter sit at `offset`.
    fn self_close_at(&self, offset: usize) -> Option<usize> {
        let marker = self.syntax.self_close_marker();
        if self.char_at(offset) != Some(marker) {
            return None;
        }
        let after = self.skip_ws(offset + marker.len_utf8());
        self.source[after..]
            .starts_with(self.syntax.close())
            .then(|| after + self.syntax.close().len())
    }

    fn lex_attributes(
        &self,
        start: usize,
        name: &str,
        mut cursor: usize,
    ) -> Result<(Vec<Attribute>, bool, usize)> {
        let close = self.syntax.close();
        let mut attributes = Vec::new();

        // BBCode shorthand: [color=red]
        if self.char_at(cursor) == Some('=') {
            let (value, end) = self.lex_value(start, self.skip_ws(cursor + 1))?;
            attributes.push(Attribute {
                key: name.to_string(),
                value: Some(value),
            });
            cursor = end;
        }

        loop {
            cursor = self.skip_ws(cursor);
            let rest = &self.source[cursor..];
            let Some(c) = rest.chars().next() else {
                return Err(self.unterminated(start));
            };

            if rest.starts_with(close) {
                return Ok((attributes, false, cursor + close.len()));
            }
            if let Some(end) = self.self_close_at(cursor) {
                return Ok((attributes, true, end));
            }
            if c == self.syntax.self_close_marker() {
                let after = self.skip_ws(cursor + c.len_utf8());
                if after >= self.source.len() {
                    return Err(self.unterminated(start));
                }
                return Err(self.invalid(after, "expected close delimiter after self-close marker"));
            }
            if !is_name_start(c) {
                return Err(self.invalid(cursor, format!("unexpected character {:?}", c)));
            }

            let key_end = self.scan_name(cursor);
            let key = self.source[cursor..key_end].to_string();
            cursor = key_end;

            let after_key = self.skip_ws(cursor);
            let value = if self.char_at(after_key) == Some('=') {
                let (value, end) = self.lex_value(start, self.skip_ws(after_key + 1))?;
                cursor = end;
                Some(value)
            } else {
                None
            };
            attributes.push(Attribute { key, value });
        }
    }

    /// A bare value runs to whitespace, a quote, `=` or the close delimiter.
    /// A trailing self-close marker belongs to the value, as with unquoted
    /// HTML attributes: `[url=http://a.b/]` keeps the slash.
    fn lex_value(&self, start: usize, cursor: usize) -> Result<(String, usize)> {
        match self.char_at(cursor) {
            None => Err(self.unterminated(start)),
            Some(quote @ ('"' | '\'')) => {
                let body = cursor + quote.len_utf8();
                let mut value = String::new();
                let mut chars = self.source[body..].char_indices();
                while let Some((i, c)) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some((_, escaped @ ('"' | '\'' | '\\'))) => value.push(escaped),
                            Some((_, other)) => {
                                value.push('\\');
                                value.push(other);
                            }
                            None => break,
                        },
                        c if c == quote => return Ok((value, body + i + c.len_utf8())),
                        c => value.push(c),
                    }
                }
                Err(self.unterminated(start))
            }
            Some(_) => {
                let close = self.syntax.close();
                let mut end = cursor;
                for (i, c) in self.source[cursor..].char_indices() {
                    let at = cursor + i;
                    if c.is_whitespace()
                        || matches!(c, '"' | '\'' | '=')
                        || self.source[at..].starts_with(close)
                    {
                        break;
                    }
                    end = at + c.len_utf8();
                }
                if end == cursor {
                    return Err(self.invalid(cursor, "expected a value after '='"));
                }
                Ok((self.source[cursor..end].to_string(), end))
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.lex_next() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Lexer<'_> {}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn valid_name() -> impl Strategy<Value = String> {
        "[a-zA-Z_][a-zA-Z0-9_-]{0,10}"
    }

    fn plain_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .,!?:;'\"\n\t]{0,50}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn plain_text_is_one_literal(content in plain_text()) {
            let tokens = tokenize(&content, &Syntax::default()).unwrap();
            if content.is_empty() {
                prop_assert!(tokens.is_empty());
            } else {
                prop_assert_eq!(tokens.len(), 1);
                prop_assert_eq!(&tokens[0].kind, &TokenKind::Literal(content.clone()));
            }
        }

        #[test]
        fn valid_names_accepted(name in valid_name()) {
            prop_assert!(is_valid_name(&name));
        }

        #[test]
        fn wrapped_text_tokenizes_to_three(name in valid_name(), content in "[a-z ]{1,20}") {
            let source = format!("[{name}]{content}[/{name}]");
            let tokens = tokenize(&source, &Syntax::default()).unwrap();
            prop_assert_eq!(tokens.len(), 3);
            prop_assert_eq!(tokens[2].tag_name(), Some(name.as_str()));
        }

        #[test]
        fn escaped_text_lexes_back(content in "[a-z\\[\\] ]{0,40}") {
            let syntax = Syntax::default();
            let escaped = syntax.escape_literal(&content);
            let text: String = tokenize(&escaped, &syntax)
                .unwrap()
                .into_iter()
                .map(|t| match t.kind {
                    TokenKind::Literal(s) => s,
                    other => panic!("unexpected token {other:?}"),
                })
                .collect();
            prop_assert_eq!(text, content);
        }
    }
}
