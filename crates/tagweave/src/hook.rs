//! Custom body parsing for tags that opt out of tag interpretation.
//!
//! When an opening tag's descriptor has a [`ParseHook`], the parser stops
//! tokenizing and hands the hook a [`RawBody`] positioned just after the
//! opening tag. The hook consumes raw text up to and including its own
//! closing marker, returns the children to attach, and normal parsing
//! resumes after whatever the hook consumed.

use tagweave_lexer::{Lexer, Position, Span, Syntax};

use crate::node::{Node, TagNode, TextNode};

/// Why a hook gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The closing marker was never found.
    Unclosed,
    /// The body is malformed for this tag.
    Invalid(String),
}

/// Parses the body of a tag from raw source.
///
/// `open` is the opening tag, with no children yet.
pub trait ParseHook: Send + Sync {
    fn parse_body(&self, open: &TagNode, body: &mut RawBody<'_, '_>) -> Result<Vec<Node>, HookError>;
}

/// The unread source after an opening tag.
///
/// Consumption is forward-only.
pub struct RawBody<'l, 's> {
    lexer: &'l mut Lexer<'s>,
}

impl<'l, 's> RawBody<'l, 's> {
    pub(crate) fn new(lexer: &'l mut Lexer<'s>) -> Self {
        Self { lexer }
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'s str {
        self.lexer.rest()
    }

    pub fn syntax(&self) -> &'s Syntax {
        self.lexer.syntax()
    }

    pub fn position(&self) -> Position {
        self.lexer.cursor_position()
    }

    /// Byte length of the text before the first `name` close tag, written
    /// exactly as the syntax spells it (`[/name]`).
    pub fn find_close(&self, name: &str) -> Option<usize> {
        self.rest().find(&self.syntax().close_tag(name))
    }

    /// Consumes `len` bytes as a text node.
    ///
    /// `len` is clamped to the remaining input and must fall on a character
    /// boundary; otherwise nothing is consumed.
    pub fn take(&mut self, len: usize) -> TextNode {
        let start = self.lexer.offset();
        let rest = self.rest();
        let len = if rest.is_char_boundary(len.min(rest.len())) {
            len.min(rest.len())
        } else {
            0
        };
        let span = Span::new(self.lexer.cursor_position(), start + len);
        let content = rest[..len].to_string();
        self.lexer.advance_to(start + len);
        TextNode { content, span }
    }

    /// Consumes the `name` close tag, which must come next.
    pub fn take_close(&mut self, name: &str) -> Result<(), HookError> {
        let close = self.syntax().close_tag(name);
        if self.rest().starts_with(&close) {
            let end = self.lexer.offset() + close.len();
            self.lexer.advance_to(end);
            Ok(())
        } else {
            Err(HookError::Unclosed)
        }
    }
}

/// Keeps the body as a single text node, up to the first close tag.
///
/// Nothing inside is interpreted, so `[raw][b][/raw]` has the literal
/// child `[b]`. The body cannot contain its own close tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl ParseHook for Verbatim {
    fn parse_body(&self, open: &TagNode, body: &mut RawBody<'_, '_>) -> Result<Vec<Node>, HookError> {
        let len = body.find_close(&open.name).ok_or(HookError::Unclosed)?;
        let mut children = Vec::new();
        if len > 0 {
            children.push(Node::Text(body.take(len)));
        }
        body.take_close(&open.name)?;
        Ok(children)
    }
}
