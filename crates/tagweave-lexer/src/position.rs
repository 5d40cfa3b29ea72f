//! Source positions for diagnostics.

use std::fmt;

/// A location in template source.
///
/// `offset` is a byte offset into the source string. `line` and `column` are
/// 1-based, with columns counted in characters rather than bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The position of the first character of any source.
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The source range covered by a token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Where the range begins.
    pub start: Position,
    /// Byte offset one past the last byte of the range.
    pub end: usize,
}

impl Span {
    pub fn new(start: Position, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps byte offsets to line/column positions.
///
/// Line starts are computed once per source, so each lookup is a binary
/// search plus a character count within one line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    /// Resolves `offset` within `source` to a [`Position`].
    ///
    /// Offsets past the end clamp to the end of the source.
    pub fn position(&self, source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0)
            + 1;
        Position {
            offset,
            line: line + 1,
            column,
        }
    }
}
