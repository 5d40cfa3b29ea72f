//! Tokenizer for BBCode-style tag templates.
//!
//! This crate splits template source into literal text runs and tag markers.
//! It knows nothing about which tags exist or what they mean; matching and
//! rendering live in the `tagweave` crate.
//!
//! # Example
//!
//! ```rust
//! use tagweave_lexer::{tokenize, Syntax, TokenKind};
//!
//! let tokens = tokenize("Hi [b]there[/b][br/]", &Syntax::default()).unwrap();
//! let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
//!
//! assert_eq!(kinds[0], TokenKind::Literal("Hi ".into()));
//! assert!(matches!(&kinds[1], TokenKind::TagOpen { name, .. } if name == "b"));
//! assert!(matches!(&kinds[3], TokenKind::TagClose { name } if name == "b"));
//! assert!(matches!(&kinds[4], TokenKind::TagOpen { self_closing: true, .. }));
//! ```
//!
//! # Tag Syntax
//!
//! With the default [`Syntax`]:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `[name a=1 b="x y" flag]` | opening tag with attributes |
//! | `[name=value]` | BBCode shorthand, attribute keyed by the tag name |
//! | `[name/]` | self-closing tag |
//! | `[/name]` | closing tag |
//! | `[[` | a literal `[` |
//!
//! An open delimiter that is not immediately followed by a name (or the end
//! marker and a name) is literal text, so `items[0]` needs no escaping.
//! Once a name has been read, the tag must be well formed; otherwise
//! lexing fails with a [`LexError`].
//!
//! # Tag Name Syntax
//!
//! Tag names follow CSS identifier rules:
//! - Start with a letter or underscore (`_`)
//! - Followed by letters, digits (`0-9`), underscores, or hyphens (`-`)
//! - Case-sensitive
//!
//! Pattern: `[A-Za-z_][A-Za-z0-9_-]*`

mod error;
mod lexer;
mod position;
mod syntax;
mod token;

pub use error::{LexError, Result};
pub use lexer::{is_valid_name, tokenize, Lexer};
pub use position::{LineIndex, Position, Span};
pub use syntax::{Syntax, SyntaxError, SyntaxSpec};
pub use token::{Attribute, Token, TokenKind};
