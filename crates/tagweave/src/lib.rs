//! A customizable, tag-based template engine.
//!
//! Templates are text with BBCode-style tags (`[b]bold[/b]`, `[br/]`,
//! `[link href="/x"]..[/link]`). Which tags exist, what they may contain
//! and what they render to is entirely up to the caller: every tag is a
//! [`TagDescriptor`] registered in a [`Registry`].
//!
//! The pipeline has three stages, each failing fast with its own error:
//!
//! 1. **Tokenize** source into literal runs and tag markers
//!    ([`tagweave_lexer`], re-exported here).
//! 2. **Parse** tokens into a [`Template`] tree with strict open/close
//!    matching ([`Parser`]).
//! 3. **Render** the tree against a scoped [`Context`] ([`Renderer`]).
//!
//! Output rendered for a format can be turned back into markup with
//! [`decode_output`] when the tags supply a [`TagDecoder`] for it.
//!
//! # Example
//!
//! ```rust
//! use tagweave::{
//!     render_template, to_display, Context, Registry, RenderError, RenderScope, Scope,
//!     TagDescriptor, TagNode, Value,
//! };
//!
//! let mut registry = Registry::new();
//!
//! registry
//!     .register(TagDescriptor::from_fn("b", |_: &TagNode, s: &mut RenderScope<'_>| {
//!         Ok(format!("<b>{}</b>", s.render_children()?))
//!     }))
//!     .unwrap();
//!
//! // [each items=list as=name]...[/each]
//! registry
//!     .register(TagDescriptor::from_fn("each", |node: &TagNode, s: &mut RenderScope<'_>| {
//!         let path = node.attr("items").unwrap_or("items");
//!         let binding = node.attr("as").unwrap_or("item").to_string();
//!         let items = match s.require(path)? {
//!             Value::Array(items) => items.clone(),
//!             _ => return Err(RenderError::tag("each", "not a list")),
//!         };
//!         let mut out = String::new();
//!         for item in items {
//!             out.push_str(&s.render_children_with(Scope::new().with(binding.as_str(), item))?);
//!         }
//!         Ok(out)
//!     }))
//!     .unwrap();
//!
//! // [var name=path/]
//! registry
//!     .register(TagDescriptor::from_fn("var", |node: &TagNode, s: &mut RenderScope<'_>| {
//!         Ok(to_display(s.require(node.attr("name").unwrap_or_default())?))
//!     }))
//!     .unwrap();
//!
//! let mut context = Context::with_root(Scope::new().with("people", vec!["Ada", "Grace"]));
//! let out = render_template(
//!     "[each items=people as=p][b][var name=p /][/b] [/each]",
//!     &mut context,
//!     &registry,
//! )
//! .unwrap();
//!
//! assert_eq!(out, "<b>Ada</b> <b>Grace</b> ");
//! ```
//!
//! # Concurrency
//!
//! Parsing and rendering only borrow the registry, and a parsed
//! [`Template`] is immutable. Share both behind an `Arc` and render from
//! any number of threads, each with its own [`Context`].
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (registration, config loading and
//! compilation at `debug`, per-tag render spans at `trace`). It never
//! installs a subscriber.

pub mod config;
pub mod context;
pub mod decode;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod hook;
pub mod node;
pub mod parser;
pub mod registry;
pub mod render;
pub mod value;

pub use config::{BehaviorTable, EngineConfig, RegistryConfig, TagSpec};
pub use context::{Context, Scope};
pub use decode::{decode_output, TagDecoder, WrapDecoder};
pub use descriptor::{AttributeSchema, TagBehavior, TagDescriptor, TagValidator};
pub use engine::{render_template, Engine};
pub use error::{DecodeError, Error, ParseError, RegistryError, RenderError, Result};
pub use hook::{HookError, ParseHook, RawBody, Verbatim};
pub use node::{Node, TagForm, TagNode, Template, TextNode};
pub use parser::{Parser, DEFAULT_MAX_DEPTH};
pub use registry::{DuplicatePolicy, Registry, TagHandle, TagId};
pub use render::{RenderScope, Renderer};
pub use value::{is_truthy, resolve_path, to_display, Value};

pub use tagweave_lexer::{
    is_valid_name, tokenize, Attribute, LexError, Lexer, Position, Span, Syntax, SyntaxError,
    SyntaxSpec, Token, TokenKind,
};
