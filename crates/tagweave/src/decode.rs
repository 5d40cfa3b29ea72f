//! Turning rendered output back into markup.
//!
//! Decoding is the inverse of rendering for one output format. Each tag that
//! renders in the format supplies a [`TagDecoder`]; the decoders are applied
//! to the whole output one tag at a time, in registration order. A tag that
//! renders in the format but has no decoder for it fails the call with
//! [`DecodeError::NoDecoder`].
//!
//! Decoders only rewrite text. They do not validate the result; parse it
//! with [`Parser`](crate::Parser) when that matters.
//!
//! ```rust
//! use tagweave::{decode_output, Registry, RenderScope, Syntax, TagDescriptor, TagNode, WrapDecoder};
//!
//! let mut registry = Registry::new();
//! registry
//!     .register(
//!         TagDescriptor::from_fn("b", |_: &TagNode, s: &mut RenderScope<'_>| {
//!             Ok(format!("<strong>{}</strong>", s.render_children()?))
//!         })
//!         .decoder("html", WrapDecoder::new("<strong>", "</strong>")),
//!     )
//!     .unwrap();
//!
//! let markup = decode_output("a <strong>b</strong>", "html", &registry, &Syntax::default()).unwrap();
//! assert_eq!(markup, "a [b]b[/b]");
//! ```

use tagweave_lexer::Syntax;

use crate::error::DecodeError;
use crate::registry::Registry;

/// Rewrites one tag's rendered form back into markup.
///
/// `name` is the tag being decoded. An `Err` message becomes
/// [`DecodeError::Tag`].
pub trait TagDecoder: Send + Sync {
    fn decode(&self, content: &str, name: &str, syntax: &Syntax) -> Result<String, String>;
}

impl<F> TagDecoder for F
where
    F: Fn(&str, &str, &Syntax) -> Result<String, String> + Send + Sync,
{
    fn decode(&self, content: &str, name: &str, syntax: &Syntax) -> Result<String, String> {
        (self)(content, name, syntax)
    }
}

/// Replaces fixed rendered markers with the tag's open and close tags.
///
/// `WrapDecoder::new("<strong>", "</strong>")` turns `<strong>x</strong>`
/// into `[b]x[/b]` for a tag named `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapDecoder {
    open: String,
    close: Option<String>,
}

impl WrapDecoder {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: Some(close.into()),
        }
    }

    /// For void tags: only `open` is replaced, by the bare open tag.
    pub fn void(open: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: None,
        }
    }
}

impl TagDecoder for WrapDecoder {
    fn decode(&self, content: &str, name: &str, syntax: &Syntax) -> Result<String, String> {
        if self.open.is_empty() || self.close.as_deref() == Some("") {
            return Err("empty marker".to_string());
        }
        let mut out = content.replace(&self.open, &syntax.open_tag(name, &[], false));
        if let Some(close) = &self.close {
            out = out.replace(close, &syntax.close_tag(name));
        }
        Ok(out)
    }
}

/// Decodes `output` rendered for `format` back into markup in `syntax`.
///
/// Every registered tag that can render `format` must have a decoder for
/// it. Literal open delimiters in the output are not escaped.
#[tracing::instrument(level = "debug", skip(output, registry, syntax), fields(len = output.len()))]
pub fn decode_output(
    output: &str,
    format: &str,
    registry: &Registry,
    syntax: &Syntax,
) -> Result<String, DecodeError> {
    let mut content = output.to_string();
    for descriptor in registry.descriptors() {
        if descriptor.behavior_for(Some(format)).is_none() {
            continue;
        }
        let decoder = descriptor
            .decoder_for(format)
            .ok_or_else(|| DecodeError::NoDecoder {
                name: descriptor.name().to_string(),
                format: format.to_string(),
            })?;
        content = decoder
            .decode(&content, descriptor.name(), syntax)
            .map_err(|message| DecodeError::Tag {
                name: descriptor.name().to_string(),
                message,
            })?;
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TagDescriptor;
    use crate::error::RenderError;
    use crate::node::TagNode;
    use crate::render::RenderScope;

    fn children(_: &TagNode, scope: &mut RenderScope<'_>) -> Result<String, RenderError> {
        scope.render_children()
    }

    fn html_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(
                TagDescriptor::without_default("b")
                    .format("html", children)
                    .decoder("html", WrapDecoder::new("<strong>", "</strong>")),
            )
            .unwrap();
        registry
            .register(
                TagDescriptor::without_default("br")
                    .void()
                    .format("html", children)
                    .decoder("html", WrapDecoder::void("<br>")),
            )
            .unwrap();
        registry
    }

    mod wrap {
        use super::*;

        #[test]
        fn test_paired() {
            let out = WrapDecoder::new("<em>", "</em>")
                .decode("<em>a</em> <em>b</em>", "i", &Syntax::default())
                .unwrap();
            assert_eq!(out, "[i]a[/i] [i]b[/i]");
        }

        #[test]
        fn test_void() {
            let out = WrapDecoder::void("<br />")
                .decode("a<br />b", "br", &Syntax::default())
                .unwrap();
            assert_eq!(out, "a[br]b");
        }

        #[test]
        fn test_empty_marker_rejected() {
            assert!(WrapDecoder::new("", "</x>")
                .decode("text", "x", &Syntax::default())
                .is_err());
        }
    }

    mod output {
        use super::*;

        #[test]
        fn test_decode_all_tags() {
            let out = decode_output(
                "<strong>hi</strong><br>there",
                "html",
                &html_registry(),
                &Syntax::default(),
            )
            .unwrap();
            assert_eq!(out, "[b]hi[/b][br]there");
        }

        #[test]
        fn test_tags_without_the_format_are_skipped() {
            let mut registry = html_registry();
            registry
                .register(TagDescriptor::without_default("u").format("ansi", children))
                .unwrap();
            assert!(decode_output("x", "html", &registry, &Syntax::default()).is_ok());
        }

        #[test]
        fn test_missing_decoder() {
            let mut registry = html_registry();
            registry.register(TagDescriptor::new("i", children)).unwrap();

            let err = decode_output("<em>x</em>", "html", &registry, &Syntax::default()).unwrap_err();
            assert_eq!(
                err,
                DecodeError::NoDecoder {
                    name: "i".into(),
                    format: "html".into()
                }
            );
        }

        #[test]
        fn test_decoder_failure() {
            let mut registry = Registry::new();
            registry
                .register(TagDescriptor::new("x", children).decoder(
                    "html",
                    |_: &str, _: &str, _: &Syntax| -> Result<String, String> { Err("cannot".into()) },
                ))
                .unwrap();

            let err = decode_output("x", "html", &registry, &Syntax::default()).unwrap_err();
            assert!(matches!(err, DecodeError::Tag { ref name, .. } if name == "x"));
        }

        #[test]
        fn test_decoders_run_in_registration_order() {
            let mut registry = Registry::new();
            for (name, from, to) in [("z", "A", "B"), ("a", "B", "C")] {
                registry
                    .register(TagDescriptor::new(name, children).decoder(
                        "t",
                        move |content: &str, _: &str, _: &Syntax| -> Result<String, String> {
                            Ok(content.replace(from, to))
                        },
                    ))
                    .unwrap();
            }
            let out = decode_output("A", "t", &registry, &Syntax::default()).unwrap();
            assert_eq!(out, "C");
        }
    }
}
