//! Matching tokens into a template tree.
//!
//! The parser keeps a stack of open frames. Text goes into the innermost
//! frame; an opening tag pushes a frame; a closing tag must name the
//! innermost frame and pops it into its parent. Self-closing and void tags
//! never push a frame, so they cannot swallow the text that follows.
//! Implicit closes are never inferred.
//!
//! The lexer is driven lazily: when a tag has a parse hook, the hook reads
//! raw source from the lexer's cursor, and tokenizing resumes where it
//! stopped.

use tagweave_lexer::{Attribute, Lexer, Position, Span, Syntax, TokenKind};

use crate::descriptor::TagDescriptor;
use crate::error::ParseError;
use crate::hook::{HookError, RawBody};
use crate::node::{Node, TagForm, TagNode, Template, TextNode};
use crate::registry::Registry;

/// Nesting limit used unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// An open tag waiting for its close.
struct Frame<'r> {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    start: Position,
    descriptor: &'r TagDescriptor,
}

impl Frame<'_> {
    fn finish(self, end: usize) -> TagNode {
        TagNode {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
            span: Span::new(self.start, end),
            form: TagForm::Paired,
        }
    }
}

/// Parses template source against a registry.
///
/// # Example
///
/// ```rust
/// use tagweave::{Parser, Registry, Syntax, TagDescriptor, TagNode, RenderScope};
///
/// let mut registry = Registry::new();
/// registry
///     .register(TagDescriptor::from_fn("b", |_: &TagNode, s: &mut RenderScope<'_>| {
///         s.render_children()
///     }))
///     .unwrap();
///
/// let syntax = Syntax::default();
/// let template = Parser::new(&registry, &syntax).parse("x [b]y[/b]").unwrap();
/// assert_eq!(template.depth(), 1);
/// ```
pub struct Parser<'r> {
    registry: &'r Registry,
    syntax: &'r Syntax,
    max_depth: Option<usize>,
}

impl<'r> Parser<'r> {
    pub fn new(registry: &'r Registry, syntax: &'r Syntax) -> Self {
        Self {
            registry,
            syntax,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }

    /// Sets the nesting limit. `None` removes it.
    pub fn max_depth(mut self, limit: Option<usize>) -> Self {
        self.max_depth = limit;
        self
    }

    /// Parses `source` into a template, or fails at the first error.
    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        let mut lexer = Lexer::new(source, self.syntax);
        let mut root: Vec<Node> = Vec::new();
        let mut stack: Vec<Frame<'r>> = Vec::new();

        while let Some(token) = lexer.next() {
            let token = token?;
            let start = token.span.start;

            match token.kind {
                TokenKind::Literal(content) => {
                    let node = Node::Text(TextNode {
                        content,
                        span: token.span,
                    });
                    push(&mut stack, &mut root, node);
                }
                TokenKind::TagOpen {
                    name,
                    attributes,
                    self_closing,
                } => {
                    let descriptor =
                        self.registry
                            .lookup(&name)
                            .ok_or_else(|| ParseError::UnknownTag {
                                name: name.clone(),
                                position: start,
                            })?;
                    self.check_open(&stack, descriptor, &attributes, start)?;

                    if self_closing || !descriptor.requires_closing() {
                        let node = TagNode {
                            name,
                            attributes,
                            children: Vec::new(),
                            span: token.span,
                            form: if self_closing {
                                TagForm::SelfClosing
                            } else {
                                TagForm::Void
                            },
                        };
                        validate(descriptor, &node)?;
                        push(&mut stack, &mut root, Node::Tag(node));
                    } else if let Some(hook) = descriptor.hook() {
                        let mut node = TagNode {
                            name,
                            attributes,
                            children: Vec::new(),
                            span: token.span,
                            form: TagForm::Raw,
                        };
                        let children = hook
                            .parse_body(&node, &mut RawBody::new(&mut lexer))
                            .map_err(|err| match err {
                                HookError::Unclosed => ParseError::UnclosedTag {
                                    name: node.name.clone(),
                                    position: start,
                                },
                                HookError::Invalid(message) => ParseError::Hook {
                                    name: node.name.clone(),
                                    message,
                                    position: start,
                                },
                            })?;
                        node.children = children;
                        node.span = Span::new(start, lexer.offset());
                        validate(descriptor, &node)?;
                        push(&mut stack, &mut root, Node::Tag(node));
                    } else {
                        stack.push(Frame {
                            name,
                            attributes,
                            children: Vec::new(),
                            start,
                            descriptor,
                        });
                    }
                }
                TokenKind::TagClose { name } => {
                    let frame = match stack.pop() {
                        Some(frame) if frame.name == name => frame,
                        other => {
                            return Err(ParseError::MismatchedClose {
                                expected: other.map(|f| f.name),
                                found: name,
                                position: start,
                            })
                        }
                    };
                    let descriptor = frame.descriptor;
                    let node = frame.finish(token.span.end);
                    validate(descriptor, &node)?;
                    push(&mut stack, &mut root, Node::Tag(node));
                }
            }
        }

        if let Some(frame) = stack.last() {
            return Err(ParseError::UnclosedTag {
                name: frame.name.clone(),
                position: frame.start,
            });
        }

        tracing::debug!(nodes = root.len(), "parsed template");
        Ok(Template::new(root))
    }

    /// Checks nesting rules and attributes before a tag is accepted.
    fn check_open(
        &self,
        stack: &[Frame<'r>],
        descriptor: &TagDescriptor,
        attributes: &[Attribute],
        position: Position,
    ) -> Result<(), ParseError> {
        let name = descriptor.name();

        if let Some(limit) = self.max_depth {
            if stack.len() >= limit {
                return Err(ParseError::TooDeep { limit, position });
            }
        }

        if let Some(parent) = stack.last() {
            if !parent.descriptor.allows_children() && parent.name != name {
                return Err(ParseError::ChildrenNotAllowed {
                    parent: parent.name.clone(),
                    child: name.to_string(),
                    position,
                });
            }
        }

        if !descriptor.allows_self_nesting() && stack.iter().any(|f| f.name == name) {
            return Err(ParseError::SelfNestingNotAllowed {
                name: name.to_string(),
                position,
            });
        }

        if let Some(schema) = descriptor.attribute_schema() {
            schema
                .check(attributes)
                .map_err(|reason| ParseError::InvalidAttributes {
                    name: name.to_string(),
                    reason,
                    position,
                })?;
        }
        Ok(())
    }
}

fn push(stack: &mut [Frame<'_>], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(node),
        None => root.push(node),
    }
}

fn validate(descriptor: &TagDescriptor, node: &TagNode) -> Result<(), ParseError> {
    for validator in descriptor.validators() {
        validator
            .validate(node)
            .map_err(|message| ParseError::Validation {
                name: node.name.clone(),
                message,
                position: node.span.start,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AttributeSchema;
    use crate::error::RenderError;
    use crate::hook::Verbatim;
    use crate::render::RenderScope;

    fn children(_: &TagNode, scope: &mut RenderScope<'_>) -> Result<String, RenderError> {
        scope.render_children()
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        for name in ["a", "b", "i", "quote"] {
            registry.register(TagDescriptor::new(name, children)).unwrap();
        }
        registry.register(TagDescriptor::new("br", children).void()).unwrap();
        registry
            .register(TagDescriptor::new("raw", children).parse_hook(Verbatim))
            .unwrap();
        registry
    }

    fn parse(source: &str) -> Result<Template, ParseError> {
        let registry = registry();
        Parser::new(&registry, &Syntax::default()).parse(source)
    }

    fn tag(node: &Node) -> &TagNode {
        node.as_tag().expect("expected a tag node")
    }

    mod structure {
        use super::*;

        #[test]
        fn test_plain_text() {
            let template = parse("just text").unwrap();
            assert_eq!(template.nodes().len(), 1);
            assert_eq!(template.nodes()[0].as_text(), Some("just text"));
        }

        #[test]
        fn test_empty_source() {
            assert!(parse("").unwrap().is_empty());
        }

        #[test]
        fn test_nested() {
            let template = parse("x[b]y[i]z[/i][/b]").unwrap();
            let b = tag(&template.nodes()[1]);
            assert_eq!(b.name, "b");
            assert_eq!(b.children[0].as_text(), Some("y"));
            assert_eq!(tag(&b.children[1]).name, "i");
            assert_eq!(template.depth(), 2);
        }

        #[test]
        fn test_same_name_nesting() {
            let template = parse("[a][a]in[/a][/a]").unwrap();
            let outer = tag(&template.nodes()[0]);
            let inner = tag(&outer.children[0]);
            assert_eq!(outer.children.len(), 1);
            assert_eq!(inner.children[0].as_text(), Some("in"));
            assert_eq!(template.depth(), 2);
        }

        #[test]
        fn test_self_closing_takes_no_children() {
            let template = parse("[b/]rest").unwrap();
            assert_eq!(template.nodes().len(), 2);
            let b = tag(&template.nodes()[0]);
            assert!(b.children.is_empty());
            assert_eq!(b.form, TagForm::SelfClosing);
            assert_eq!(template.nodes()[1].as_text(), Some("rest"));
        }

        #[test]
        fn test_void_tag() {
            let template = parse("a[br]b").unwrap();
            let br = tag(&template.nodes()[1]);
            assert_eq!(br.form, TagForm::Void);
            assert_eq!(template.nodes()[2].as_text(), Some("b"));
        }

        #[test]
        fn test_void_close_is_stray() {
            let err = parse("[br]x[/br]").unwrap_err();
            assert!(matches!(
                err,
                ParseError::MismatchedClose { expected: None, ref found, .. } if found == "br"
            ));
        }

        #[test]
        fn test_spans() {
            let template = parse("ab[b]c[/b]").unwrap();
            let b = tag(&template.nodes()[1]);
            assert_eq!(b.span.start.offset, 2);
            assert_eq!(b.span.end, 10);
        }

        #[test]
        fn test_whitespace_preserved() {
            let template = parse("  [b] \n [/b]  ").unwrap();
            assert_eq!(template.text_content(), "   \n   ");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_unknown_tag() {
            let err = parse("ok [nope]x[/nope]").unwrap_err();
            assert_eq!(
                err,
                ParseError::UnknownTag {
                    name: "nope".into(),
                    position: Position {
                        offset: 3,
                        line: 1,
                        column: 4
                    },
                }
            );
        }

        #[test]
        fn test_unknown_self_closing() {
            assert!(matches!(
                parse("[nope/]"),
                Err(ParseError::UnknownTag { .. })
            ));
        }

        #[test]
        fn test_mismatched_close() {
            let err = parse("[a][b][/a][/b]").unwrap_err();
            match err {
                ParseError::MismatchedClose {
                    expected,
                    found,
                    position,
                } => {
                    assert_eq!(expected.as_deref(), Some("b"));
                    assert_eq!(found, "a");
                    assert_eq!(position.offset, 6);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[test]
        fn test_stray_close() {
            let err = parse("text[/b]").unwrap_err();
            assert!(matches!(err, ParseError::MismatchedClose { expected: None, .. }));
        }

        #[test]
        fn test_unclosed_reports_innermost() {
            let err = parse("[a]x[b]y").unwrap_err();
            assert_eq!(
                err,
                ParseError::UnclosedTag {
                    name: "b".into(),
                    position: Position {
                        offset: 4,
                        line: 1,
                        column: 5
                    },
                }
            );
        }

        #[test]
        fn test_lex_error_passes_through() {
            assert!(matches!(parse("[b x="), Err(ParseError::Lex(_))));
        }
    }

    mod rules {
        use super::*;

        fn with(descriptor: TagDescriptor, source: &str) -> Result<Template, ParseError> {
            let mut registry = registry();
            registry.register_override(descriptor).unwrap();
            Parser::new(&registry, &Syntax::default()).parse(source)
        }

        #[test]
        fn test_children_not_allowed() {
            let code = TagDescriptor::new("code", children).children(false);
            assert!(with(code.clone(), "[code]text only[/code]").is_ok());
            assert!(matches!(
                with(code, "[code]x[b]y[/b][/code]"),
                Err(ParseError::ChildrenNotAllowed { ref parent, ref child, .. })
                    if parent == "code" && child == "b"
            ));
        }

        #[test]
        fn test_self_nesting_not_allowed() {
            let link = TagDescriptor::new("a", children).self_nesting(false);
            assert!(with(link.clone(), "[a]x[/a][a]y[/a]").is_ok());
            assert!(matches!(
                with(link, "[a][b][a]x[/a][/b][/a]"),
                Err(ParseError::SelfNestingNotAllowed { .. })
            ));
        }

        #[test]
        fn test_attribute_schema() {
            let link = TagDescriptor::new("a", children)
                .attributes(AttributeSchema::new().required("href").optional("title"));
            assert!(with(link.clone(), "[a href=/x title=\"T\"]x[/a]").is_ok());

            let err = with(link, "[a]x[/a]").unwrap_err();
            assert!(matches!(err, ParseError::InvalidAttributes { .. }));
            assert!(err.to_string().contains("missing required attribute 'href'"));
        }

        #[test]
        fn test_shorthand_attribute_in_schema() {
            let color = TagDescriptor::new("color", children)
                .attributes(AttributeSchema::new().value_required("color"));
            assert!(with(color.clone(), "[color=red]x[/color]").is_ok());
            assert!(with(color, "[color]x[/color]").is_ok());
        }

        #[test]
        fn test_validator() {
            let list = TagDescriptor::new("list", children).validator(|node: &TagNode| {
                if node.children.iter().all(|c| c.as_tag().is_some()) {
                    Ok(())
                } else {
                    Err("list may only contain tags".to_string())
                }
            });
            assert!(with(list.clone(), "[list][b]x[/b][/list]").is_ok());

            let err = with(list, "[list]loose[/list]").unwrap_err();
            assert!(matches!(
                err,
                ParseError::Validation { ref message, .. } if message == "list may only contain tags"
            ));
        }

        #[test]
        fn test_max_depth() {
            let registry = registry();
            let syntax = Syntax::default();
            let parser = Parser::new(&registry, &syntax).max_depth(Some(2));

            assert!(parser.parse("[a][a]x[/a][/a]").is_ok());
            assert!(matches!(
                parser.parse("[a][a][a]x[/a][/a][/a]"),
                Err(ParseError::TooDeep { limit: 2, .. })
            ));
        }

        #[test]
        fn test_no_depth_limit() {
            let registry = registry();
            let syntax = Syntax::default();
            let source = format!("{}{}", "[a]".repeat(300), "[/a]".repeat(300));

            assert!(Parser::new(&registry, &syntax).parse(&source).is_err());
            let template = Parser::new(&registry, &syntax)
                .max_depth(None)
                .parse(&source)
                .unwrap();
            assert_eq!(template.depth(), 300);
        }
    }

    mod hooks {
        use super::*;

        #[test]
        fn test_raw_body_is_literal() {
            let template = parse("[raw][b]not bold[/b][/raw] after [b]x[/b]").unwrap();
            let raw = tag(&template.nodes()[0]);
            assert_eq!(raw.children.len(), 1);
            assert_eq!(raw.children[0].as_text(), Some("[b]not bold[/b]"));
            assert_eq!(raw.span.end, 26);
            assert_eq!(tag(&template.nodes()[2]).name, "b");
        }

        #[test]
        fn test_raw_markup_round_trips() {
            let source = "[raw]a[b]c[[d[/raw]";
            let template = parse(source).unwrap();
            assert_eq!(tag(&template.nodes()[0]).form, TagForm::Raw);

            let markup = template.to_markup(&Syntax::default());
            assert_eq!(markup, source);
            assert_eq!(parse(&markup).unwrap().text_content(), "a[b]c[[d");
        }

        #[test]
        fn test_raw_may_hold_broken_markup() {
            let template = parse("[raw][unknown [x=[/raw]").unwrap();
            assert_eq!(template.text_content(), "[unknown [x=");
        }

        #[test]
        fn test_raw_unclosed() {
            assert!(matches!(
                parse("[raw]never"),
                Err(ParseError::UnclosedTag { ref name, .. }) if name == "raw"
            ));
        }

        #[test]
        fn test_hook_error() {
            struct Reject;
            impl crate::hook::ParseHook for Reject {
                fn parse_body(
                    &self,
                    _: &TagNode,
                    _: &mut RawBody<'_, '_>,
                ) -> Result<Vec<Node>, HookError> {
                    Err(HookError::Invalid("nothing allowed".into()))
                }
            }

            let mut registry = registry();
            registry
                .register(TagDescriptor::new("deny", children).parse_hook(Reject))
                .unwrap();
            let err = Parser::new(&registry, &Syntax::default())
                .parse("[deny]x[/deny]")
                .unwrap_err();
            assert!(matches!(err, ParseError::Hook { ref message, .. } if message == "nothing allowed"));
        }
    }
}
