//! The template tree produced by the parser.

use tagweave_lexer::{Attribute, Span, Syntax};

/// How a tag was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagForm {
    /// `[b]...[/b]`
    Paired,
    /// `[br/]`
    SelfClosing,
    /// `[hr]` for a tag registered as void.
    Void,
    /// `[code]...[/code]` whose body was read by a parse hook. Its text is
    /// written back unescaped.
    Raw,
}

/// A run of literal text, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub content: String,
    pub span: Span,
}

/// A registered tag and everything nested inside it.
///
/// Self-closing and void tags always have empty `children`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// From the start of the opening tag to the end of the closing tag.
    pub span: Span,
    pub form: TagForm,
}

impl TagNode {
    /// The value of the first attribute named `key`, if it has one.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attribute(key)?.value.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    /// True when `key` is present, with or without a value.
    pub fn has_attr(&self, key: &str) -> bool {
        self.attribute(key).is_some()
    }

    /// Children that are tags named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TagNode> {
        self.children
            .iter()
            .filter_map(Node::as_tag)
            .filter(move |tag| tag.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(TextNode),
    Tag(TagNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Text(text) => text.span,
            Node::Tag(tag) => tag.span,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(&text.content),
            Node::Tag(_) => None,
        }
    }

    pub fn as_tag(&self) -> Option<&TagNode> {
        match self {
            Node::Tag(tag) => Some(tag),
            Node::Text(_) => None,
        }
    }
}

/// A parsed template: the top-level sequence of nodes.
///
/// Immutable once built. A template can be rendered any number of times,
/// from any number of threads, each with its own [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deepest tag nesting. Plain text has depth 0, `[a][a][/a][/a]` has 2.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .filter_map(Node::as_tag)
                .map(|tag| 1 + walk(&tag.children))
                .max()
                .unwrap_or(0)
        }
        walk(&self.nodes)
    }

    /// Writes the tree back as markup in `syntax`.
    ///
    /// Literal text is escaped, attributes are quoted. Parsing the result
    /// with the same registry gives an equal tree apart from spans.
    pub fn to_markup(&self, syntax: &Syntax) -> String {
        let mut out = String::new();
        write_markup(&self.nodes, syntax, &mut out);
        out
    }

    /// All literal text with the tags stripped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        write_text(&self.nodes, &mut out);
        out
    }
}

fn write_markup(nodes: &[Node], syntax: &Syntax, out: &mut String) {
    write_nodes(nodes, syntax, false, out);
}

fn write_nodes(nodes: &[Node], syntax: &Syntax, raw: bool, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) if raw => out.push_str(&text.content),
            Node::Text(text) => out.push_str(&syntax.escape_literal(&text.content)),
            Node::Tag(tag) => match tag.form {
                TagForm::Paired | TagForm::Raw => {
                    out.push_str(&syntax.open_tag(&tag.name, &tag.attributes, false));
                    write_nodes(&tag.children, syntax, tag.form == TagForm::Raw, out);
                    out.push_str(&syntax.close_tag(&tag.name));
                }
                TagForm::SelfClosing => {
                    out.push_str(&syntax.open_tag(&tag.name, &tag.attributes, true))
                }
                TagForm::Void => out.push_str(&syntax.open_tag(&tag.name, &tag.attributes, false)),
            },
        }
    }
}

fn write_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&text.content),
            Node::Tag(tag) => write_text(&tag.children, out),
        }
    }
}
