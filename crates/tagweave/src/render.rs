//! Rendering a template tree to a string.
//!
//! The renderer walks the tree depth first. Text is copied verbatim; each
//! tag is handed to its descriptor's behavior, which decides whether and how
//! the children are rendered. The renderer knows nothing about what any tag
//! means.
//!
//! Scopes pushed for a tag's children are always gone before the next
//! sibling renders. The renderer restores the context depth after every
//! tag, whether the behavior succeeded or not.

use crate::context::{Context, Scope};
use crate::error::RenderError;
use crate::node::{Node, TagNode, Template};
use crate::registry::Registry;
use crate::value::Value;

/// Renders templates against a registry, optionally for a named format.
#[derive(Debug, Clone)]
pub struct Renderer<'r> {
    registry: &'r Registry,
    format: Option<String>,
}

impl<'r> Renderer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            format: None,
        }
    }

    /// Renders with each tag's behavior for `format`, where it has one.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Renders `template`. No partial output is returned on error.
    ///
    /// The context is left at the depth it had on entry.
    pub fn render(&self, template: &Template, context: &mut Context) -> Result<String, RenderError> {
        let base = context.depth();
        let result = self.render_nodes(template.nodes(), context, 0);
        context.truncate(base);
        result
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        context: &mut Context,
        depth: usize,
    ) -> Result<String, RenderError> {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(&text.content),
                Node::Tag(tag) => out.push_str(&self.render_tag(tag, context, depth)?),
            }
        }
        Ok(out)
    }

    fn render_tag(
        &self,
        node: &TagNode,
        context: &mut Context,
        depth: usize,
    ) -> Result<String, RenderError> {
        let descriptor =
            self.registry
                .lookup(&node.name)
                .ok_or_else(|| RenderError::UnknownTag {
                    name: node.name.clone(),
                })?;
        let behavior = descriptor
            .behavior_for(self.format.as_deref())
            .ok_or_else(|| RenderError::NoBehavior {
                name: node.name.clone(),
                format: self.format.clone().unwrap_or_else(|| "default".to_string()),
            })?;

        let _span = tracing::trace_span!("render_tag", tag = %node.name, depth).entered();
        let base = context.depth();
        let result = behavior.render(
            node,
            &mut RenderScope {
                renderer: self,
                context: &mut *context,
                node,
                depth,
            },
        );
        context.truncate(base);
        if let Err(err) = &result {
            tracing::trace!(tag = %node.name, error = %err, "tag failed to render");
        }
        result
    }
}

/// What a tag behavior gets to work with while rendering one node.
pub struct RenderScope<'a> {
    renderer: &'a Renderer<'a>,
    context: &'a mut Context,
    node: &'a TagNode,
    depth: usize,
}

impl RenderScope<'_> {
    /// Read access to the whole scope stack.
    pub fn context(&self) -> &Context {
        self.context
    }

    /// Looks up a dotted path in the context.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.context.lookup(path)
    }

    /// Like [`lookup`](Self::lookup), but a miss is an error naming this tag.
    pub fn require(&self, path: &str) -> Result<&Value, RenderError> {
        self.context
            .lookup(path)
            .ok_or_else(|| RenderError::MissingValue {
                tag: self.node.name.clone(),
                path: path.to_string(),
            })
    }

    /// Renders this tag's children with the current context.
    pub fn render_children(&mut self) -> Result<String, RenderError> {
        let children = &self.node.children;
        self.renderer
            .render_nodes(children, self.context, self.depth + 1)
    }

    /// Renders this tag's children with `scope` pushed on top of the context.
    ///
    /// The scope is popped before returning, on success or error.
    pub fn render_children_with(&mut self, scope: Scope) -> Result<String, RenderError> {
        let base = self.context.depth();
        self.context.push(scope);
        let result = self.render_children();
        self.context.truncate(base);
        result
    }

    /// Renders any nodes, such as one branch of this tag's children.
    pub fn render_nodes(&mut self, nodes: &[Node]) -> Result<String, RenderError> {
        self.renderer
            .render_nodes(nodes, self.context, self.depth + 1)
    }

    /// Like [`render_nodes`](Self::render_nodes) with `scope` pushed.
    pub fn render_nodes_with(&mut self, nodes: &[Node], scope: Scope) -> Result<String, RenderError> {
        let base = self.context.depth();
        self.context.push(scope);
        let result = self.render_nodes(nodes);
        self.context.truncate(base);
        result
    }

    /// The requested output format, `None` for the default.
    pub fn format(&self) -> Option<&str> {
        self.renderer.format.as_deref()
    }

    /// How many tags enclose this one. Top-level tags are at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The tag being rendered.
    pub fn node(&self) -> &TagNode {
        self.node
    }
}
