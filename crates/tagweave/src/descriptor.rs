//! Tag descriptors: what a registered tag is allowed to contain and how it
//! renders.
//!
//! A [`TagDescriptor`] is the only extension point of the engine. It carries
//! parsing rules (closing, nesting, attributes, validators, an optional
//! [`ParseHook`]) and render behaviors: one default [`TagBehavior`] plus any
//! number of per-format overrides, each optionally paired with a
//! [`TagDecoder`].
//!
//! # Example
//!
//! ```rust
//! use tagweave::{AttributeSchema, RenderError, RenderScope, TagDescriptor, TagNode};
//!
//! let link = TagDescriptor::from_fn("link", |node: &TagNode, scope: &mut RenderScope<'_>| {
//!     let href = node.attr("href").unwrap_or("#");
//!     Ok(format!("<a href=\"{}\">{}</a>", href, scope.render_children()?))
//! })
//! .description("A hyperlink")
//! .attributes(AttributeSchema::new().required("href"))
//! .self_nesting(false);
//!
//! assert!(link.requires_closing());
//! assert!(!link.allows_self_nesting());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tagweave_lexer::Attribute;

use crate::decode::TagDecoder;
use crate::error::RenderError;
use crate::hook::ParseHook;
use crate::node::TagNode;
use crate::render::RenderScope;

/// Renders one tag node.
///
/// The behavior decides what happens to the children: render them as-is
/// with [`RenderScope::render_children`], once per item with
/// [`RenderScope::render_children_with`], or not at all.
///
/// A blanket implementation is provided for closures with the matching
/// signature. [`TagDescriptor::from_fn`] helps type inference for inline
/// closures.
pub trait TagBehavior: Send + Sync {
    fn render(&self, node: &TagNode, scope: &mut RenderScope<'_>) -> Result<String, RenderError>;
}

impl<F> TagBehavior for F
where
    F: Fn(&TagNode, &mut RenderScope<'_>) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, node: &TagNode, scope: &mut RenderScope<'_>) -> Result<String, RenderError> {
        (self)(node, scope)
    }
}

/// Checks a finished tag node at parse time.
///
/// Validators run once the node's children are known. An `Err` message
/// becomes [`ParseError::Validation`](crate::ParseError::Validation).
pub trait TagValidator: Send + Sync {
    fn validate(&self, node: &TagNode) -> Result<(), String>;
}

impl<F> TagValidator for F
where
    F: Fn(&TagNode) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, node: &TagNode) -> Result<(), String> {
        (self)(node)
    }
}

/// Attribute rules for a tag.
///
/// With `allow_unknown` off, only keys listed in `required`, `optional` or
/// `value_required` are accepted. Keys in `value_required` must carry a
/// value when present. Repeated keys are always rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeSchema {
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub value_required: Vec<String>,
    pub allow_unknown: bool,
}

impl AttributeSchema {
    /// A schema that accepts no attributes until keys are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key that must be present.
    pub fn required(mut self, key: impl Into<String>) -> Self {
        self.required.push(key.into());
        self
    }

    pub fn optional(mut self, key: impl Into<String>) -> Self {
        self.optional.push(key.into());
        self
    }

    /// Key that may be omitted, but needs a value when given.
    pub fn value_required(mut self, key: impl Into<String>) -> Self {
        self.value_required.push(key.into());
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    fn knows(&self, key: &str) -> bool {
        [&self.required, &self.optional, &self.value_required]
            .iter()
            .any(|keys| keys.iter().any(|k| k == key))
    }

    /// Checks `attributes` against the schema, returning the first problem.
    pub fn check(&self, attributes: &[Attribute]) -> Result<(), String> {
        for (i, attr) in attributes.iter().enumerate() {
            if attributes[..i].iter().any(|a| a.key == attr.key) {
                return Err(format!("attribute '{}' given more than once", attr.key));
            }
            if !self.allow_unknown && !self.knows(&attr.key) {
                return Err(format!("unknown attribute '{}'", attr.key));
            }
            if attr.value.is_none() && self.value_required.iter().any(|k| *k == attr.key) {
                return Err(format!("attribute '{}' needs a value", attr.key));
            }
        }
        for key in &self.required {
            if !attributes.iter().any(|a| a.key == *key) {
                return Err(format!("missing required attribute '{}'", key));
            }
        }
        Ok(())
    }
}

/// The registered definition of a tag.
///
/// Cheap to clone: behaviors, hooks and validators are shared.
#[derive(Clone)]
pub struct TagDescriptor {
    name: String,
    description: Option<String>,
    requires_closing: bool,
    allows_children: bool,
    allows_self_nesting: bool,
    attributes: Option<AttributeSchema>,
    behavior: Option<Arc<dyn TagBehavior>>,
    formats: HashMap<String, Arc<dyn TagBehavior>>,
    decoders: HashMap<String, Arc<dyn TagDecoder>>,
    parse_hook: Option<Arc<dyn ParseHook>>,
    validators: Vec<Arc<dyn TagValidator>>,
}

impl TagDescriptor {
    /// A paired tag rendered by `behavior` in every format.
    pub fn new(name: impl Into<String>, behavior: impl TagBehavior + 'static) -> Self {
        Self::without_default(name).with_shared(Arc::new(behavior))
    }

    /// Like [`new`](Self::new), for an inline closure.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TagNode, &mut RenderScope<'_>) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self::new(name, f)
    }

    /// A tag with no default behavior. It only renders in formats added
    /// with [`format`](Self::format).
    pub fn without_default(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            requires_closing: true,
            allows_children: true,
            allows_self_nesting: true,
            attributes: None,
            behavior: None,
            formats: HashMap::new(),
            decoders: HashMap::new(),
            parse_hook: None,
            validators: Vec::new(),
        }
    }

    pub(crate) fn with_shared(mut self, behavior: Arc<dyn TagBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub(crate) fn format_shared(
        mut self,
        format: impl Into<String>,
        behavior: Arc<dyn TagBehavior>,
    ) -> Self {
        let format = format.into();
        if self.formats.insert(format.clone(), behavior).is_some() {
            tracing::warn!(tag = %self.name, %format, "replacing format behavior");
        }
        self
    }

    pub(crate) fn decoder_shared(
        mut self,
        format: impl Into<String>,
        decoder: Arc<dyn TagDecoder>,
    ) -> Self {
        let format = format.into();
        if self.decoders.insert(format.clone(), decoder).is_some() {
            tracing::warn!(tag = %self.name, %format, "replacing decoder");
        }
        self
    }

    pub(crate) fn validator_shared(mut self, validator: Arc<dyn TagValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Marks the tag as void: `[hr]` stands alone and takes no close tag.
    pub fn void(mut self) -> Self {
        self.requires_closing = false;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether other tags may be nested inside. Text is always allowed.
    pub fn children(mut self, allowed: bool) -> Self {
        self.allows_children = allowed;
        self
    }

    /// Whether the tag may appear inside another instance of itself.
    pub fn self_nesting(mut self, allowed: bool) -> Self {
        self.allows_self_nesting = allowed;
        self
    }

    pub fn attributes(mut self, schema: AttributeSchema) -> Self {
        self.attributes = Some(schema);
        self
    }

    /// Adds a validator. Validators run in the order they were added.
    pub fn validator(self, validator: impl TagValidator + 'static) -> Self {
        self.validator_shared(Arc::new(validator))
    }

    /// Behavior used when rendering for `format` instead of the default.
    ///
    /// Each format has one behavior: calling this again for the same
    /// format replaces the earlier one and logs a warning.
    pub fn format(self, format: impl Into<String>, behavior: impl TagBehavior + 'static) -> Self {
        self.format_shared(format, Arc::new(behavior))
    }

    /// Decoder that turns this tag's `format` output back into markup.
    ///
    /// Like [`format`](Self::format), a second decoder for the same format
    /// replaces the first.
    pub fn decoder(self, format: impl Into<String>, decoder: impl TagDecoder + 'static) -> Self {
        self.decoder_shared(format, Arc::new(decoder))
    }

    /// Hands the tag's body to `hook` instead of the tokenizer.
    pub fn parse_hook(mut self, hook: impl ParseHook + 'static) -> Self {
        self.parse_hook = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn requires_closing(&self) -> bool {
        self.requires_closing
    }

    pub fn allows_children(&self) -> bool {
        self.allows_children
    }

    pub fn allows_self_nesting(&self) -> bool {
        self.allows_self_nesting
    }

    pub fn attribute_schema(&self) -> Option<&AttributeSchema> {
        self.attributes.as_ref()
    }

    pub fn hook(&self) -> Option<&dyn ParseHook> {
        self.parse_hook.as_deref()
    }

    pub fn validators(&self) -> impl Iterator<Item = &dyn TagValidator> {
        self.validators.iter().map(|v| &**v)
    }

    /// Formats with a dedicated behavior, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<_> = self.formats.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    pub fn decoder_for(&self, format: &str) -> Option<&dyn TagDecoder> {
        self.decoders.get(format).map(|d| &**d)
    }

    /// Formats with a decoder, sorted.
    pub fn decoders(&self) -> Vec<&str> {
        let mut formats: Vec<_> = self.decoders.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    /// The behavior for `format`, falling back to the default.
    pub fn behavior_for(&self, format: Option<&str>) -> Option<&dyn TagBehavior> {
        format
            .and_then(|f| self.formats.get(f))
            .or(self.behavior.as_ref())
            .map(|b| &**b)
    }
}

impl fmt::Debug for TagDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("requires_closing", &self.requires_closing)
            .field("allows_children", &self.allows_children)
            .field("allows_self_nesting", &self.allows_self_nesting)
            .field("attributes", &self.attributes)
            .field("has_default", &self.behavior.is_some())
            .field("formats", &self.formats())
            .field("decoders", &self.decoders())
            .field("has_parse_hook", &self.parse_hook.is_some())
            .field("validators", &self.validators.len())
            .finish()
    }
}
