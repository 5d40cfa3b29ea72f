//! The engine facade and the one-shot entry point.
//!
//! [`Engine`] bundles a syntax, a tag registry and a set of named,
//! pre-compiled templates. Use it when the same templates are rendered
//! repeatedly; use [`render_template`] for a single source string.
//!
//! # Example
//!
//! ```rust
//! use tagweave::{Context, Engine, RenderScope, TagDescriptor, TagNode};
//!
//! let mut engine = Engine::new();
//! engine
//!     .register(TagDescriptor::from_fn("b", |_: &TagNode, s: &mut RenderScope<'_>| {
//!         Ok(format!("<strong>{}</strong>", s.render_children()?))
//!     }))
//!     .unwrap();
//!
//! engine.add_template("greeting", "Hello [b]world[/b]!").unwrap();
//!
//! let out = engine.render_named("greeting", &mut Context::new()).unwrap();
//! assert_eq!(out, "Hello <strong>world</strong>!");
//! ```

use std::collections::HashMap;

use tagweave_lexer::Syntax;

use crate::config::EngineConfig;
use crate::context::Context;
use crate::decode::decode_output;
use crate::descriptor::TagDescriptor;
use crate::error::{DecodeError, Error, ParseError, RegistryError, RenderError, Result};
use crate::node::Template;
use crate::parser::Parser;
use crate::registry::{Registry, TagHandle};
use crate::render::Renderer;

/// Tokenizes, parses and renders `source` in one call, with the default
/// syntax and nesting limit.
///
/// Fails with the first error of any stage. No partial output is returned.
pub fn render_template(source: &str, context: &mut Context, registry: &Registry) -> Result<String> {
    let syntax = Syntax::default();
    let template = Parser::new(registry, &syntax).parse(source)?;
    Ok(Renderer::new(registry).render(&template, context)?)
}

/// A configured registry plus named, pre-compiled templates.
///
/// Templates are compiled against the registry as it was at the time.
/// Unregistering a tag afterwards makes templates that use it fail to
/// render with [`RenderError::UnknownTag`].
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    registry: Registry,
    templates: HashMap<String, Template>,
}

impl Engine {
    /// An engine with BBCode syntax and no tags.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let registry = Registry::with_policy(config.duplicates);
        Self::with_registry(config, registry)
    }

    /// Uses an already populated registry.
    pub fn with_registry(config: EngineConfig, registry: Registry) -> Self {
        Self {
            config,
            registry,
            templates: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn syntax(&self) -> &Syntax {
        &self.config.syntax
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn register(&mut self, descriptor: TagDescriptor) -> std::result::Result<TagHandle, RegistryError> {
        self.registry.register(descriptor)
    }

    pub fn register_override(
        &mut self,
        descriptor: TagDescriptor,
    ) -> std::result::Result<TagHandle, RegistryError> {
        self.registry.register_override(descriptor)
    }

    pub fn unregister(&mut self, name: &str) -> Option<TagDescriptor> {
        self.registry.unregister(name)
    }

    /// A parser using this engine's registry, syntax and depth limit.
    pub fn parser(&self) -> Parser<'_> {
        Parser::new(&self.registry, &self.config.syntax).max_depth(self.config.max_depth)
    }

    pub fn compile(&self, source: &str) -> std::result::Result<Template, ParseError> {
        self.parser().parse(source)
    }

    /// Checks that `source` parses, without keeping the tree.
    pub fn validate(&self, source: &str) -> std::result::Result<(), ParseError> {
        self.compile(source).map(|_| ())
    }

    pub fn render(
        &self,
        template: &Template,
        context: &mut Context,
    ) -> std::result::Result<String, RenderError> {
        Renderer::new(&self.registry).render(template, context)
    }

    /// Renders with each tag's behavior for `format`.
    pub fn render_as(
        &self,
        template: &Template,
        context: &mut Context,
        format: &str,
    ) -> std::result::Result<String, RenderError> {
        Renderer::new(&self.registry)
            .format(format)
            .render(template, context)
    }

    /// Turns output rendered for `format` back into markup in this
    /// engine's syntax.
    pub fn decode(&self, output: &str, format: &str) -> std::result::Result<String, DecodeError> {
        decode_output(output, format, &self.registry, &self.config.syntax)
    }

    /// Compiles and renders `source` without storing it.
    pub fn render_str(&self, source: &str, context: &mut Context) -> Result<String> {
        let template = self.compile(source)?;
        Ok(self.render(&template, context)?)
    }

    /// Compiles `source` and stores it under `name`, replacing any template
    /// of the same name.
    pub fn add_template(&mut self, name: impl Into<String>, source: &str) -> Result<()> {
        let name = name.into();
        let template = self.compile(source)?;
        tracing::debug!(template = %name, depth = template.depth(), "compiled template");
        self.templates.insert(name, template);
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Names of stored templates, sorted.
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn remove_template(&mut self, name: &str) -> Option<Template> {
        self.templates.remove(name)
    }

    pub fn render_named(&self, name: &str, context: &mut Context) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
        Ok(self.render(template, context)?)
    }

    /// Like [`render_named`](Self::render_named), for a specific format.
    pub fn render_named_as(&self, name: &str, context: &mut Context, format: &str) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
        Ok(self.render_as(template, context, format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BehaviorTable;
    use crate::context::Scope;
    use crate::node::TagNode;
    use crate::registry::DuplicatePolicy;
    use crate::render::RenderScope;
    use crate::value::to_display;

    fn strong(_: &TagNode, scope: &mut RenderScope<'_>) -> std::result::Result<String, RenderError> {
        Ok(format!("<strong>{}</strong>", scope.render_children()?))
    }

    fn plain(_: &TagNode, scope: &mut RenderScope<'_>) -> std::result::Result<String, RenderError> {
        scope.render_children()
    }

    fn name(_: &TagNode, scope: &mut RenderScope<'_>) -> std::result::Result<String, RenderError> {
        Ok(to_display(scope.require("name")?))
    }

    fn engine() -> Engine {
        let mut engine = Engine::new();
        engine.register(TagDescriptor::new("b", strong)).unwrap();
        engine.register(TagDescriptor::new("name", name).void()).unwrap();
        engine
    }

    #[test]
    fn test_render_template_entry_point() {
        let mut registry = Registry::new();
        registry.register(TagDescriptor::new("b", strong)).unwrap();

        let out = render_template("a [b]b[/b] c", &mut Context::new(), &registry).unwrap();
        assert_eq!(out, "a <strong>b</strong> c");
    }

    #[test]
    fn test_render_template_errors() {
        let registry = Registry::new();
        let err = render_template("[b]x[/b]", &mut Context::new(), &registry).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnknownTag { .. })));
    }

    #[test]
    fn test_named_templates() {
        let mut engine = engine();
        engine.add_template("hi", "Hi [name]!").unwrap();
        assert!(engine.has_template("hi"));
        assert_eq!(engine.template_names(), vec!["hi"]);

        let mut ctx = Context::with_root(Scope::new().with("name", "Ada"));
        assert_eq!(engine.render_named("hi", &mut ctx).unwrap(), "Hi Ada!");
    }

    #[test]
    fn test_missing_template() {
        let err = engine().render_named("nope", &mut Context::new()).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(ref n) if n == "nope"));
    }

    #[test]
    fn test_bad_template_not_stored() {
        let mut engine = engine();
        assert!(engine.add_template("bad", "[b]open").is_err());
        assert!(!engine.has_template("bad"));
    }

    #[test]
    fn test_validate() {
        let engine = engine();
        assert!(engine.validate("[b]ok[/b]").is_ok());
        assert!(matches!(
            engine.validate("[b]ok"),
            Err(ParseError::UnclosedTag { .. })
        ));
    }

    #[test]
    fn test_render_str_missing_value() {
        let err = engine().render_str("[name]", &mut Context::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::MissingValue { .. })));
    }

    #[test]
    fn test_config_applies() {
        let config = EngineConfig {
            syntax: Syntax::angle(),
            duplicates: DuplicatePolicy::Replace,
            max_depth: Some(1),
        };
        let mut engine = Engine::with_config(config);
        engine.register(TagDescriptor::new("b", strong)).unwrap();
        engine.register(TagDescriptor::new("b", strong)).unwrap();

        let mut ctx = Context::new();
        assert_eq!(
            engine.render_str("<b>x</b>[b]", &mut ctx).unwrap(),
            "<strong>x</strong>[b]"
        );
        assert!(matches!(
            engine.compile("<b><b>x</b></b>"),
            Err(ParseError::TooDeep { limit: 1, .. })
        ));
    }

    #[test]
    fn test_unregister_breaks_stored_templates() {
        let mut engine = engine();
        engine.add_template("t", "[b]x[/b]").unwrap();
        engine.unregister("b");

        let err = engine.render_named("t", &mut Context::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::UnknownTag { .. })));
    }

    #[test]
    fn test_render_as() {
        let mut engine = Engine::new();
        engine
            .register(TagDescriptor::new("b", strong).format("text", plain))
            .unwrap();
        engine.add_template("t", "[b]x[/b]").unwrap();

        let mut ctx = Context::new();
        assert_eq!(engine.render_named("t", &mut ctx).unwrap(), "<strong>x</strong>");
        assert_eq!(engine.render_named_as("t", &mut ctx, "text").unwrap(), "x");
    }

    #[test]
    fn test_second_format_behavior_replaces_first() {
        let mut engine = Engine::new();
        engine
            .register(
                TagDescriptor::new("b", plain)
                    .format("text", plain)
                    .format("text", strong),
            )
            .unwrap();
        let template = engine.compile("[b]x[/b]").unwrap();
        assert_eq!(
            engine.render_as(&template, &mut Context::new(), "text").unwrap(),
            "<strong>x</strong>"
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let mut engine = Engine::with_config(EngineConfig {
            syntax: Syntax::angle(),
            ..EngineConfig::default()
        });
        engine
            .register(
                TagDescriptor::new("b", strong)
                    .decoder("html", crate::decode::WrapDecoder::new("<strong>", "</strong>")),
            )
            .unwrap();

        let out = engine.render_str("a <b>b</b>", &mut Context::new()).unwrap();
        assert_eq!(out, "a <strong>b</strong>");
        assert_eq!(engine.decode(&out, "html").unwrap(), "a <b>b</b>");
    }

    #[test]
    fn test_decode_without_decoder() {
        let err = engine().decode("<strong>x</strong>", "html").unwrap_err();
        assert!(matches!(err, DecodeError::NoDecoder { ref name, .. } if name == "b"));
    }

    #[test]
    fn test_with_registry_from_config() {
        let config = crate::config::RegistryConfig::from_yaml("tags:\n  - name: b\n    render: strong\n")
            .unwrap();
        let table = BehaviorTable::new().with("strong", strong);
        let registry = Registry::from_config(&config, &table).unwrap();

        let engine = Engine::with_registry(EngineConfig::default(), registry);
        let out = engine.render_str("[b]x[/b]", &mut Context::new()).unwrap();
        assert_eq!(out, "<strong>x</strong>");
    }
}
