//! Loading engine settings and tag sets from YAML or JSON.
//!
//! Tag behaviors, validators and decoders are code, so a config file names
//! them and a [`BehaviorTable`] supplied by the caller maps those names to
//! implementations.
//!
//! ```yaml
//! tags:
//!   - name: b
//!     description: Bold text
//!     render: strong
//!     formats:
//!       text: plain
//!     decoders:
//!       html: strong_html
//!   - name: list
//!     render: list
//!     validators: [only_items]
//!   - name: br
//!     void: true
//!     render: line_break
//!   - name: code
//!     verbatim: true
//!     render: pre
//!     attributes:
//!       optional: [lang]
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tagweave_lexer::Syntax;

use crate::decode::TagDecoder;
use crate::descriptor::{AttributeSchema, TagBehavior, TagDescriptor, TagValidator};
use crate::error::{Error, RegistryError};
use crate::hook::Verbatim;
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::registry::{DuplicatePolicy, Registry};

/// Settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub syntax: Syntax,
    pub duplicates: DuplicatePolicy,
    /// Nesting limit for parsing. `None` disables it.
    pub max_depth: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            syntax: Syntax::default(),
            duplicates: DuplicatePolicy::default(),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(source: &str) -> Result<Self, Error> {
        let config = serde_yaml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        tracing::debug!(?config, "loaded engine config");
        Ok(config)
    }

    pub fn from_json(source: &str) -> Result<Self, Error> {
        let config = serde_json::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        tracing::debug!(?config, "loaded engine config");
        Ok(config)
    }
}

fn yes() -> bool {
    true
}

/// One tag in a [`RegistryConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Stands alone, with no close tag.
    #[serde(default)]
    pub void: bool,
    #[serde(default = "yes")]
    pub children: bool,
    #[serde(default = "yes")]
    pub self_nesting: bool,
    /// Keeps the body as literal text.
    #[serde(default)]
    pub verbatim: bool,
    /// Behavior name for the default format.
    #[serde(default)]
    pub render: Option<String>,
    /// Behavior names per output format.
    #[serde(default)]
    pub formats: BTreeMap<String, String>,
    /// Decoder names per output format.
    #[serde(default)]
    pub decoders: BTreeMap<String, String>,
    /// Validator names, run in this order.
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub attributes: Option<AttributeSchema>,
}

impl TagSpec {
    fn to_descriptor(&self, behaviors: &BehaviorTable) -> Result<TagDescriptor, RegistryError> {
        let resolve = |behavior: &str| {
            behaviors
                .get(behavior)
                .ok_or_else(|| RegistryError::UnknownBehavior {
                    tag: self.name.clone(),
                    behavior: behavior.to_string(),
                })
        };

        let mut descriptor = TagDescriptor::without_default(&self.name)
            .children(self.children)
            .self_nesting(self.self_nesting);
        if let Some(name) = &self.render {
            descriptor = descriptor.with_shared(resolve(name)?);
        }
        for (format, name) in &self.formats {
            descriptor = descriptor.format_shared(format, resolve(name)?);
        }
        for (format, name) in &self.decoders {
            let decoder = behaviors
                .decoder(name)
                .ok_or_else(|| RegistryError::UnknownDecoder {
                    tag: self.name.clone(),
                    decoder: name.clone(),
                })?;
            descriptor = descriptor.decoder_shared(format, decoder);
        }
        for name in &self.validators {
            let validator = behaviors
                .validator(name)
                .ok_or_else(|| RegistryError::UnknownValidator {
                    tag: self.name.clone(),
                    validator: name.clone(),
                })?;
            descriptor = descriptor.validator_shared(validator);
        }
        if let Some(description) = &self.description {
            descriptor = descriptor.description(description);
        }
        if let Some(schema) = &self.attributes {
            descriptor = descriptor.attributes(schema.clone());
        }
        if self.void {
            descriptor = descriptor.void();
        }
        if self.verbatim {
            descriptor = descriptor.parse_hook(Verbatim);
        }
        Ok(descriptor)
    }
}

/// A set of tags described as data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub tags: Vec<TagSpec>,
}

impl RegistryConfig {
    pub fn from_yaml(source: &str) -> Result<Self, Error> {
        let config: Self =
            serde_yaml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        tracing::debug!(tags = config.tags.len(), "loaded tag config");
        Ok(config)
    }

    pub fn from_json(source: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        tracing::debug!(tags = config.tags.len(), "loaded tag config");
        Ok(config)
    }

    /// Registers every tag into `registry`, stopping at the first error.
    pub fn apply(&self, registry: &mut Registry, behaviors: &BehaviorTable) -> Result<(), RegistryError> {
        for spec in &self.tags {
            registry.register(spec.to_descriptor(behaviors)?)?;
        }
        Ok(())
    }
}

/// Named behaviors, validators and decoders that config files can refer
/// to. Each kind has its own namespace.
#[derive(Clone, Default)]
pub struct BehaviorTable {
    behaviors: HashMap<String, Arc<dyn TagBehavior>>,
    validators: HashMap<String, Arc<dyn TagValidator>>,
    decoders: HashMap<String, Arc<dyn TagDecoder>>,
}

impl BehaviorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a behavior, builder style.
    pub fn with(mut self, name: impl Into<String>, behavior: impl TagBehavior + 'static) -> Self {
        self.insert(name, behavior);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, behavior: impl TagBehavior + 'static) {
        self.behaviors.insert(name.into(), Arc::new(behavior));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TagBehavior>> {
        self.behaviors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }

    pub fn with_validator(mut self, name: impl Into<String>, validator: impl TagValidator + 'static) -> Self {
        self.insert_validator(name, validator);
        self
    }

    pub fn insert_validator(&mut self, name: impl Into<String>, validator: impl TagValidator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    pub fn validator(&self, name: &str) -> Option<Arc<dyn TagValidator>> {
        self.validators.get(name).cloned()
    }

    pub fn with_decoder(mut self, name: impl Into<String>, decoder: impl TagDecoder + 'static) -> Self {
        self.insert_decoder(name, decoder);
        self
    }

    pub fn insert_decoder(&mut self, name: impl Into<String>, decoder: impl TagDecoder + 'static) {
        self.decoders.insert(name.into(), Arc::new(decoder));
    }

    pub fn decoder(&self, name: &str) -> Option<Arc<dyn TagDecoder>> {
        self.decoders.get(name).cloned()
    }

    /// Number of entries of all kinds.
    pub fn len(&self) -> usize {
        self.behaviors.len() + self.validators.len() + self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<_> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTable")
            .field("behaviors", &sorted_keys(&self.behaviors))
            .field("validators", &sorted_keys(&self.validators))
            .field("decoders", &sorted_keys(&self.decoders))
            .finish()
    }
}

impl Registry {
    /// Builds a registry from a tag config, failing on duplicates.
    pub fn from_config(config: &RegistryConfig, behaviors: &BehaviorTable) -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        config.apply(&mut registry, behaviors)?;
        Ok(registry)
    }
}
