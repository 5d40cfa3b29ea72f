//! The tag registry: name to descriptor.
//!
//! A registry is built up front and then only read. Parsing and rendering
//! take `&Registry`, so the borrow checker rules out registration while a
//! parse or render is in flight. Share a finished registry across threads
//! with `Arc<Registry>`.
//!
//! # Duplicate Names
//!
//! Registering a name twice fails with [`RegistryError::Duplicate`] unless
//! the registry was built with [`DuplicatePolicy::Replace`]. Use
//! [`Registry::register_override`] to replace one tag explicitly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tagweave_lexer::is_valid_name;

use crate::descriptor::TagDescriptor;
use crate::error::RegistryError;

/// What [`Registry::register`] does with a name that is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Fail,
    Replace,
}

/// Identifies one registration. Replacing a tag gives it a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u32);

/// Returned by a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHandle {
    id: TagId,
    name: String,
}

impl TagHandle {
    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: TagId,
    descriptor: TagDescriptor,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    policy: DuplicatePolicy,
    tags: HashMap<String, Entry>,
    // Reverse map for diagnostics, kept in sync with `tags`.
    names: HashMap<TagId, String>,
    next_id: u32,
}

impl Registry {
    /// An empty registry that fails on duplicate names.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Adds a tag, honoring the duplicate policy.
    pub fn register(&mut self, descriptor: TagDescriptor) -> Result<TagHandle, RegistryError> {
        let name = descriptor.name();
        if !is_valid_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.tags.contains_key(name) {
            match self.policy {
                DuplicatePolicy::Fail => return Err(RegistryError::Duplicate(name.to_string())),
                DuplicatePolicy::Replace => {
                    tracing::warn!(tag = name, "replacing previously registered tag");
                }
            }
        }
        Ok(self.insert(descriptor))
    }

    /// Adds a tag, replacing any tag with the same name.
    ///
    /// Invalid names are still rejected.
    pub fn register_override(
        &mut self,
        descriptor: TagDescriptor,
    ) -> Result<TagHandle, RegistryError> {
        if !is_valid_name(descriptor.name()) {
            return Err(RegistryError::InvalidName(descriptor.name().to_string()));
        }
        tracing::debug!(tag = descriptor.name(), "overriding tag");
        Ok(self.insert(descriptor))
    }

    fn insert(&mut self, descriptor: TagDescriptor) -> TagHandle {
        let id = TagId(self.next_id);
        self.next_id += 1;
        let name = descriptor.name().to_string();

        if let Some(old) = self.tags.insert(name.clone(), Entry { id, descriptor }) {
            self.names.remove(&old.id);
        }
        self.names.insert(id, name.clone());
        tracing::debug!(tag = %name, id = id.0, "registered tag");
        TagHandle { id, name }
    }

    /// Removes a tag. Templates parsed earlier that use it will fail to
    /// render.
    pub fn unregister(&mut self, name: &str) -> Option<TagDescriptor> {
        let entry = self.tags.remove(name)?;
        self.names.remove(&entry.id);
        tracing::debug!(tag = name, "unregistered tag");
        Some(entry.descriptor)
    }

    pub fn lookup(&self, name: &str) -> Option<&TagDescriptor> {
        self.tags.get(name).map(|e| &e.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// The current handle for `name`.
    pub fn handle(&self, name: &str) -> Option<TagHandle> {
        self.tags.get_key_value(name).map(|(name, e)| TagHandle {
            id: e.id,
            name: name.clone(),
        })
    }

    /// The name registered under `id`, if that registration is still live.
    pub fn name_of(&self, id: TagId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Descriptors in registration order. A replaced tag counts as
    /// registered when it was replaced.
    pub fn descriptors(&self) -> impl Iterator<Item = &TagDescriptor> {
        let mut entries: Vec<_> = self.tags.values().collect();
        entries.sort_unstable_by_key(|e| e.id);
        entries.into_iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
