//! Scoped name lookup for rendering.
//!
//! A [`Context`] is a stack of [`Scope`]s. The bottom scope is the root data
//! supplied by the caller; tags that introduce local bindings (loops, `with`
//! blocks) push a scope for their children and pop it afterwards. Lookups
//! search innermost first and fall through to outer scopes.
//!
//! Scopes are sealed once pushed: there is no way to insert into a scope on
//! the stack, only to push a new one on top.

use serde::Serialize;
use serde_json::Map;

use crate::error::Error;
use crate::value::{resolve_path, Value};

/// One layer of bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: Map<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a binding, returning the previous value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a scope from any value that serializes to a map.
    ///
    /// `()` and other values serializing to null give an empty scope.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, Error> {
        match serde_json::to_value(data).map_err(|e| Error::Context(e.to_string()))? {
            Value::Object(vars) => Ok(Self { vars }),
            Value::Null => Ok(Self::new()),
            other => Err(Error::Context(format!(
                "context data must serialize to a map, got {}",
                kind_of(&other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

impl From<Map<String, Value>> for Scope {
    fn from(vars: Map<String, Value>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The scope stack threaded through a render call.
///
/// Create one per top-level render. A context may be reused across renders;
/// every render leaves the stack at the depth it started with.
#[derive(Debug, Clone)]
pub struct Context {
    // Never empty: index 0 is the root scope.
    scopes: Vec<Scope>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::with_root(Scope::new())
    }

    pub fn with_root(root: Scope) -> Self {
        Self { scopes: vec![root] }
    }

    /// Uses serialized `data` as the root scope.
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use tagweave::Context;
    ///
    /// #[derive(Serialize)]
    /// struct Page { title: String }
    ///
    /// let ctx = Context::from_serialize(&Page { title: "Home".into() }).unwrap();
    /// assert_eq!(ctx.lookup("title").unwrap(), "Home");
    /// ```
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, Error> {
        Scope::from_serialize(data).map(Self::with_root)
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Pushes a scope that shadows everything below it.
    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Pops the innermost pushed scope. The root is never popped.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Number of scopes pushed above the root.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Pops back down to `depth` pushed scopes.
    pub(crate) fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth + 1);
    }

    /// Looks up a plain name, innermost scope first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Looks up a dotted path such as `user.name` or `items.0`.
    ///
    /// The first segment is resolved through the scope stack, the rest
    /// inside the value it names.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        match path.split_once('.') {
            Some((head, rest)) => resolve_path(self.get(head)?, rest),
            None => self.get(path),
        }
    }
}
