//! Flattens a definition and its ancestors into a single [`Definition`].
//!
//! A definition inherits from the definition named by its `type` field until
//! the chain reaches `"object"`. Definitions may also mix in the properties of
//! the types listed under `extends.type`. Scalar fields come from the most
//! derived definition that sets them, and the merged `properties` map always
//! lets the most derived declaration win.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::Config,
    schema::{Definition, Schema, SchemaError},
};

/// Most definitions a single inheritance chain may hold, the requested one
/// included. A limit of `n` allows `n - 1` hops from the requested type to
/// its farthest ancestor, so a limit of 0 rejects every lookup.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("type {0} is not defined")]
    NotFound(String),

    #[error("type {name} inherits from undefined type {parent}")]
    DanglingParent { name: String, parent: String },

    #[error("cyclic type definition: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("inheritance chain of {name} is deeper than {max_depth} levels")]
    TooDeep { name: String, max_depth: usize },
}

/// What to resolve: a type name, or a definition that is already in hand.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Id(&'a str),
    Definition(&'a Definition),
}

impl<'a> From<&'a str> for NodeRef<'a> {
    fn from(id: &'a str) -> Self {
        NodeRef::Id(id)
    }
}

impl<'a> From<&'a String> for NodeRef<'a> {
    fn from(id: &'a String) -> Self {
        NodeRef::Id(id.as_str())
    }
}

impl<'a> From<&'a Definition> for NodeRef<'a> {
    fn from(definition: &'a Definition) -> Self {
        NodeRef::Definition(definition)
    }
}

/// Resolves `name` against `schema`.
///
/// A missing name, or a chain that breaks on an undefined parent, gives
/// `Ok(None)`. Cyclic chains and chains deeper than [`DEFAULT_MAX_DEPTH`]
/// are errors.
pub fn lookup_definition<'s>(
    name: &str,
    schema: &'s Schema,
) -> Result<Option<Cow<'s, Definition>>, ResolveError> {
    absent_if_unresolved(resolve(name, schema, DEFAULT_MAX_DEPTH))
}

/// Resolves `name` against `schema`, reporting exactly why it failed.
///
/// Base definitions come back borrowed from the schema. Anything that
/// inherits is built into a new definition; the schema is never modified.
pub fn resolve<'s>(
    name: &str,
    schema: &'s Schema,
    max_depth: usize,
) -> Result<Cow<'s, Definition>, ResolveError> {
    Walk::new(schema, max_depth).resolve(name)
}

fn absent_if_unresolved<T>(result: Result<T, ResolveError>) -> Result<Option<T>, ResolveError> {
    match result {
        Ok(found) => Ok(Some(found)),
        Err(ResolveError::NotFound(name)) => {
            debug!("no definition for {}", name);
            Ok(None)
        }
        Err(ResolveError::DanglingParent { name, parent }) => {
            warn!("definition {} inherits from undefined type {}", name, parent);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

struct Walk<'s> {
    schema: &'s Schema,
    max_depth: usize,
    // names currently being resolved, outermost first
    path: Vec<String>,
    // merged definitions of this call and the length of their longest chain
    resolved: HashMap<String, (Definition, usize)>,
}

impl<'s> Walk<'s> {
    fn new(schema: &'s Schema, max_depth: usize) -> Self {
        Walk {
            schema,
            max_depth,
            path: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    fn resolve(&mut self, name: &str) -> Result<Cow<'s, Definition>, ResolveError> {
        self.resolve_chain(name).map(|(definition, _)| definition)
    }

    // Also returns how many definitions the longest chain below `name` holds, itself included.
    fn resolve_chain(&mut self, name: &str) -> Result<(Cow<'s, Definition>, usize), ResolveError> {
        if let Some(start) = self.path.iter().position(|n| n == name) {
            let mut chain = self.path[start..].to_vec();
            chain.push(name.to_string());
            return Err(ResolveError::Cycle(chain));
        }

        if let Some((definition, height)) = self.resolved.get(name) {
            let height = *height;
            if self.path.len() + height > self.max_depth {
                return Err(self.too_deep(name));
            }
            return Ok((Cow::Owned(definition.clone()), height));
        }

        if self.path.len() >= self.max_depth {
            return Err(self.too_deep(name));
        }

        let schema = self.schema;
        let definition = schema
            .get(name)
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))?;
        if definition.is_self_contained() {
            return Ok((Cow::Borrowed(definition), 1));
        }

        self.path.push(name.to_string());
        let merged = self.merge(name, definition);
        self.path.pop();

        let (merged, height) = merged?;
        self.resolved
            .insert(name.to_string(), (merged.clone(), height));
        Ok((Cow::Owned(merged), height))
    }

    fn too_deep(&self, name: &str) -> ResolveError {
        ResolveError::TooDeep {
            name: self.path.first().cloned().unwrap_or_else(|| name.to_string()),
            max_depth: self.max_depth,
        }
    }

    fn merge(
        &mut self,
        name: &str,
        definition: &Definition,
    ) -> Result<(Definition, usize), ResolveError> {
        let mut properties: IndexMap<String, Value> = IndexMap::new();
        let mut below = 0;

        let mut merged = match definition.parent() {
            Some(parent) => {
                let (base, height) = self.resolve_parent(name, parent)?;
                below = below.max(height);
                properties.extend(clone_entries(&base.properties));
                definition.overlay(&base)
            }
            None => definition.clone(),
        };

        for extended in definition.extended_types() {
            let (base, height) = self.resolve_parent(name, extended)?;
            below = below.max(height);
            properties.extend(clone_entries(&base.properties));
        }

        properties.extend(clone_entries(&definition.properties));
        merged.properties = properties;

        debug!(
            "resolved {} with {} properties",
            name,
            merged.properties.len()
        );
        Ok((merged, below + 1))
    }

    fn resolve_parent(
        &mut self,
        name: &str,
        parent: &str,
    ) -> Result<(Cow<'s, Definition>, usize), ResolveError> {
        self.resolve_chain(parent).map_err(|e| match e {
            ResolveError::NotFound(parent) => ResolveError::DanglingParent {
                name: name.to_string(),
                parent,
            },
            e => e,
        })
    }
}

fn clone_entries(map: &IndexMap<String, Value>) -> impl Iterator<Item = (String, Value)> + '_ {
    map.iter().map(|(k, v)| (k.clone(), v.clone()))
}

/// Resolves definitions against one schema it holds on to.
#[derive(Debug, Clone)]
pub struct Resolver {
    schema: Arc<Schema>,
    max_depth: usize,
}

impl Resolver {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Resolver {
            schema: schema.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Builds a resolver over the configured schema, or the packaged camel model.
    pub fn from_config(config: &Config) -> Result<Self, SchemaError> {
        let schema = match &config.schema {
            Some(path) => Schema::load(path)?,
            None => crate::camel::model()?,
        };
        Ok(Resolver::new(schema).with_max_depth(config.max_depth))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn resolve(&self, name: &str) -> Result<Cow<'_, Definition>, ResolveError> {
        resolve(name, &self.schema, self.max_depth)
    }

    pub fn lookup_definition(&self, name: &str) -> Result<Option<Cow<'_, Definition>>, ResolveError> {
        absent_if_unresolved(self.resolve(name))
    }

    /// Resolves a type name, or hands back a definition that is already resolved.
    pub fn get_schema<'a>(
        &'a self,
        node: impl Into<NodeRef<'a>>,
    ) -> Result<Option<Cow<'a, Definition>>, ResolveError> {
        match node.into() {
            NodeRef::Id(id) => self.lookup_definition(id),
            NodeRef::Definition(definition) => Ok(Some(Cow::Borrowed(definition))),
        }
    }
}
