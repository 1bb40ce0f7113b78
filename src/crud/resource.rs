use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::database::{DocumentStore, Schema};
use crate::projection::ConfigurationError;

/// Page sizes a list request may ask for
pub const PAGE_SIZES: [u64; 7] = [1, 5, 10, 15, 20, 30, 50];
pub const DEFAULT_PAGE_SIZE: u64 = 15;

/// Request data visible to dynamic resource options
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(params: HashMap<String, String>, query: HashMap<String, String>) -> Self {
        Self { params, query }
    }
}

pub type ContextFn<T> = Arc<dyn Fn(&RequestContext) -> T + Send + Sync>;

/// Equality conditions applied to every list query
#[derive(Clone)]
pub enum ForeignKeys {
    Static(Map<String, Value>),
    Dynamic(ContextFn<Map<String, Value>>),
}

/// Reference fields to populate on read and after update
#[derive(Clone)]
pub enum Populate {
    None,
    Static(Vec<String>),
    Dynamic(ContextFn<Vec<String>>),
}

impl fmt::Debug for ForeignKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignKeys::Static(map) => f.debug_tuple("Static").field(map).finish(),
            ForeignKeys::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl fmt::Debug for Populate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Populate::None => f.write_str("None"),
            Populate::Static(fields) => f.debug_tuple("Static").field(fields).finish(),
            Populate::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceOptions {
    pub editable_fields: Vec<String>,
    pub foreign_keys: ForeignKeys,
    pub populate: Populate,
    pub page_sizes: Vec<u64>,
    pub default_page_size: u64,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            editable_fields: Vec::new(),
            foreign_keys: ForeignKeys::Static(Map::new()),
            populate: Populate::None,
            page_sizes: PAGE_SIZES.to_vec(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ResourceOptions {
    pub fn new<I, S>(editable_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            editable_fields: editable_fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn foreign_keys(mut self, keys: Map<String, Value>) -> Self {
        self.foreign_keys = ForeignKeys::Static(keys);
        self
    }

    pub fn foreign_keys_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.foreign_keys = ForeignKeys::Dynamic(Arc::new(f));
        self
    }

    pub fn populate<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populate = Populate::Static(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn populate_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Vec<String> + Send + Sync + 'static,
    {
        self.populate = Populate::Dynamic(Arc::new(f));
        self
    }

    pub fn page_sizes(mut self, sizes: Vec<u64>, default: u64) -> Self {
        self.page_sizes = sizes;
        self.default_page_size = default;
        self
    }
}

/// A document kind exposed over REST, with its options and store handle
#[derive(Clone)]
pub struct ResourceDefinition {
    schema: Arc<Schema>,
    options: ResourceOptions,
    store: Arc<dyn DocumentStore>,
}

impl ResourceDefinition {
    /// Fails when the store has no schema registered for `kind`
    pub fn new(kind: &str, store: Arc<dyn DocumentStore>, options: ResourceOptions) -> Result<Self, ConfigurationError> {
        let schema = store
            .registry()
            .get(kind)
            .ok_or_else(|| ConfigurationError::UnknownKind(kind.to_string()))?;
        Ok(Self { schema, options, store })
    }

    pub fn kind(&self) -> &str {
        &self.schema.kind
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn options(&self) -> &ResourceOptions {
        &self.options
    }

    pub fn editable_fields(&self) -> &[String] {
        &self.options.editable_fields
    }

    pub fn base_where(&self, ctx: &RequestContext) -> Map<String, Value> {
        match &self.options.foreign_keys {
            ForeignKeys::Static(map) => map.clone(),
            ForeignKeys::Dynamic(f) => f(ctx),
        }
    }

    /// None when the resource does not populate
    pub fn populate_fields(&self, ctx: &RequestContext) -> Option<Vec<String>> {
        match &self.options.populate {
            Populate::None => None,
            Populate::Static(fields) => Some(fields.clone()),
            Populate::Dynamic(f) => Some(f(ctx)),
        }
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("kind", &self.schema.kind)
            .field("options", &self.options)
            .finish()
    }
}
