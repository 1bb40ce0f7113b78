//! Generic list/get/create/update/destroy over a document store.
//!
//! A [`Crud`] wraps one [`ResourceDefinition`]; the HTTP layer in
//! `handlers` only extracts request data and calls through.

pub mod batch;
pub mod error;
pub mod persist;
pub mod read;
pub mod resource;

use serde_json::Value;
use std::sync::Arc;

pub use batch::{parse_models, BatchResult};
pub use error::CrudError;
pub use persist::{validate_and_save, SaveOutcome};
pub use read::{ListParams, Paging};
pub use resource::{
    ForeignKeys, Populate, RequestContext, ResourceDefinition, ResourceOptions, DEFAULT_PAGE_SIZE, PAGE_SIZES,
};

/// Cheap-to-clone handle to one resource's operations
#[derive(Debug, Clone)]
pub struct Crud {
    resource: Arc<ResourceDefinition>,
}

impl Crud {
    pub fn new(resource: ResourceDefinition) -> Self {
        Self { resource: Arc::new(resource) }
    }

    pub fn resource(&self) -> &ResourceDefinition {
        &self.resource
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Value, CrudError> {
        read::get(&self.resource, ctx, id).await
    }

    pub async fn list(&self, ctx: &RequestContext, params: &ListParams) -> Result<Value, CrudError> {
        read::list(&self.resource, ctx, params).await
    }

    pub async fn create(&self, body: &Value) -> Result<BatchResult, CrudError> {
        let models = parse_models(body, "create")?;
        batch::create(&self.resource, &models).await
    }

    pub async fn update(&self, ctx: &RequestContext, body: &Value) -> Result<BatchResult, CrudError> {
        let models = parse_models(body, "update")?;
        batch::update(&self.resource, ctx, &models).await
    }

    pub async fn destroy(&self, body: &Value) -> Result<Vec<Value>, CrudError> {
        let models = parse_models(body, "destroy")?;
        batch::destroy(&self.resource, &models).await
    }
}
