use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::database::document::Document;
use crate::database::schema::{Schema, SchemaRegistry};
use crate::error::ValidationError;
use crate::filter::{Filter, FilterError};

/// Errors from document store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Unknown document kind: {0}")]
    UnknownKind(String),

    #[error("Corrupt document {kind}({id}): {reason}")]
    Corrupt { kind: String, id: Uuid, reason: String },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Asynchronous document database used by the CRUD layer
///
/// Implementations own their schema registry; handles are shared as
/// `Arc<dyn DocumentStore>` and injected into each resource definition.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn registry(&self) -> &SchemaRegistry;

    fn schema(&self, kind: &str) -> Result<Arc<Schema>, StoreError> {
        self.registry()
            .get(kind)
            .ok_or_else(|| StoreError::UnknownKind(kind.to_string()))
    }

    /// Documents matching the filter, ordered and paged as it specifies
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Number of documents matching the filter, ignoring paging
    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn find_one(&self, kind: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let filter = Filter::by_id(kind, id)?.limit(1);
        Ok(self.find(&filter).await?.into_iter().next())
    }

    /// Insert or replace; returns the persisted form
    async fn save(&self, doc: &Document) -> Result<Document, StoreError>;

    /// Returns false when nothing was stored under the id
    async fn remove(&self, kind: &str, id: Uuid) -> Result<bool, StoreError>;

    /// Backend liveness, reported by `/health`
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn validate(&self, doc: &Document) -> Result<(), ValidationError> {
        let id = doc.id().to_string();
        doc.schema().validate(Some(&id), doc.body())
    }

    /// Replace reference ids with the referenced documents
    async fn populate(&self, doc: &mut Document, fields: &[String]) -> Result<(), StoreError> {
        for field in fields {
            let target = match doc.schema().path(field).and_then(|f| f.reference.clone()) {
                Some(kind) => kind,
                None => {
                    tracing::warn!("Cannot populate '{}' on {}: not a reference field", field, doc.kind());
                    continue;
                }
            };

            let id = match doc.get(field).and_then(|v| v.as_str()).map(Uuid::parse_str) {
                Some(Ok(id)) => id,
                _ => continue,
            };

            match self.find_one(&target, id).await? {
                Some(referenced) => doc.set_populated(field, referenced),
                None => tracing::debug!("Reference {}.{} -> {}({}) not found", doc.kind(), field, target, id),
            }
        }
        Ok(())
    }
}
