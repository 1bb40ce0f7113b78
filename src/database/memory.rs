use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::document::Document;
use crate::database::schema::SchemaRegistry;
use crate::database::store::{DocumentStore, StoreError};
use crate::filter::Filter;

type Collection = Vec<(Uuid, Map<String, Value>)>;

/// In-process store; collections keep insertion order
pub struct MemoryStore {
    registry: SchemaRegistry,
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn load_all(&self, kind: &str) -> Result<Vec<Document>, StoreError> {
        let schema = self.schema(kind)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(kind)
            .map(|rows| {
                rows.iter()
                    .map(|(id, body)| Document::from_stored(schema.clone(), *id, body.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let docs = self.load_all(filter.kind()).await?;
        Ok(filter.apply(docs))
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let docs = self.load_all(filter.kind()).await?;
        Ok(docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn save(&self, doc: &Document) -> Result<Document, StoreError> {
        self.schema(doc.kind())?;
        let mut collections = self.collections.write().await;
        let rows = collections.entry(doc.kind().to_string()).or_default();
        let body = doc.body().clone();
        match rows.iter_mut().find(|(id, _)| *id == doc.id()) {
            Some(row) => row.1 = body,
            None => rows.push((doc.id(), body)),
        }

        let mut saved = doc.clone();
        saved.mark_persisted();
        Ok(saved)
    }

    async fn remove(&self, kind: &str, id: Uuid) -> Result<bool, StoreError> {
        self.schema(kind)?;
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(kind) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|(row_id, _)| *row_id != id);
        Ok(rows.len() != before)
    }
}
