use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::document::Document;
use crate::database::manager::DatabaseManager;
use crate::database::schema::SchemaRegistry;
use crate::database::store::{DocumentStore, StoreError};
use crate::filter::filter_order::FilterOrder;
use crate::filter::filter_where::FilterWhere;
use crate::filter::{Filter, SqlResult};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    kind TEXT NOT NULL,
    id UUID NOT NULL,
    body JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (kind, id)
)"#;

/// Postgres backend: every kind shares one JSONB `documents` table
pub struct PgDocumentStore {
    registry: SchemaRegistry,
    manager: DatabaseManager,
}

impl PgDocumentStore {
    /// Wrap a connected manager and ensure the table exists
    pub async fn new(registry: SchemaRegistry, manager: DatabaseManager) -> Result<Self, StoreError> {
        sqlx::query(CREATE_TABLE).execute(manager.pool()).await?;
        Ok(Self { registry, manager })
    }

    fn pool(&self) -> &PgPool {
        self.manager.pool()
    }

    fn select_sql(filter: &Filter) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(filter, 1);
        let order_clause = FilterOrder::generate(filter.sort_specs());
        let limit_clause = match (filter.limit_count(), filter.skip_count()) {
            (Some(l), 0) => format!("LIMIT {}", l),
            (Some(l), o) => format!("LIMIT {} OFFSET {}", l, o),
            (None, 0) => String::new(),
            (None, o) => format!("OFFSET {}", o),
        };

        let query = [
            "SELECT id, body FROM documents".to_string(),
            format!("WHERE kind = $1 AND {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    fn count_sql(filter: &Filter) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(filter, 1);
        SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM documents WHERE kind = $1 AND {}", where_clause),
            params,
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let schema = self.schema(filter.kind())?;
        let sql_result = Self::select_sql(filter);
        tracing::debug!("find {}: {}", filter.kind(), sql_result.query);

        let mut q = sqlx::query(&sql_result.query).bind(filter.kind());
        for p in sql_result.params.iter() {
            q = q.bind(p);
        }
        let rows = q.fetch_all(self.pool()).await?;

        rows.into_iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                let body: Value = row.try_get("body")?;
                match body {
                    Value::Object(map) => Ok(Document::from_stored(schema.clone(), id, map)),
                    other => Err(StoreError::Corrupt {
                        kind: filter.kind().to_string(),
                        id,
                        reason: format!("body is not an object: {}", other),
                    }),
                }
            })
            .collect()
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.schema(filter.kind())?;
        let sql_result = Self::count_sql(filter);
        let mut q = sqlx::query(&sql_result.query).bind(filter.kind());
        for p in sql_result.params.iter() {
            q = q.bind(p);
        }
        let row = q.fetch_one(self.pool()).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn save(&self, doc: &Document) -> Result<Document, StoreError> {
        self.schema(doc.kind())?;
        let body = Value::Object(doc.body().clone());
        sqlx::query(
            "INSERT INTO documents (kind, id, body) VALUES ($1, $2, $3)
             ON CONFLICT (kind, id) DO UPDATE SET body = EXCLUDED.body, updated_at = now()",
        )
        .bind(doc.kind())
        .bind(doc.id())
        .bind(&body)
        .execute(self.pool())
        .await?;

        let mut saved = doc.clone();
        saved.mark_persisted();
        Ok(saved)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.manager.health_check().await
    }

    async fn remove(&self, kind: &str, id: Uuid) -> Result<bool, StoreError> {
        self.schema(kind)?;
        let result = sqlx::query("DELETE FROM documents WHERE kind = $1 AND id = $2")
            .bind(kind)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
