//! PostgreSQL document store
//!
//! All collections share one `documents` table; records live in a JSONB
//! column and filters are pushed down as `@>` containment.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

use super::{DocumentStore, Filter, Sort, StoreError};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    seq BIGSERIAL,
    body JSONB NOT NULL,
    PRIMARY KEY (collection, key)
)"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS documents_body_idx ON documents USING GIN (body jsonb_path_ops)";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the documents table if missing
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let Json(body): Json<Value> = row.try_get("body")?;
                Ok(Some(body))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, collection: &str, key: &str, record: Value) -> Result<(), StoreError> {
        if !record.is_object() {
            return Err(StoreError::NotAnObject {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }
        sqlx::query(
            r#"INSERT INTO documents (collection, key, body) VALUES ($1, $2, $3)
               ON CONFLICT (collection, key) DO UPDATE SET body = EXCLUDED.body"#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_increment(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE documents
               SET body = jsonb_set(body, ARRAY[$3::text],
                                    to_jsonb(COALESCE((body->>$3)::bigint, 0) + $4))
               WHERE collection = $1 AND key = $2"#,
        )
        .bind(collection)
        .bind(key)
        .bind(field)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_set(
        &self,
        collection: &str,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET body = body || $3 WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, StoreError> {
        // A NULL sort path orders every row equally, leaving insertion order
        let direction = match sort {
            Some(s) if s.descending => "DESC NULLS LAST",
            _ => "ASC NULLS FIRST",
        };
        let sql = format!(
            r#"SELECT body FROM documents
               WHERE collection = $1 AND body @> $2
               ORDER BY body #> string_to_array($3, '.') {}, seq
               LIMIT $4"#,
            direction
        );

        let rows = sqlx::query(&sql)
            .bind(collection)
            .bind(Json(filter.to_containment()))
            .bind(sort.map(|s| s.field.clone()))
            .bind(limit.map(|l| l as i64))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Value, StoreError> {
                let Json(body): Json<Value> = row.try_get("body")?;
                Ok(body)
            })
            .collect()
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND body @> $2",
        )
        .bind(collection)
        .bind(Json(filter.to_containment()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }
}
