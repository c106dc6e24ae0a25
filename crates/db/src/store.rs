//! Generic JSON document store over the collection tables.
//!
//! Rows leave the database as `to_jsonb(t)` and enter it through
//! `jsonb_populate_record`, so one code path serves every collection.
//! Equality filters become a single JSONB containment test.

use std::sync::Arc;

use async_trait::async_trait;
use notesync_core::backend::{DocumentStore, SnapshotStream};
use notesync_core::document::{Collection, RawDocument};
use notesync_core::error::CoreError;
use notesync_core::query::{field, CollectionQuery, Direction};
use notesync_core::types::{DocId, Fields};
use notesync_events::{requery_feed, ChangeBus};
use serde_json::Value;
use uuid::Uuid;

use crate::schema::column;
use crate::DbPool;

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
    bus: Arc<ChangeBus>,
}

impl PgDocumentStore {
    /// `bus` must be fed by [`crate::listener::spawn_change_listener`] for
    /// subscriptions to see changes.
    pub fn new(pool: DbPool, bus: Arc<ChangeBus>) -> Self {
        Self { pool, bus }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Build the SELECT for a query. Fails on fields outside the whitelist.
pub fn select_sql(query: &CollectionQuery) -> Result<String, CoreError> {
    let table = query.collection.name();
    for filter in &query.filters {
        column(query.collection, &filter.field)?;
    }

    let order = match &query.order {
        // Nulls first ascending, last descending, like the local evaluator.
        Some(order) => {
            let col = column(query.collection, &order.field)?;
            let nulls = match order.direction {
                Direction::Asc => "NULLS FIRST",
                Direction::Desc => "NULLS LAST",
            };
            format!("t.{col} {} {nulls}, t.id ASC", order.direction.as_str().to_uppercase())
        }
        None => "t.id ASC".to_string(),
    };

    Ok(format!(
        "SELECT to_jsonb(t) FROM {table} t \
         WHERE to_jsonb(t) @> $1::jsonb \
         ORDER BY {order} \
         LIMIT $2"
    ))
}

/// All filters folded into one JSON object for the containment test.
fn filter_object(query: &CollectionQuery) -> Value {
    Value::Object(
        query
            .filters
            .iter()
            .map(|f| (f.field.clone(), f.value.clone()))
            .collect(),
    )
}

/// Checked, comma-separated column list for the given fields.
fn column_list(collection: Collection, fields: &Fields) -> Result<Vec<&'static str>, CoreError> {
    fields
        .keys()
        .map(|key| column(collection, key))
        .collect()
}

async fn run_query(pool: &DbPool, query: &CollectionQuery) -> Result<Vec<RawDocument>, CoreError> {
    let sql = select_sql(query)?;
    let rows: Vec<Value> = sqlx::query_scalar(&sql)
        .bind(filter_object(query))
        .bind(query.limit.map(|l| l as i64))
        .fetch_all(pool)
        .await
        .map_err(|e| CoreError::Connection(e.to_string()))?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let doc = RawDocument::from_flat(row);
            if doc.is_none() {
                tracing::warn!(collection = %query.collection, "Row without a text id skipped");
            }
            doc
        })
        .collect())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn subscribe(&self, query: &CollectionQuery) -> Result<SnapshotStream, CoreError> {
        // Subscribe before the first read so no commit is missed.
        let changes = self.bus.subscribe();
        let initial = run_query(&self.pool, query).await?;

        let pool = self.pool.clone();
        Ok(requery_feed(changes, query.clone(), initial, move |q| {
            let pool = pool.clone();
            async move { run_query(&pool, &q).await }
        }))
    }

    async fn query(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, CoreError> {
        run_query(&self.pool, query).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>, CoreError> {
        let sql = format!("SELECT to_jsonb(t) FROM {} t WHERE t.id = $1", collection.name());
        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;
        Ok(row.and_then(RawDocument::from_flat))
    }

    async fn create(&self, collection: Collection, mut fields: Fields) -> Result<DocId, CoreError> {
        let id = Uuid::now_v7().to_string();
        fields.insert(field::ID.to_string(), Value::String(id.clone()));
        let cols = column_list(collection, &fields)?.join(", ");
        let table = collection.name();

        let sql = format!(
            "INSERT INTO {table} ({cols}) \
             SELECT {cols} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) \
             RETURNING id"
        );
        let created: String = sqlx::query_scalar(&sql)
            .bind(Value::Object(fields))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::Write(e.to_string()))?;

        tracing::debug!(%collection, doc_id = %created, "Document inserted");
        Ok(created)
    }

    async fn update(&self, collection: Collection, id: &str, mut fields: Fields) -> Result<(), CoreError> {
        fields.remove(field::ID);
        if fields.is_empty() {
            return Ok(());
        }
        let table = collection.name();
        let assignments = column_list(collection, &fields)?
            .iter()
            .map(|col| format!("{col} = r.{col}"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "UPDATE {table} SET {assignments} \
             FROM jsonb_populate_record(NULL::{table}, $2::jsonb) AS r \
             WHERE {table}.id = $1"
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(fields))
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Write(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::Write(format!(
                "{} {id} does not exist",
                collection.entity()
            )));
        }
        tracing::debug!(%collection, doc_id = %id, "Document updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn feed_query_orders_newest_first_with_id_tiebreak() {
        let sql = select_sql(&CollectionQuery::public_feed()).unwrap();
        assert!(sql.contains("FROM notes t"));
        assert!(sql.contains("ORDER BY t.created_at DESC NULLS LAST, t.id ASC"));
    }

    #[test]
    fn unordered_query_falls_back_to_id() {
        let sql = select_sql(&CollectionQuery::folders_of("u1")).unwrap();
        assert!(sql.contains("ORDER BY t.id ASC"));
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let query = CollectionQuery::new(Collection::Comments).where_eq("is_public", true);
        assert_matches!(select_sql(&query), Err(CoreError::Validation(_)));
    }

    #[test]
    fn filters_fold_into_one_object() {
        let query = CollectionQuery::new(Collection::Notes)
            .where_eq("user_id", "u1")
            .where_eq("is_public", true);
        assert_eq!(
            filter_object(&query),
            serde_json::json!({"user_id": "u1", "is_public": true})
        );
    }
}
