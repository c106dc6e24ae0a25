//! Document access over the PostgREST dialect.
//!
//! Collections map to tables of the same name under `/rest/v1/`. Equality
//! filters become `field=eq.value` parameters and ordering mirrors the
//! self-hosted store: nulls first ascending, last descending, with `id` as
//! the tiebreak.

use notesync_core::document::{Collection, RawDocument};
use notesync_core::query::{field, CollectionQuery, Direction};
use notesync_core::types::{DocId, Fields};
use reqwest::Method;
use serde_json::Value;

use crate::api::{HostedApi, HostedError};

/// Render a filter value as PostgREST expects it after the operator.
pub fn filter_param(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    }
}

/// Query-string parameters for a collection query.
pub fn query_params(query: &CollectionQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        params.push((filter.field.clone(), filter_param(&filter.value)));
    }

    let order = match &query.order {
        Some(order) => {
            let nulls = match order.direction {
                Direction::Asc => "nullsfirst",
                Direction::Desc => "nullslast",
            };
            format!("{}.{}.{nulls},id.asc", order.field, order.direction.as_str())
        }
        None => "id.asc".to_string(),
    };
    params.push(("order".to_string(), order));

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn table_path(collection: Collection) -> String {
    format!("/rest/v1/{}", collection.name())
}

fn into_documents(collection: Collection, rows: Vec<Value>) -> Vec<RawDocument> {
    rows.into_iter()
        .filter_map(|row| {
            let doc = RawDocument::from_flat(row);
            if doc.is_none() {
                tracing::warn!(%collection, "Row without a text id skipped");
            }
            doc
        })
        .collect()
}

pub async fn select(api: &HostedApi, query: &CollectionQuery) -> Result<Vec<RawDocument>, HostedError> {
    let response = api
        .request(Method::GET, &table_path(query.collection))
        .query(&query_params(query))
        .send()
        .await?;
    let rows: Vec<Value> = HostedApi::parse_response(response).await?;
    Ok(into_documents(query.collection, rows))
}

pub async fn get(
    api: &HostedApi,
    collection: Collection,
    id: &str,
) -> Result<Option<RawDocument>, HostedError> {
    let query = CollectionQuery::by_id(collection, id);
    Ok(select(api, &query).await?.into_iter().next())
}

/// Insert a row and return its id. The id is generated client-side.
pub async fn insert(
    api: &HostedApi,
    collection: Collection,
    mut fields: Fields,
) -> Result<DocId, HostedError> {
    let id = uuid::Uuid::now_v7().to_string();
    fields.insert(field::ID.to_string(), Value::String(id.clone()));

    let response = api
        .request(Method::POST, &table_path(collection))
        .header("Prefer", "return=representation")
        .json(&Value::Object(fields))
        .send()
        .await?;
    let rows: Vec<Value> = HostedApi::parse_response(response).await?;

    match into_documents(collection, rows).into_iter().next() {
        Some(doc) => Ok(doc.id),
        None => Err(HostedError::Unexpected(format!(
            "insert into {collection} returned no row"
        ))),
    }
}

/// Patch the given fields of one row. Fails when no row has that id.
pub async fn update(
    api: &HostedApi,
    collection: Collection,
    id: &str,
    mut fields: Fields,
) -> Result<(), HostedError> {
    fields.remove(field::ID);
    let response = api
        .request(Method::PATCH, &table_path(collection))
        .query(&[("id", format!("eq.{id}"))])
        .header("Prefer", "return=representation")
        .json(&Value::Object(fields))
        .send()
        .await?;
    let rows: Vec<Value> = HostedApi::parse_response(response).await?;

    if rows.is_empty() {
        return Err(HostedError::Unexpected(format!(
            "{} {id} does not exist",
            collection.entity()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn feed_query_translates_filter_order_and_no_limit() {
        let params = query_params(&CollectionQuery::public_feed());
        assert_eq!(param(&params, "select"), Some("*"));
        assert_eq!(param(&params, "is_public"), Some("eq.true"));
        assert_eq!(param(&params, "order"), Some("created_at.desc.nullslast,id.asc"));
        assert_eq!(param(&params, "limit"), None);
    }

    #[test]
    fn recent_notes_carry_a_limit() {
        let params = query_params(&CollectionQuery::recent_notes_of("u1"));
        assert_eq!(param(&params, "user_id"), Some("eq.u1"));
        assert_eq!(param(&params, "limit"), Some("5"));
    }

    #[test]
    fn filter_values_render_by_type() {
        assert_eq!(filter_param(&json!("abc")), "eq.abc");
        assert_eq!(filter_param(&json!(false)), "eq.false");
        assert_eq!(filter_param(&json!(3)), "eq.3");
        assert_eq!(filter_param(&Value::Null), "is.null");
    }

    #[test]
    fn unordered_query_sorts_by_id() {
        let params = query_params(&CollectionQuery::folders_of("u1"));
        assert_eq!(param(&params, "order"), Some("id.asc"));
    }
}
