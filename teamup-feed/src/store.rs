use crate::fetcher::Fetcher;
use crate::types::{Row, Session};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use interfaces::defs::{DataStore, Filter, Query};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

/// `DataStore` over the backend's REST table API.
#[derive(Clone)]
pub struct RestStore {
    fetcher: Fetcher,
    access_token: Option<String>,
}

impl RestStore {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            access_token: None,
        }
    }

    /// Requests made through the returned store act as the session's user.
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            access_token: Some(session.access_token.clone()),
        }
    }

    fn table_url(&self, table: &str) -> Result<url::Url> {
        Ok(self.fetcher.endpoint(&format!("rest/v1/{}", table))?)
    }

    fn request(&self, method: Method, table: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.table_url(table)?;
        Ok(self
            .fetcher
            .request(method, url, self.access_token.as_deref()))
    }
}

/// Render a filter value the way the REST API expects it in a query string.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq { column, value } if value.is_null() => (column.clone(), "is.null".to_string()),
        Filter::Eq { column, value } => (column.clone(), format!("eq.{}", render_value(value))),
        Filter::ILike { column, pattern } => (column.clone(), format!("ilike.{}", pattern)),
    }
}

fn select_clause(query: &Query) -> String {
    let mut select = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query.columns.join(",")
    };
    if let Some(embed) = &query.embed {
        let columns = if embed.columns.is_empty() {
            "*".to_string()
        } else {
            embed.columns.join(",")
        };
        select.push_str(&format!(",{}:{}({})", embed.alias, embed.table, columns));
    }
    select
}

/// Query-string pairs for a select, in a stable order.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), select_clause(query))];
    params.extend(query.filters.iter().map(filter_param));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(filter_param).collect()
}

fn first_row(mut rows: Vec<Row>, table: &str) -> Result<Row> {
    if rows.is_empty() {
        return Err(anyhow!("{} returned no representation", table));
    }
    Ok(rows.swap_remove(0))
}

#[async_trait]
impl DataStore for RestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let params = query_params(query);
        debug!("Selecting from {} with {:?}", query.table, params);
        let request = self.request(Method::GET, &query.table)?.query(&params);
        Ok(self.fetcher.send_json(request).await?)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let request = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(&Value::Object(row));
        let rows: Vec<Row> = self.fetcher.send_json(request).await?;
        first_row(rows, table)
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row> {
        let request = self
            .request(Method::POST, table)?
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&Value::Object(row));
        let rows: Vec<Row> = self.fetcher.send_json(request).await?;
        first_row(rows, table)
    }

    async fn update(&self, table: &str, filters: &[Filter], changes: Row) -> Result<usize> {
        let request = self
            .request(Method::PATCH, table)?
            .query(&filter_params(filters))
            .header("Prefer", "return=representation")
            .json(&Value::Object(changes));
        let rows: Vec<Row> = self.fetcher.send_json(request).await?;
        Ok(rows.len())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize> {
        let request = self
            .request(Method::DELETE, table)?
            .query(&filter_params(filters))
            .header("Prefer", "return=representation");
        let rows: Vec<Row> = self.fetcher.send_json(request).await?;
        Ok(rows.len())
    }
}
