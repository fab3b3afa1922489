use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

use crate::defs::{DataStore, Embed, Filter, Query, Row};

/// In-process table storage with the same filter, order and embed semantics
/// as the remote data API. Rows without an `id` get an increasing integer id,
/// rows without a `created_at` get the current time.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Load rows verbatim apart from the id/created_at defaults.
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        for row in rows {
            entries.push(self.with_defaults(row));
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<Row> {
        let tables = self.tables.read().await;
        tables.get(table).cloned().unwrap_or_default()
    }

    fn with_defaults(&self, mut row: Row) -> Row {
        if !row.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            row.insert("id".to_string(), Value::from(id));
        }
        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), Value::from(Utc::now().to_rfc3339()));
        }
        row
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        let children = match &query.embed {
            Some(embed) => tables.get(&embed.table).cloned().unwrap_or_default(),
            None => Vec::new(),
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut projected = project(&row, &query.columns);
                if let Some(embed) = &query.embed {
                    let nested = embedded_children(&row, embed, &children);
                    projected.insert(embed.alias.clone(), Value::Array(nested));
                }
                projected
            })
            .collect())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let row = self.with_defaults(row);
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row> {
        let key = row
            .get(on_conflict)
            .cloned()
            .ok_or_else(|| anyhow!("upsert row is missing conflict column {on_conflict}"))?;

        {
            let mut tables = self.tables.write().await;
            let entries = tables.entry(table.to_string()).or_default();
            if let Some(existing) = entries
                .iter_mut()
                .find(|existing| values_equal(existing.get(on_conflict).unwrap_or(&Value::Null), &key))
            {
                for (column, value) in row {
                    existing.insert(column, value);
                }
                return Ok(existing.clone());
            }
        }

        self.insert(table, row).await
    }

    async fn update(&self, table: &str, filters: &[Filter], changes: Row) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(entries) = tables.get_mut(table) else {
            return Ok(0);
        };

        let mut changed = 0;
        for row in entries.iter_mut().filter(|row| matches_all(row, filters)) {
            for (column, value) in &changes {
                row.insert(column.clone(), value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(entries) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = entries.len();
        entries.retain(|row| !matches_all(row, filters));
        Ok(before - entries.len())
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let value = row.get(filter.column()).unwrap_or(&Value::Null);
        match filter {
            Filter::Eq { value: expected, .. } => values_equal(value, expected),
            Filter::ILike { pattern, .. } => match scalar_text(value) {
                Some(text) => like_match(&pattern.to_lowercase(), &text.to_lowercase()),
                None => false,
            },
        }
    })
}

fn project(row: &Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row.clone();
    }
    columns
        .iter()
        .filter_map(|column| row.get(column).map(|value| (column.clone(), value.clone())))
        .collect()
}

fn embedded_children(parent: &Row, embed: &Embed, children: &[Row]) -> Vec<Value> {
    let parent_id = parent.get("id").unwrap_or(&Value::Null);
    children
        .iter()
        .filter(|child| values_equal(child.get(&embed.foreign_key).unwrap_or(&Value::Null), parent_id))
        .map(|child| Value::Object(project(child, &embed.columns)))
        .collect()
}

/// The remote API compares filter values as text, so `1` and `"1"` are equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (scalar_text(a), scalar_text(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Nulls sort after every other value, matching the database default.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&b.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        _ => scalar_text(a).cmp(&scalar_text(b)),
    }
}

/// SQL `LIKE` over chars: `%` matches any run, `_` matches one char.
fn like_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
