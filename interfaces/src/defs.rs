use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A record as returned by the data store: a JSON object keyed by column.
pub type Row = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq { column: String, value: Value },
    /// Case-insensitive pattern match, `%` and `_` wildcards.
    ILike { column: String, pattern: String },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn ilike(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::ILike {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::ILike { column, .. } => column,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// One-level nesting of child rows, e.g. the votes of each post.
#[derive(Clone, Debug, PartialEq)]
pub struct Embed {
    pub alias: String,
    pub table: String,
    /// Column on the child table that references the parent's `id`.
    pub foreign_key: String,
    /// Projected child columns; empty means all.
    pub columns: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub table: String,
    /// Projected columns; empty means all.
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub embed: Option<Embed>,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
            embed: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ilike(column, pattern));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }
}

/// Remote table storage. Every call is one request/response round trip.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Row>>;

    /// Zero rows is `None`, not an error.
    async fn select_single(&self, query: &Query) -> Result<Option<Row>> {
        let query = query.clone().limit(1);
        Ok(self.select(&query).await?.into_iter().next())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Insert, or merge into the existing row whose `on_conflict` column matches.
    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row>;

    /// Returns the number of rows changed.
    async fn update(&self, table: &str, filters: &[Filter], changes: Row) -> Result<usize>;

    /// Returns the number of rows removed.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserIdentity,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
    /// `None` once the session is no longer valid.
    async fn current_user(&self, session: &Session) -> Result<Option<UserIdentity>>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the stored object path.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<String>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

// Object style note:
// Implementations of these traits hold no per-user state. The caller resolves
// a `Session` once and passes it into every operation that needs identity.
