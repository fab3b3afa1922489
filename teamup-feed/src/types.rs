use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::languages::{contains_language, same_language};

// Use the interfaces crate for collaborator types
pub use interfaces::defs::{Row, Session, UserIdentity};

pub const POSTS_TABLE: &str = "Posts";
pub const VOTES_TABLE: &str = "UserVotes";
pub const COMMENTS_TABLE: &str = "Comments";
pub const PROFILE_TABLE: &str = "UserProfile";
pub const AVATAR_BUCKET: &str = "avatars";

/// Opaque record identifier. The store hands out integers for some tables and
/// text for others; both round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(id) => RecordId::Int(id),
            Err(_) => RecordId::Text(s.to_string()),
        })
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        match id {
            RecordId::Int(id) => Value::from(*id),
            RecordId::Text(id) => Value::from(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Project,
    Hackathon,
}

impl Tag {
    pub const ALL: [Tag; 2] = [Tag::Project, Tag::Hackathon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Project => "Project",
            Tag::Hackathon => "Hackathon",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = FeedError;

    /// Tags are a controlled vocabulary: matching is exact and case-sensitive.
    fn from_str(s: &str) -> Result<Self> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| FeedError::Validation(format!("Unknown tag: {}", s)))
    }
}

/// Stored tags outside the vocabulary (or empty) read as "no tag".
fn lenient_tag<'de, D>(deserializer: D) -> std::result::Result<Option<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// The languages column is text, but rows written as JSON arrays come back as
/// arrays; both are kept in their persisted text form.
fn lenient_languages<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
    /// Anything else the store holds: null, numbers, unknown strings.
    #[default]
    Other,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Upvote => "upvote",
            VoteKind::Downvote => "downvote",
            VoteKind::Other => "other",
        }
    }
}

impl<'de> Deserialize<'de> for VoteKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if s == "upvote" => VoteKind::Upvote,
            Value::String(s) if s == "downvote" => VoteKind::Downvote,
            _ => VoteKind::Other,
        })
    }
}

impl FromStr for VoteKind {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upvote" | "up" => Ok(VoteKind::Upvote),
            "downvote" | "down" => Ok(VoteKind::Downvote),
            other => Err(FeedError::Validation(format!("Unknown vote type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub post_id: Option<RecordId>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub vote_type: VoteKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient_tag")]
    pub tag: Option<Tag>,
    /// Persisted encoding, e.g. `["Python","Go"]`. See `languages::decode_languages`.
    #[serde(default, deserialize_with = "lenient_languages")]
    pub languages: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl Post {
    pub fn decoded_languages(&self) -> Vec<String> {
        crate::languages::decode_languages(self.languages.as_deref())
    }

    pub fn tally(&self) -> VoteTally {
        crate::aggregator::tally_votes(&self.votes)
    }

    pub fn is_owned_by(&self, user: &UserIdentity) -> bool {
        self.owner_id == Some(user.id)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: usize,
    pub downvotes: usize,
}

/// Input for a new post. Languages are the selected names, in order.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub tag: Option<Tag>,
    pub languages: Vec<String>,
}

/// Edit form for an existing post. Languages arrive as comma-separated text.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: String,
    pub body: String,
    pub tag: Option<Tag>,
    pub languages: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: RecordId,
    pub post_id: RecordId,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

fn lenient_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub grad_year: Option<i32>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub discipline: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub profile_complete: Option<bool>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            "User".to_string()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Upvotes,
    /// Any unrecognised key: input order is kept.
    #[serde(other)]
    Unsorted,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Upvotes => "upvotes",
            SortKey::Unsorted => "unsorted",
        }
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "created_at" => SortKey::CreatedAt,
            "upvotes" => SortKey::Upvotes,
            _ => SortKey::Unsorted,
        })
    }
}

fn tag_filter_in<'de, D>(deserializer: D) -> std::result::Result<Option<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(tag) => tag.parse().map(Some).map_err(de::Error::custom),
    }
}

fn tag_filter_out<S>(tag: &Option<Tag>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(tag.map(|t| t.as_str()).unwrap_or(""))
}

/// Selected languages read back through `add_language`, so blanks and
/// case-insensitive repeats are dropped.
fn language_selection_in<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut filters = FilterState::default();
    for language in Vec::<String>::deserialize(deserializer)? {
        filters.add_language(&language);
    }
    Ok(filters.languages)
}

/// What the viewer has selected on the feed page. Serialized as
/// `{search, tag, languages, sortBy}` with `""` meaning "all tags".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub search: String,
    #[serde(default, deserialize_with = "tag_filter_in", serialize_with = "tag_filter_out")]
    pub tag: Option<Tag>,
    #[serde(default, deserialize_with = "language_selection_in")]
    pub languages: Vec<String>,
    #[serde(default, rename = "sortBy")]
    pub sort_by: SortKey,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_tag(mut self, tag: Option<Tag>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.add_language(language);
        self
    }

    pub fn with_sort(mut self, sort_by: SortKey) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Appends a language unless it is blank or already selected (ignoring case).
    /// Returns whether the selection changed.
    pub fn add_language(&mut self, language: &str) -> bool {
        let language = language.trim();
        if language.is_empty() || contains_language(&self.languages, language) {
            return false;
        }
        self.languages.push(language.to_string());
        true
    }

    pub fn remove_language(&mut self, language: &str) -> bool {
        let before = self.languages.len();
        let language = language.trim();
        self.languages
            .retain(|selected| !same_language(selected, language));
        before != self.languages.len()
    }

    /// Accepts the feed page's raw tag value: `""` selects all tags.
    pub fn set_tag_str(&mut self, tag: &str) -> Result<()> {
        self.tag = if tag.is_empty() { None } else { Some(tag.parse()?) };
        Ok(())
    }
}

/// The derived feed: what to render plus the language dropdown entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedView<'a> {
    pub posts: Vec<&'a Post>,
    pub available_languages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "TeamUp-Feed/1.0".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Decode a store row into a typed record.
pub(crate) fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

pub(crate) fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Only the owner may {action}")]
    Forbidden { action: &'static str },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// Short message suitable for showing to the viewer.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::Unauthenticated => "You must be logged in to do that.".to_string(),
            FeedError::Forbidden { action } => format!("You can only {} your own content.", action),
            FeedError::NotFound { what, .. } => format!("{} not found.", what),
            FeedError::Validation(message) => message.clone(),
            other => format!("Something went wrong: {}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
