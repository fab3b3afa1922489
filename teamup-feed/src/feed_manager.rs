use crate::auth::require_user;
use crate::languages::{encode_languages, encode_languages_input};
use crate::types::{
    from_row, from_rows, FeedError, NewPost, Post, PostChanges, RecordId, Result, Row, Tag,
    UserIdentity, COMMENTS_TABLE, POSTS_TABLE, VOTES_TABLE,
};
use interfaces::defs::{DataStore, Embed, Filter, Query};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Reads and writes posts. Vote rows ride along with every post read so the
/// feed never issues one query per post.
#[derive(Clone)]
pub struct FeedManager {
    store: Arc<dyn DataStore>,
}

impl FeedManager {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    fn posts_query() -> Query {
        Query::new(POSTS_TABLE).embed(Embed {
            alias: "votes".to_string(),
            table: VOTES_TABLE.to_string(),
            foreign_key: "post_id".to_string(),
            columns: vec!["vote_type".to_string(), "owner_id".to_string()],
        })
    }

    /// One batched read of every post with its votes. A tag hint narrows the
    /// read on the server; the aggregator still applies the full filters.
    pub async fn fetch_snapshot(&self, tag_hint: Option<Tag>) -> Result<Vec<Post>> {
        let pattern = tag_hint.map(|tag| tag.as_str()).unwrap_or("%");
        let query = Self::posts_query().ilike("tag", pattern);
        let rows = self.store.select(&query).await?;
        let posts: Vec<Post> = from_rows(rows)?;
        debug!("Fetched snapshot of {} posts", posts.len());
        Ok(posts)
    }

    pub async fn get_post(&self, id: &RecordId) -> Result<Post> {
        let query = Self::posts_query().eq("id", id);
        match self.store.select_single(&query).await? {
            Some(row) => from_row(row),
            None => Err(FeedError::NotFound {
                what: "Post",
                id: id.to_string(),
            }),
        }
    }

    /// Newest first.
    pub async fn list_posts_by_owner(&self, owner: Uuid) -> Result<Vec<Post>> {
        let query = Self::posts_query()
            .eq("owner_id", owner.to_string())
            .order("created_at", false);
        from_rows(self.store.select(&query).await?)
    }

    pub async fn create_post(&self, viewer: Option<&UserIdentity>, post: NewPost) -> Result<Post> {
        let user = require_user(viewer)?;
        let tag = match post.tag {
            Some(tag) if !post.title.trim().is_empty() && !post.body.trim().is_empty() => tag,
            _ => return Err(FeedError::Validation("Please fill out all fields.".to_string())),
        };

        let mut row = Row::new();
        row.insert("title".into(), Value::from(post.title));
        row.insert("body".into(), Value::from(post.body));
        row.insert("tag".into(), Value::from(tag.as_str()));
        row.insert("languages".into(), Value::from(encode_languages(&post.languages)));
        row.insert("owner_id".into(), Value::from(user.id.to_string()));

        let created: Post = from_row(self.store.insert(POSTS_TABLE, row).await?)?;
        info!("User {} created post {}", user.id, created.id);
        Ok(created)
    }

    async fn owned_post(&self, user: &UserIdentity, id: &RecordId, action: &'static str) -> Result<Post> {
        let post = self.get_post(id).await?;
        if !post.is_owned_by(user) {
            warn!("User {} attempted to {} post {} they do not own", user.id, action, id);
            return Err(FeedError::Forbidden { action });
        }
        Ok(post)
    }

    pub async fn update_post(
        &self,
        viewer: Option<&UserIdentity>,
        id: &RecordId,
        changes: PostChanges,
    ) -> Result<Post> {
        let user = require_user(viewer)?;
        self.owned_post(user, id, "edit").await?;

        let mut row = Row::new();
        row.insert("title".into(), Value::from(changes.title));
        row.insert("body".into(), Value::from(changes.body));
        row.insert(
            "tag".into(),
            changes.tag.map(|tag| Value::from(tag.as_str())).unwrap_or(Value::Null),
        );
        row.insert(
            "languages".into(),
            encode_languages_input(&changes.languages)
                .map(Value::from)
                .unwrap_or(Value::Null),
        );

        self.store
            .update(POSTS_TABLE, &[Filter::eq("id", id)], row)
            .await?;
        info!("User {} updated post {}", user.id, id);
        self.get_post(id).await
    }

    /// Removes the post's votes, then its comments, then the post itself.
    pub async fn delete_post(&self, viewer: Option<&UserIdentity>, id: &RecordId) -> Result<()> {
        let user = require_user(viewer)?;
        self.owned_post(user, id, "delete").await?;

        let by_post = [Filter::eq("post_id", id)];
        let votes = self.store.delete(VOTES_TABLE, &by_post).await?;
        let comments = self.store.delete(COMMENTS_TABLE, &by_post).await?;
        self.store
            .delete(POSTS_TABLE, &[Filter::eq("id", id)])
            .await?;

        info!(
            "User {} deleted post {} ({} votes, {} comments)",
            user.id, id, votes, comments
        );
        Ok(())
    }
}
