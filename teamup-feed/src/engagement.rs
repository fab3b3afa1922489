use crate::aggregator::tally_votes;
use crate::auth::require_user;
use crate::types::{
    from_row, from_rows, Comment, FeedError, RecordId, Result, Row, UserIdentity, Vote, VoteKind,
    VoteTally, COMMENTS_TABLE, VOTES_TABLE,
};
use interfaces::defs::{DataStore, Filter, Query};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Counts for one post plus the viewer's own vote, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteSummary {
    pub tally: VoteTally,
    pub viewer_vote: Option<VoteKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Added(VoteKind),
    Changed { from: VoteKind, to: VoteKind },
    Removed(VoteKind),
}

/// Votes and comments attached to posts.
#[derive(Clone)]
pub struct Engagement {
    store: Arc<dyn DataStore>,
}

impl Engagement {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn load_votes(
        &self,
        post_id: &RecordId,
        viewer: Option<&UserIdentity>,
    ) -> Result<VoteSummary> {
        let query = Query::new(VOTES_TABLE)
            .columns(&["vote_type", "owner_id"])
            .eq("post_id", post_id);
        let votes: Vec<Vote> = from_rows(self.store.select(&query).await?)?;

        let viewer_vote = viewer.and_then(|user| {
            votes
                .iter()
                .find(|vote| vote.owner_id == Some(user.id))
                .map(|vote| vote.vote_type)
        });

        Ok(VoteSummary {
            tally: tally_votes(&votes),
            viewer_vote,
        })
    }

    /// Toggle the viewer's vote: a repeat of the same kind withdraws it, the
    /// other kind replaces it.
    pub async fn cast_vote(
        &self,
        viewer: Option<&UserIdentity>,
        post_id: &RecordId,
        kind: VoteKind,
    ) -> Result<VoteOutcome> {
        let user = require_user(viewer)?;
        if kind == VoteKind::Other {
            return Err(FeedError::Validation("Vote must be upvote or downvote".to_string()));
        }

        let existing = self
            .store
            .select_single(
                &Query::new(VOTES_TABLE)
                    .eq("post_id", post_id)
                    .eq("owner_id", user.id.to_string()),
            )
            .await?
            .map(from_row::<Vote>)
            .transpose()?;

        let outcome = match existing {
            None => {
                let mut row = Row::new();
                row.insert("post_id".into(), Value::from(post_id));
                row.insert("owner_id".into(), Value::from(user.id.to_string()));
                row.insert("vote_type".into(), Value::from(kind.as_str()));
                self.store.insert(VOTES_TABLE, row).await?;
                VoteOutcome::Added(kind)
            }
            Some(vote) => {
                let by_id = match &vote.id {
                    Some(id) => vec![Filter::eq("id", id)],
                    None => vec![
                        Filter::eq("post_id", post_id),
                        Filter::eq("owner_id", user.id.to_string()),
                    ],
                };
                if vote.vote_type == kind {
                    self.store.delete(VOTES_TABLE, &by_id).await?;
                    VoteOutcome::Removed(kind)
                } else {
                    let mut changes = Row::new();
                    changes.insert("vote_type".into(), Value::from(kind.as_str()));
                    self.store.update(VOTES_TABLE, &by_id, changes).await?;
                    VoteOutcome::Changed {
                        from: vote.vote_type,
                        to: kind,
                    }
                }
            }
        };

        info!("User {} vote on post {}: {:?}", user.id, post_id, outcome);
        Ok(outcome)
    }

    /// Oldest first.
    pub async fn list_comments(&self, post_id: &RecordId) -> Result<Vec<Comment>> {
        let query = Query::new(COMMENTS_TABLE)
            .eq("post_id", post_id)
            .order("created_at", true);
        from_rows(self.store.select(&query).await?)
    }

    pub async fn add_comment(
        &self,
        viewer: Option<&UserIdentity>,
        post_id: &RecordId,
        body: &str,
    ) -> Result<Comment> {
        let user = require_user(viewer)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(FeedError::Validation("Comment cannot be empty.".to_string()));
        }

        let mut row = Row::new();
        row.insert("post_id".into(), Value::from(post_id));
        row.insert("owner_id".into(), Value::from(user.id.to_string()));
        row.insert("body".into(), Value::from(body));

        let comment: Comment = from_row(self.store.insert(COMMENTS_TABLE, row).await?)?;
        info!("User {} commented on post {}", user.id, post_id);
        Ok(comment)
    }

    pub async fn remove_comment(
        &self,
        viewer: Option<&UserIdentity>,
        comment_id: &RecordId,
    ) -> Result<()> {
        let user = require_user(viewer)?;
        let by_id = [Filter::eq("id", comment_id)];

        let comment: Comment = match self
            .store
            .select_single(&Query::new(COMMENTS_TABLE).eq("id", comment_id))
            .await?
        {
            Some(row) => from_row(row)?,
            None => {
                return Err(FeedError::NotFound {
                    what: "Comment",
                    id: comment_id.to_string(),
                })
            }
        };

        if comment.owner_id != Some(user.id) {
            warn!("User {} attempted to remove comment {} they do not own", user.id, comment_id);
            return Err(FeedError::Forbidden { action: "remove" });
        }

        self.store.delete(COMMENTS_TABLE, &by_id).await?;
        info!("User {} removed comment {}", user.id, comment_id);
        Ok(())
    }
}
