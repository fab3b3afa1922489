use crate::aggregator::build_view;
use crate::feed_manager::FeedManager;
use crate::types::{FeedView, FilterState, Post, RecordId, Result, UserIdentity};
use tracing::{error, info};

/// One viewer's feed page: their filters, the last snapshot that loaded, and
/// the message for the last refresh that did not.
pub struct FeedState {
    feed_manager: FeedManager,
    filters: FilterState,
    posts: Vec<Post>,
    last_error: Option<String>,
}

impl FeedState {
    pub fn new(feed_manager: FeedManager) -> Self {
        Self {
            feed_manager,
            filters: FilterState::default(),
            posts: Vec::new(),
            last_error: None,
        }
    }

    /// Start from an already loaded snapshot.
    pub fn with_snapshot(feed_manager: FeedManager, posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Self::new(feed_manager)
        }
    }

    /// Reload the snapshot, narrowed by the selected tag. On failure the
    /// previous snapshot stays in place and the error is kept for display.
    pub async fn refresh(&mut self) -> Result<usize> {
        match self.feed_manager.fetch_snapshot(self.filters.tag).await {
            Ok(posts) => {
                info!("Feed refreshed with {} posts", posts.len());
                self.posts = posts;
                self.last_error = None;
                Ok(self.posts.len())
            }
            Err(e) => {
                let message = format!("Error fetching posts: {}", e);
                error!("{}", message);
                self.last_error = Some(message);
                Err(e)
            }
        }
    }

    pub fn view(&self) -> FeedView<'_> {
        build_view(&self.posts, &self.filters)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop a post locally, e.g. after it was deleted. Returns whether it was present.
    pub fn remove_post(&mut self, id: &RecordId) -> bool {
        let before = self.posts.len();
        self.posts.retain(|post| &post.id != id);
        before != self.posts.len()
    }

    /// Replace the filters. Returns whether the selected tag changed, in which
    /// case the snapshot should be refreshed.
    pub fn set_filters(&mut self, filters: FilterState) -> bool {
        let tag_changed = filters.tag != self.filters.tag;
        self.filters = filters;
        tag_changed
    }

    /// Back to "all tags", no search or languages, newest first. Returns
    /// whether a tag had been selected, in which case the snapshot is narrowed
    /// and should be refreshed.
    pub fn reset_filters(&mut self) -> bool {
        self.set_filters(FilterState::default())
    }

    /// Delete a post the viewer owns and drop it from the snapshot.
    pub async fn delete_post(
        &mut self,
        viewer: Option<&UserIdentity>,
        id: &RecordId,
    ) -> Result<()> {
        self.feed_manager.delete_post(viewer, id).await?;
        self.remove_post(id);
        Ok(())
    }
}
