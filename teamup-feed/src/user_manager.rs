use crate::auth::require_user;
use crate::types::{
    from_row, FeedError, Post, Result, Row, UserIdentity, UserProfile, AVATAR_BUCKET,
    PROFILE_TABLE,
};
use interfaces::defs::{BlobStore, DataStore, Query};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// Number of posts a profile page shows before "show more".
pub const PROFILE_PREVIEW_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    /// The user must fill in their profile before using the app.
    NeedsCompletion,
    Complete,
}

/// The profile management form. Empty strings are stored as given.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub major: String,
    pub grad_year: Option<i32>,
    pub university: String,
    pub time_zone: String,
    pub discipline: String,
    pub avatar_url: Option<String>,
    pub github_url: String,
    pub linkedin_url: String,
}

/// Manages user profiles and their avatars.
#[derive(Clone)]
pub struct ProfileManager {
    store: Arc<dyn DataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ProfileManager {
    pub fn new(store: Arc<dyn DataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let query = Query::new(PROFILE_TABLE).eq("user_id", user_id.to_string());
        self.store
            .select_single(&query)
            .await?
            .map(from_row)
            .transpose()
    }

    /// Checks the signed-in user's profile, creating an incomplete one when
    /// none exists. Only an explicit `profile_complete = false` needs
    /// completion; a missing flag counts as complete.
    pub async fn ensure_profile(&self, viewer: Option<&UserIdentity>) -> Result<ProfileStatus> {
        let user = require_user(viewer)?;

        match self.get_profile(user.id).await? {
            Some(profile) if profile.profile_complete == Some(false) => {
                Ok(ProfileStatus::NeedsCompletion)
            }
            Some(_) => Ok(ProfileStatus::Complete),
            None => {
                warn!("No profile for user {}, creating a default one", user.id);
                let mut row = Row::new();
                row.insert("user_id".into(), Value::from(user.id.to_string()));
                row.insert("profile_complete".into(), Value::Bool(false));
                self.store.insert(PROFILE_TABLE, row).await?;
                Ok(ProfileStatus::NeedsCompletion)
            }
        }
    }

    /// Insert or replace the signed-in user's profile and mark it complete.
    pub async fn save_profile(
        &self,
        viewer: Option<&UserIdentity>,
        form: ProfileForm,
    ) -> Result<UserProfile> {
        let user = require_user(viewer)?;
        validate_link("GitHub", &form.github_url)?;
        validate_link("LinkedIn", &form.linkedin_url)?;

        let mut row = Row::new();
        row.insert("user_id".into(), Value::from(user.id.to_string()));
        row.insert("first_name".into(), Value::from(form.first_name));
        row.insert("last_name".into(), Value::from(form.last_name));
        row.insert("major".into(), Value::from(form.major));
        row.insert("grad_year".into(), form.grad_year.map(Value::from).unwrap_or(Value::Null));
        row.insert("university".into(), Value::from(form.university));
        row.insert("time_zone".into(), Value::from(form.time_zone));
        row.insert("discipline".into(), Value::from(form.discipline));
        row.insert("avatar_url".into(), form.avatar_url.map(Value::from).unwrap_or(Value::Null));
        row.insert("github_url".into(), Value::from(form.github_url));
        row.insert("linkedin_url".into(), Value::from(form.linkedin_url));
        row.insert("profile_complete".into(), Value::Bool(true));

        let saved = self.store.upsert(PROFILE_TABLE, row, "user_id").await?;
        info!("Saved profile for user {}", user.id);
        from_row(saved)
    }

    /// Store an avatar under the user's folder, replacing any file of the same
    /// name, and return its public URL.
    pub async fn upload_avatar(
        &self,
        viewer: Option<&UserIdentity>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let user = require_user(viewer)?;
        let file_name = file_name.trim();
        if file_name.is_empty() || file_name.contains('/') {
            return Err(FeedError::Validation(format!("Invalid avatar file name: {:?}", file_name)));
        }

        let path = format!("avatars/{}/{}", user.id, file_name);
        let stored = self
            .blobs
            .upload(AVATAR_BUCKET, &path, bytes, content_type_for(file_name), true)
            .await?;
        Ok(self.blobs.public_url(AVATAR_BUCKET, &stored))
    }
}

/// Posts shown on a profile page: the first few unless expanded.
pub fn profile_post_preview(posts: &[Post], show_all: bool) -> &[Post] {
    if show_all {
        posts
    } else {
        &posts[..posts.len().min(PROFILE_PREVIEW_LEN)]
    }
}

fn validate_link(label: &str, link: &str) -> Result<()> {
    if link.trim().is_empty() {
        return Ok(());
    }
    match Url::parse(link.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(FeedError::Validation(format!("{} URL is not a valid web address", label))),
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
