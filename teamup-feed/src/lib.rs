pub mod aggregator;
pub mod auth;
pub mod config;
pub mod engagement;
pub mod feed_manager;
pub mod fetcher;
pub mod languages;
pub mod processing;
pub mod state;
pub mod storage;
pub mod store;
pub mod types;
pub mod user_manager;
pub mod utils;

pub use aggregator::{build_view, compute_available_languages, filter_and_sort, tally_votes};
pub use auth::{require_user, RestAuth};
pub use config::AppConfig;
pub use engagement::{Engagement, VoteOutcome, VoteSummary};
pub use feed_manager::FeedManager;
pub use fetcher::Fetcher;
pub use processing::{FeedPipeline, FeedStage};
pub use state::FeedState;
pub use storage::RestBlobStore;
pub use store::RestStore;
pub use types::*;
pub use user_manager::{profile_post_preview, ProfileForm, ProfileManager, ProfileStatus};

use interfaces::defs::{AuthService, BlobStore, DataStore};
use std::sync::Arc;

/// The services of one app instance, sharing one set of collaborators.
#[derive(Clone)]
pub struct TeamUp {
    pub feeds: FeedManager,
    pub engagement: Engagement,
    pub profiles: ProfileManager,
    pub auth: Arc<dyn AuthService>,
}

impl TeamUp {
    pub fn new(
        store: Arc<dyn DataStore>,
        blobs: Arc<dyn BlobStore>,
        auth: Arc<dyn AuthService>,
    ) -> Self {
        Self {
            feeds: FeedManager::new(store.clone()),
            engagement: Engagement::new(store.clone()),
            profiles: ProfileManager::new(store, blobs),
            auth,
        }
    }

    /// Services talking to the configured backend as the anonymous role.
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let fetcher = Fetcher::new(config)?;
        Ok(Self::new(
            Arc::new(RestStore::new(fetcher.clone())),
            Arc::new(RestBlobStore::new(fetcher.clone())),
            Arc::new(RestAuth::new(fetcher)),
        ))
    }

    /// Services acting as the session's user.
    pub fn connect_as(config: &AppConfig, session: &Session) -> Result<Self> {
        let fetcher = Fetcher::new(config)?;
        Ok(Self::new(
            Arc::new(RestStore::new(fetcher.clone()).with_session(session)),
            Arc::new(RestBlobStore::new(fetcher.clone()).with_session(session)),
            Arc::new(RestAuth::new(fetcher)),
        ))
    }
}
