use crate::fetcher::Fetcher;
use crate::types::{FeedError, Session, UserIdentity};
use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::AuthService;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// The signed-in user, or `Unauthenticated` when there is none.
pub fn require_user(viewer: Option<&UserIdentity>) -> crate::types::Result<&UserIdentity> {
    viewer.ok_or(FeedError::Unauthenticated)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: UserIdentity,
}

/// Password sign-in against the backend's auth API.
#[derive(Clone)]
pub struct RestAuth {
    fetcher: Fetcher,
}

impl RestAuth {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl AuthService for RestAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let mut url = self.fetcher.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self
            .fetcher
            .request(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = self.fetcher.send_json(request).await?;

        info!("Signed in user {}", token.user.id);
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.fetcher.endpoint("auth/v1/logout")?;
        let request = self
            .fetcher
            .request(Method::POST, url, Some(&session.access_token));
        self.fetcher.send_empty(request).await?;
        info!("Signed out user {}", session.user.id);
        Ok(())
    }

    async fn current_user(&self, session: &Session) -> Result<Option<UserIdentity>> {
        let url = self.fetcher.endpoint("auth/v1/user")?;
        let request = self
            .fetcher
            .request(Method::GET, url, Some(&session.access_token));
        match self.fetcher.send_json::<UserIdentity>(request).await {
            Ok(user) => Ok(Some(user)),
            Err(FeedError::Api { status: 401 | 403, .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
