use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::defs::{AuthService, BlobStore, Session, UserIdentity};

/// Password accounts and issued sessions, held in process.
pub struct BaselineAuth {
    accounts: RwLock<HashMap<String, (String, UserIdentity)>>,
    sessions: RwLock<HashMap<String, UserIdentity>>,
}

impl BaselineAuth {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> UserIdentity {
        let identity = UserIdentity {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        let mut accounts = self.accounts.write().await;
        accounts.insert(email.to_lowercase(), (password.to_string(), identity.clone()));
        identity
    }
}

impl Default for BaselineAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthService for BaselineAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let identity = {
            let accounts = self.accounts.read().await;
            match accounts.get(&email.to_lowercase()) {
                Some((stored, identity)) if stored == password => identity.clone(),
                _ => bail!("Invalid login credentials"),
            }
        };

        let access_token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(access_token.clone(), identity.clone());

        Ok(Session {
            access_token,
            refresh_token: None,
            user: identity,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        self.sessions.write().await.remove(&session.access_token);
        Ok(())
    }

    async fn current_user(&self, session: &Session) -> Result<Option<UserIdentity>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session.access_token).cloned())
    }
}

/// Object storage kept in memory; public URLs follow the remote layout.
pub struct BaselineBlobStore {
    base_url: String,
    objects: RwLock<HashMap<(String, String), (String, Vec<u8>)>>,
}

impl BaselineBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Content type and bytes of a stored object.
    pub async fn object(&self, bucket: &str, path: &str) -> Option<(String, Vec<u8>)> {
        let objects = self.objects.read().await;
        objects.get(&(bucket.to_string(), path.to_string())).cloned()
    }
}

#[async_trait]
impl BlobStore for BaselineBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<String> {
        let key = (bucket.to_string(), path.to_string());
        let mut objects = self.objects.write().await;
        if !upsert && objects.contains_key(&key) {
            bail!("The resource already exists");
        }
        objects.insert(key, (content_type.to_string(), bytes));
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path)
    }
}
