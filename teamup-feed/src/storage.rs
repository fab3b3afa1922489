use crate::fetcher::Fetcher;
use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::BlobStore;
use reqwest::Method;
use tracing::info;

/// Object storage buckets of the backend project.
#[derive(Clone)]
pub struct RestBlobStore {
    fetcher: Fetcher,
    access_token: Option<String>,
}

impl RestBlobStore {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            access_token: None,
        }
    }

    pub fn with_session(&self, session: &interfaces::defs::Session) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            access_token: Some(session.access_token.clone()),
        }
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<String> {
        let url = self
            .fetcher
            .endpoint(&format!("storage/v1/object/{}/{}", bucket, path))?;
        let size = bytes.len();
        let request = self
            .fetcher
            .request(Method::POST, url, self.access_token.as_deref())
            .header("content-type", content_type)
            .header("x-upsert", upsert.to_string())
            .body(bytes);
        self.fetcher.send_empty(request).await?;

        info!("Uploaded {} bytes to {}/{}", size, bucket, path);
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        let base = self.fetcher.base_url().as_str().trim_end_matches('/');
        format!("{}/storage/v1/object/public/{}/{}", base, bucket, path)
    }
}
