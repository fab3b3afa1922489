use crate::config::AppConfig;
use crate::types::{FeedError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP client bound to one backend project. Every request carries the
/// project key; requests made for a signed-in user carry their token instead
/// of the key as the bearer.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl Fetcher {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.fetch.user_agent)
            .timeout(Duration::from_secs(config.fetch.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path such as `rest/v1/Posts` against the project URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    pub fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        debug!("{} {}", method, url.path());
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer.unwrap_or(&self.api_key))
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        warn!("Backend request failed with {}: {}", status, message);
        Err(FeedError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// The backend reports errors as JSON with one of a few message fields.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_project_path_prefix() {
        let config = AppConfig::new("https://example.test/project", "key").unwrap();
        let fetcher = Fetcher::new(&config).unwrap();
        let url = fetcher.endpoint("/rest/v1/Posts").unwrap();
        assert_eq!(url.as_str(), "https://example.test/project/rest/v1/Posts");
    }

    #[test]
    fn error_message_reads_known_fields() {
        assert_eq!(
            error_message(r#"{"msg":"Invalid login credentials"}"#).as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(error_message("not json"), None);
    }
}
