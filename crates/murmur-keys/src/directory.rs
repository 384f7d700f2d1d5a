//! Public key directory: where recipient keys come from on a cache miss.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::{KeyError, KeyResult};

#[async_trait]
pub trait PublicKeyDirectory: Send + Sync {
    /// Fetch the base64 X25519 public key published for `user_id`.
    async fn fetch_public_key(&self, user_id: &str) -> KeyResult<String>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

/// Directory backed by the messaging server's HTTP API:
/// `GET {base_url}/users/{id}/public-key` returning `{"publicKey": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpKeyDirectory {
    client: Client,
    base_url: Url,
}

impl HttpKeyDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> KeyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyError::Directory(format!("building HTTP client: {e}")))?;
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| KeyError::Directory(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(KeyError::Directory(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &murmur_core::config::DirectoryConfig) -> KeyResult<Option<Self>> {
        match &config.base_url {
            Some(base_url) => Ok(Some(Self::new(
                base_url.as_str(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            None => Ok(None),
        }
    }

    /// The user id is always a single percent-encoded path segment.
    fn url_for(&self, user_id: &str) -> KeyResult<Url> {
        if matches!(user_id, "" | "." | "..") {
            return Err(KeyError::Directory(format!("invalid user id {user_id:?}")));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                KeyError::Directory(format!("base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["users", user_id, "public-key"]);
        Ok(url)
    }
}

#[async_trait]
impl PublicKeyDirectory for HttpKeyDirectory {
    async fn fetch_public_key(&self, user_id: &str) -> KeyResult<String> {
        let url = self.url_for(user_id)?;
        tracing::debug!(user_id, %url, "fetching public key from directory");

        let resp = self.client.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(KeyError::MissingRecipientKey(user_id.to_string()));
        }
        let body: PublicKeyResponse = resp.error_for_status()?.json().await?;
        Ok(body.public_key)
    }
}
