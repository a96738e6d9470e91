//! HTTP object-store backend.
//!
//! Speaks plain PUT/GET/HEAD against a base URL with bearer-token auth,
//! matching the local backend's semantics: 404 on download is `None`,
//! never an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use placebook_shared::{PlacebookError, Result};

use crate::CatalogStore;

/// Default request timeout for store operations.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Object store speaking HTTP against `{base_url}/{key}`.
pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PlacebookError::Network(format!("client build: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            token,
        })
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

#[async_trait]
impl CatalogStore for HttpObjectStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<()> {
        let url = self.url_for(key);
        let response = self
            .authorize(self.http.put(&url))
            .header("Content-Type", "application/json")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| PlacebookError::Persistence(format!("PUT {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(PlacebookError::Persistence(format!(
                "PUT {url}: HTTP {}",
                response.status()
            )));
        }

        debug!(key, bytes = data.len(), "http store upload");
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url_for(key);
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| PlacebookError::Persistence(format!("GET {url}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PlacebookError::Persistence(format!(
                "GET {url}: HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlacebookError::Persistence(format!("GET {url} body: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.url_for(key);
        let response = self
            .authorize(self.http.head(&url))
            .send()
            .await
            .map_err(|e| PlacebookError::Persistence(format!("HEAD {url}: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(PlacebookError::Persistence(format!(
                "HEAD {url}: HTTP {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let store = HttpObjectStore::new("https://store.example.com/v1/", None).unwrap();
        assert_eq!(
            store.url_for("catalog.json"),
            "https://store.example.com/v1/catalog.json"
        );
    }
}
