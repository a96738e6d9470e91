//! Document source: the narrow read-only contract the pipeline consumes.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use placebook_shared::{PlacebookError, Result};

/// A fetched source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Opaque revision marker (upstream revision id or content hash).
    pub revision_id: String,
}

/// Read-only document fetch.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<SourceDocument>;
}

// ---------------------------------------------------------------------------
// File source
// ---------------------------------------------------------------------------

/// Reads documents from local paths. The document id is the path; the
/// revision id is a content hash.
pub struct FileSource;

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch(&self, id: &str) -> Result<SourceDocument> {
        let content = tokio::fs::read_to_string(id)
            .await
            .map_err(|e| PlacebookError::Source(format!("read {id}: {e}")))?;

        let title = std::path::Path::new(id)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| id.to_string());

        let revision_id = {
            let mut hasher = Sha256::new();
            hasher.update(content.as_bytes());
            format!("{:x}", hasher.finalize())
        };

        debug!(id, bytes = content.len(), "document read from file");
        Ok(SourceDocument {
            id: id.to_string(),
            title,
            content,
            revision_id,
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Fetches documents from an HTTP endpoint returning
/// `{title, content, revisionId}` JSON.
pub struct HttpSource {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPayload {
    title: Option<String>,
    content: String,
    revision_id: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlacebookError::Network(format!("client build: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, id: &str) -> Result<SourceDocument> {
        let url = format!("{}/{id}", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PlacebookError::Source(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(PlacebookError::Source(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }

        let payload: DocumentPayload = response
            .json()
            .await
            .map_err(|e| PlacebookError::Source(format!("{url}: invalid payload: {e}")))?;

        Ok(SourceDocument {
            id: id.to_string(),
            title: payload.title.unwrap_or_else(|| id.to_string()),
            revision_id: payload.revision_id.unwrap_or_default(),
            content: payload.content,
        })
    }
}
