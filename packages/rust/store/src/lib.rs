//! Catalog storage backends.
//!
//! Two interchangeable backends satisfy the same narrow contract: a local
//! filesystem store and an HTTP object store. Downloading a missing key
//! returns `None`, never an error. The backup-before-overwrite and
//! snapshot disciplines live in the orchestrator; this crate provides the
//! key derivation.

mod http;
mod local;

use async_trait::async_trait;

use placebook_shared::Result;

pub use http::HttpObjectStore;
pub use local::LocalStore;

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Object storage for catalogs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Write `data` under `key`, overwriting any existing object.
    async fn upload(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read the object at `key`. A missing key is `Ok(None)`.
    async fn download(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Backup key: the original key with a Unix-millisecond timestamp spliced
/// in before the extension. Distinct timestamps guarantee no collision
/// within a run and keep every prior version auditable.
pub fn backup_key(key: &str, unix_ms: i64) -> String {
    match key.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{unix_ms}.{ext}"),
        None => format!("{key}-{unix_ms}"),
    }
}

/// Snapshot key: the always-on timestamped copy of a successful run's
/// output, retained independently of the "latest" key.
pub fn snapshot_key(key: &str, unix_ms: i64) -> String {
    let name = key.rsplit('/').next().unwrap_or(key);
    format!("snapshots/{}", backup_key(name, unix_ms))
}
