use camino::Utf8Path;
use futures::StreamExt;
use reqwest::Client;
use ressync_core::ModList;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::hashing;

/// Shared HTTP client with the tool's user agent and bounded timeouts.
pub fn default_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(ressync_config::USER_AGENT)
        .connect_timeout(Duration::from_secs(ressync_config::CONNECT_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(ressync_config::READ_TIMEOUT_SECS))
        .build()
}

/// Byte-level progress for one transfer. Per-transfer ordering is preserved
/// by the mpsc channel; transfers are serial so cross-transfer ordering is
/// not a concern.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Started {
        id: u64,
        /// `None` when the server omits Content-Length; consumers render an
        /// indeterminate indicator.
        total_bytes: Option<u64>,
    },
    Progress {
        id: u64,
        bytes_read: u64,
        total_bytes: Option<u64>,
    },
    Completed {
        id: u64,
        success: bool,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP status {0} for {1}")]
    Status(u16, String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Streams one remote resource to a local path, verifying its digest.
///
/// The destination is always either complete-and-verified or absent on
/// return: the body streams into a `.part` sibling which is renamed over the
/// destination only after verification, and deleted on any failure.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(
        &self,
        id: u64,
        url: &str,
        dest: &Utf8Path,
        expected_hash: &str,
        progress_tx: Option<&Sender<DownloadEvent>>,
    ) -> Result<u64, FetchError> {
        let result = self
            .fetch_inner(id, url, dest, expected_hash, progress_tx)
            .await;

        if let Some(tx) = progress_tx {
            let _ = tx
                .send(DownloadEvent::Completed {
                    id,
                    success: result.is_ok(),
                })
                .await;
        }

        result
    }

    async fn fetch_inner(
        &self,
        id: u64,
        url: &str,
        dest: &Utf8Path,
        expected_hash: &str,
        progress_tx: Option<&Sender<DownloadEvent>>,
    ) -> Result<u64, FetchError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent.as_std_path()).await?;
        }

        let resp = self
            .client
            .get(url)
            .header("Accept", "*/*")
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16(), url.to_string()));
        }

        let total_bytes = resp.content_length();
        if let Some(tx) = progress_tx {
            let _ = tx.send(DownloadEvent::Started { id, total_bytes }).await;
        }

        let tmp_path = dest.with_extension("part");
        let written = match self
            .stream_body(resp, &tmp_path, id, total_bytes, progress_tx)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(tmp_path.as_std_path()).await;
                return Err(e);
            }
        };

        if !expected_hash.trim().is_empty() {
            let check_path = tmp_path.clone();
            let actual = tokio::task::spawn_blocking(move || hashing::file_md5(&check_path))
                .await
                .map_err(|e| std::io::Error::other(e))?
                .map_err(|e| match e {
                    hashing::HashError::Io(io) => FetchError::Io(io),
                })?;

            if !hashing::digest_matches(&actual, expected_hash) {
                warn!(url, expected = expected_hash, actual, "hash mismatch, deleting download");
                let _ = tokio::fs::remove_file(tmp_path.as_std_path()).await;
                return Err(FetchError::HashMismatch {
                    expected: expected_hash.to_string(),
                    actual,
                });
            }
        }

        if let Err(e) = tokio::fs::rename(tmp_path.as_std_path(), dest.as_std_path()).await {
            let _ = tokio::fs::remove_file(tmp_path.as_std_path()).await;
            return Err(e.into());
        }

        debug!(url, dest = %dest, bytes = written, "download complete");
        Ok(written)
    }

    async fn stream_body(
        &self,
        resp: reqwest::Response,
        tmp_path: &Utf8Path,
        id: u64,
        total_bytes: Option<u64>,
        progress_tx: Option<&Sender<DownloadEvent>>,
    ) -> Result<u64, FetchError> {
        let mut file = File::create(tmp_path.as_std_path()).await?;
        let mut stream = resp.bytes_stream();
        let mut bytes_read = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            bytes_read += chunk.len() as u64;

            if let Some(tx) = progress_tx {
                let _ = tx
                    .send(DownloadEvent::Progress {
                        id,
                        bytes_read,
                        total_bytes,
                    })
                    .await;
            }
        }

        file.flush().await?;
        Ok(bytes_read)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of the parsed mod list. The core does not care about transport;
/// tests substitute in-memory implementations.
#[async_trait::async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_modlist(&self, url: &str) -> Result<ModList, ManifestError>;
}

pub struct HttpManifestSource {
    client: Client,
}

impl HttpManifestSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch_modlist(&self, url: &str) -> Result<ModList, ManifestError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ManifestError::Network(e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(ManifestError::Status(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ManifestError::Network(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| ManifestError::Parse(e.to_string()))
    }
}

/// Local fallback: a modlist JSON file on disk, same wire shape as the API.
pub fn load_modlist_file(path: &Utf8Path) -> Result<ModList, ManifestError> {
    let data = std::fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| ManifestError::Parse(e.to_string()))
}
