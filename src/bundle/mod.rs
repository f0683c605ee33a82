// src/bundle/mod.rs

use std::path::PathBuf;

use reqwest::Client;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;

/// Base URL the release CDN serves content from.
pub const CDN_BASE: &str = "http://patch.poecdn.com/";

/// An opaque "bytes for table path" source.
///
/// Decompression and indexing of the release archive live behind this
/// seam; the decoder only ever sees whole-file byte buffers.
#[allow(async_fn_in_trait)]
pub trait FileSource {
    async fn file_contents(&self, path: &str) -> Result<Vec<u8>>;

    /// Drop any cached bytes so the next read hits the backing store.
    fn invalidate_cache(&self);
}

/// Fetches files from the version-parametrized release CDN, keeping a
/// plain on-disk copy per path so reruns skip the network.
pub struct CdnFileSource {
    client: Client,
    base: Url,
    cache_dir: PathBuf,
}

impl CdnFileSource {
    pub fn new(client: Client, version: &str, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let base = Url::parse(CDN_BASE)?.join(&format!("{version}/"))?;
        Ok(Self {
            client,
            base,
            cache_dir: cache_dir.into(),
        })
    }

    fn cache_path(&self, path: &str) -> PathBuf {
        // table paths use forward slashes; mirror them under the cache dir
        path.split('/')
            .fold(self.cache_dir.clone(), |dir, segment| dir.join(segment))
    }
}

impl FileSource for CdnFileSource {
    async fn file_contents(&self, path: &str) -> Result<Vec<u8>> {
        let cached = self.cache_path(path);
        if let Ok(bytes) = fs::read(&cached).await {
            debug!(path, "cache hit");
            return Ok(bytes);
        }

        let url = self.base.join(path)?;
        info!(%url, "downloading");
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if let Some(parent) = cached.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&cached, &bytes).await?;
        Ok(bytes.to_vec())
    }

    fn invalidate_cache(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.cache_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "failed to clear cache dir");
            }
        }
    }
}
