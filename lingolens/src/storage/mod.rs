//! Object storage for image blobs.
//!
//! A narrow contract: write bytes under a caller-chosen object name,
//! overwrite on conflict, hand back a public URL. The filesystem backend is
//! the default; the trait is the seam a cloud blob store would plug into.

use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;

use crate::config::StorageConfig;
use crate::error::{LingoError, Result};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` as `object_name`, overwriting any existing object,
    /// and return its public URL.
    async fn upload(&self, bytes: &[u8], object_name: &str) -> Result<String>;
}

pub struct LocalFsStore {
    root: PathBuf,
    public_base: Url,
}

impl LocalFsStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let public_base = Url::parse(&config.public_base_url)?;
        if public_base.cannot_be_a_base() {
            return Err(LingoError::Storage(format!(
                "Invalid public base URL: {}",
                config.public_base_url
            )));
        }

        Ok(Self {
            root: PathBuf::from(&config.root),
            public_base,
        })
    }
}

#[async_trait]
impl ObjectStore for LocalFsStore {
    async fn upload(&self, bytes: &[u8], object_name: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| LingoError::Storage(format!("Failed to create storage root: {e}")))?;

        let path = self.root.join(object_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| LingoError::Storage(format!("Failed to write '{object_name}': {e}")))?;

        let url = self.public_base.join(object_name)?;
        Ok(url.to_string())
    }
}
