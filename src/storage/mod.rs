use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::errors::Result;

pub mod local;

/// Where an uploaded image should land.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Sub-folder, e.g. `prompts/<prompt id>`.
    pub folder: String,
    /// Extension used when the bytes carry no recognisable format.
    pub fallback_extension: String,
}

/// What the host reports back after storing an image. `bytes` is the size
/// the host accounts for and is what the usage ledger records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    pub public_id: String,
    pub url: String,
    pub bytes: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, data: &[u8], options: &UploadOptions) -> Result<StoredImage>;

    async fn delete(&self, public_id: &str) -> Result<()>;
}

pub fn create_image_host(config: &Config) -> Result<Box<dyn ImageHost>> {
    let host = local::LocalImageHost::new(
        &config.upload_dir,
        &format!("{}/uploads", config.public_base_url.trim_end_matches('/')),
    )?;
    Ok(Box::new(host))
}
