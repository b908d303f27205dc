use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use image::io::Reader as ImageReader;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::{AppError, Result},
    storage::{ImageHost, StoredImage, UploadOptions},
};

/// Stores images under a directory that the router serves at `/uploads`.
pub struct LocalImageHost {
    base_path: PathBuf,
    base_url: String,
}

impl LocalImageHost {
    pub fn new<P: AsRef<Path>>(base_path: P, base_url: &str) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;

        Ok(Self {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolves a public id to a path, refusing anything that escapes the
    /// base directory.
    fn get_full_path(&self, public_id: &str) -> Result<PathBuf> {
        let relative = Path::new(public_id);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Validation(format!("Invalid image id: {}", public_id)));
        }
        Ok(self.base_path.join(relative))
    }
}

/// Format name and pixel size read from the image header.
fn inspect(data: &[u8]) -> Result<(Option<&'static str>, u32, u32)> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::Validation(format!("Unreadable image: {}", e)))?;
    let format = reader
        .format()
        .and_then(|f| f.extensions_str().first().copied());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| AppError::Validation(format!("Unreadable image: {}", e)))?;
    Ok((format, width, height))
}

#[async_trait]
impl ImageHost for LocalImageHost {
    async fn upload(&self, data: &[u8], options: &UploadOptions) -> Result<StoredImage> {
        let (format, width, height) = inspect(data)?;
        let format = format.unwrap_or(options.fallback_extension.as_str()).to_string();

        let public_id = format!(
            "{}/{}.{}",
            options.folder.trim_matches('/'),
            Uuid::new_v4(),
            format
        );
        let full_path = self.get_full_path(&public_id)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))?;

        debug!(public_id = %public_id, bytes = data.len(), "Image stored");

        Ok(StoredImage {
            url: format!("{}/{}", self.base_url, public_id),
            public_id,
            bytes: data.len() as u64,
            width,
            height,
            format,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let full_path = self.get_full_path(public_id)?;

        fs::remove_file(&full_path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageOutputFormat, Rgb};
    use tempfile::tempdir;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        out.into_inner()
    }

    fn options() -> UploadOptions {
        UploadOptions {
            folder: "prompts/test".to_string(),
            fallback_extension: "bin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let temp_dir = tempdir().unwrap();
        let host = LocalImageHost::new(temp_dir.path(), "http://localhost:3000/uploads/").unwrap();
        let data = png(4, 3);

        let stored = host.upload(&data, &options()).await.unwrap();

        assert_eq!((stored.width, stored.height), (4, 3));
        assert_eq!(stored.format, "png");
        assert_eq!(stored.bytes, data.len() as u64);
        assert!(stored.public_id.starts_with("prompts/test/"));
        assert_eq!(stored.url, format!("http://localhost:3000/uploads/{}", stored.public_id));
        assert!(temp_dir.path().join(&stored.public_id).exists());

        host.delete(&stored.public_id).await.unwrap();
        assert!(!temp_dir.path().join(&stored.public_id).exists());
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let temp_dir = tempdir().unwrap();
        let host = LocalImageHost::new(temp_dir.path(), "http://localhost/uploads").unwrap();

        let result = host.upload(b"definitely not an image", &options()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_refuses_path_traversal() {
        let temp_dir = tempdir().unwrap();
        let host = LocalImageHost::new(temp_dir.path(), "http://localhost/uploads").unwrap();

        assert!(matches!(
            host.delete("../outside.png").await,
            Err(AppError::Validation(_))
        ));
    }
}
