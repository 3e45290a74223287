// On-disk storage for uploaded model artifacts
use crate::application::ai_service::StoredModelFile;
use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct ModelFileStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ModelFileStore {
    pub async fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir, max_bytes })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Open a uniquely named file for an incoming upload
    pub async fn create(&self, original_name: &str) -> Result<PendingUpload> {
        let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
        let file_name = format!(
            "model-{}-{}-{}",
            Utc::now().timestamp_millis(),
            suffix,
            sanitize_file_name(original_name)
        );
        let path = self.dir.join(file_name);
        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(PendingUpload {
            file,
            path,
            original_name: original_name.to_string(),
            size: 0,
            max_bytes: self.max_bytes,
        })
    }

    /// Delete a stored artifact; a file that is already gone is not an error
    pub async fn remove(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete model file {}", path)),
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload exceeds {0} bytes")]
    TooLarge(usize),
    #[error("failed to write model file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct PendingUpload {
    file: File,
    path: PathBuf,
    original_name: String,
    size: usize,
    max_bytes: usize,
}

impl PendingUpload {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        self.size += chunk.len();
        if self.size > self.max_bytes {
            return Err(UploadError::TooLarge(self.max_bytes));
        }
        self.file.write_all(chunk).await?;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StoredModelFile> {
        self.file.flush().await.context("Failed to flush model file")?;
        Ok(StoredModelFile {
            path: self.path.to_string_lossy().into_owned(),
            original_name: self.original_name,
            size: self.size as i64,
        })
    }

    /// Drop a partially written upload
    pub async fn discard(self) {
        drop(self.file);
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!("Failed to remove partial upload {}: {}", self.path.display(), e);
        }
    }
}

/// Keep only the final path component, with unusual characters replaced
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}
