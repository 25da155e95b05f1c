use bytes::Bytes;
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, SubmintError};

/// A selected video held entirely in memory until it is uploaded.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl VideoFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a video from disk, inferring its mime type from the extension
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SubmintError::FileNotFound(path.display().to_string()));
        }

        let name = path
            .file_name()
            .ok_or_else(|| SubmintError::Validation("Invalid video filename".to_string()))?
            .to_string_lossy()
            .to_string();

        let mime_type = mime_type_for(path).ok_or_else(|| {
            SubmintError::UnsupportedFormat(format!("{} is not a supported video file", name))
        })?;

        let data = fs::read(path).await?;
        info!("Loaded video {} ({:.2} MB)", name, data.len() as f64 / (1024.0 * 1024.0));

        Ok(Self::new(name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "mp4" => Some("video/mp4"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "webm" => Some("video/webm"),
        _ => None,
    }
}
