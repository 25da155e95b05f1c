// Processing service contract
//
// The remote service turns an uploaded video into an original transcript plus
// one translated subtitle file per requested language:
//
//   POST /api/process-video                  multipart: video, target_languages
//   GET  /api/download/{process_id}/{file}   ?stream=true&format=vtt for playback
//
// `http` holds the reqwest implementation; tests substitute mocks.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

pub use http::HttpProcessingClient;
use crate::error::Result;
use crate::subtitle::SubtitleReference;
use crate::video::VideoFile;

/// One upload, tagged with the session generation that issued it
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub generation: u64,
    pub file: VideoFile,
    /// Comma-joined service language codes
    pub target_languages: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Rounded percentage, 0 while the total is unknown
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let sent = self.sent.min(self.total) as f64;
        ((sent * 100.0) / self.total as f64).round() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResponse {
    pub process_id: String,
    pub original_srt: String,
    /// Language key to subtitle filename, or a "Translation failed..." message
    #[serde(default)]
    pub translations: HashMap<String, String>,
}

/// Main trait for talking to the processing service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Upload a video and wait for its subtitles to be generated.
    /// Progress is reported as bytes are handed to the transport.
    async fn process_video(
        &self,
        request: UploadRequest,
        progress: UnboundedSender<UploadProgress>,
    ) -> Result<ProcessingResponse>;

    /// Fetch a subtitle track as renderable WebVTT text
    async fn fetch_subtitle(&self, reference: &SubtitleReference) -> Result<String>;

    /// Download the raw SRT file behind a reference
    async fn download_subtitle(&self, reference: &SubtitleReference) -> Result<Bytes>;
}
