use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::{ProcessingResponse, ProcessingService, UploadProgress, UploadRequest};
use crate::config::ServiceConfig;
use crate::error::{Result, SubmintError};
use crate::subtitle::SubtitleReference;

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: String,
}

/// reqwest client for the processing service
pub struct HttpProcessingClient {
    client: Client,
    base_url: String,
    chunk_size: usize,
}

impl HttpProcessingClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent("submint/0.1.0");
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(SubmintError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Wrap the file in a chunked body that reports progress as the
    /// transport pulls each chunk
    fn progress_body(&self, data: Bytes, progress: UnboundedSender<UploadProgress>) -> Body {
        let total = data.len() as u64;
        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(self.chunk_size)
            .map(|start| data.slice(start..(start + self.chunk_size).min(data.len())))
            .collect();

        // Receiver may be gone if the session was superseded
        let _ = progress.send(UploadProgress { sent: 0, total });

        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            let _ = progress.send(UploadProgress { sent, total });
            Ok::<Bytes, std::io::Error>(chunk)
        }));

        Body::wrap_stream(stream)
    }

    async fn error_from_response(context: &str, response: Response) -> SubmintError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ServiceErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        SubmintError::Transport(format!("{} failed with HTTP {}: {}", context, status, detail))
    }
}

#[async_trait]
impl ProcessingService for HttpProcessingClient {
    async fn process_video(
        &self,
        request: UploadRequest,
        progress: UnboundedSender<UploadProgress>,
    ) -> Result<ProcessingResponse> {
        let url = format!("{}/api/process-video", self.base_url);
        let file = request.file;
        let total = file.size();
        info!(
            "Uploading {} ({} bytes) for languages [{}]",
            file.name, total, request.target_languages
        );

        let part = Part::stream_with_length(self.progress_body(file.data, progress), total)
            .file_name(file.name)
            .mime_str(&file.mime_type)
            .map_err(|e| SubmintError::Validation(format!("Invalid video mime type: {}", e)))?;

        let form = Form::new()
            .part("video", part)
            .text("target_languages", request.target_languages);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmintError::Transport(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("Video processing", response).await);
        }

        let processed: ProcessingResponse = response
            .json()
            .await
            .map_err(|e| SubmintError::Transport(format!("Failed to parse processing response: {}", e)))?;

        debug!("Processing response: {:?}", processed);
        Ok(processed)
    }

    async fn fetch_subtitle(&self, reference: &SubtitleReference) -> Result<String> {
        debug!("Fetching {} subtitles from {}", reference.language, reference.remote_url);

        let response = self
            .client
            .get(&reference.remote_url)
            .query(&[("stream", "true"), ("format", "vtt")])
            .send()
            .await
            .map_err(|e| SubmintError::Transport(format!("Subtitle fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("Subtitle fetch", response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(content_type) = content_type {
            if !content_type.starts_with("text/") {
                return Err(SubmintError::Transport(format!(
                    "Subtitle fetch returned non-text content: {}",
                    content_type
                )));
            }
        }

        response
            .text()
            .await
            .map_err(|e| SubmintError::Transport(format!("Failed to read subtitle body: {}", e)))
    }

    async fn download_subtitle(&self, reference: &SubtitleReference) -> Result<Bytes> {
        let response = self
            .client
            .get(&reference.remote_url)
            .send()
            .await
            .map_err(|e| SubmintError::Transport(format!("Subtitle download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response("Subtitle download", response).await);
        }

        response
            .bytes()
            .await
            .map_err(|e| SubmintError::Transport(format!("Failed to read subtitle download: {}", e)))
    }
}
