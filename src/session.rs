//! Upload session state machine.
//!
//! One session covers one selected video: language selection, the upload,
//! progress tracking and mapping the service response into subtitle
//! references. Every upload is tagged with the generation that issued it so
//! results arriving after a new file was selected are discarded.
//!
//! The session owns every object URL derived from its file: the video URL and
//! the resolved subtitle tracks. Selecting a new file releases both.

use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SubmintError};
use crate::language::Language;
use crate::resource::{ObjectUrlRegistry, ObjectUrlScope};
use crate::service::{ProcessingResponse, UploadProgress, UploadRequest};
use crate::subtitle::{build_references, SubtitleReference};
use crate::video::VideoFile;

pub const MISSING_INPUT_MESSAGE: &str = "Please select a video file and at least one language";
pub const SUCCESS_MESSAGE: &str = "Video processed successfully!";
pub const FAILURE_MESSAGE: &str = "Failed to process video. Please try again.";

pub fn track_failure_message(failed: usize, total: usize) -> String {
    format!("{} of {} subtitle tracks failed to load", failed, total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Failed,
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// User-visible, transient message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed(Vec<SubtitleReference>),
    /// A newer file was selected while the request was in flight
    Superseded,
}

pub struct UploadSession {
    base_url: String,
    selected_file: Option<VideoFile>,
    video_url: Option<String>,
    video_scope: ObjectUrlScope,
    track_scope: ObjectUrlScope,
    selected_languages: BTreeSet<Language>,
    status: UploadStatus,
    progress_percent: u8,
    subtitles: Vec<SubtitleReference>,
    generation: u64,
    notifications: Vec<Notification>,
}

impl UploadSession {
    pub fn new(registry: ObjectUrlRegistry, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            selected_file: None,
            video_url: None,
            video_scope: ObjectUrlScope::new(registry.clone()),
            track_scope: ObjectUrlScope::new(registry),
            selected_languages: BTreeSet::new(),
            status: UploadStatus::Idle,
            progress_percent: 0,
            subtitles: Vec::new(),
            generation: 0,
            notifications: Vec::new(),
        }
    }

    /// Replace the selected video. Releases the previous video URL and resets
    /// everything downstream of the old file.
    pub fn select_file(&mut self, file: VideoFile) -> Result<&str> {
        if !file.is_video() {
            return Err(SubmintError::Validation(format!(
                "{} is not a video ({})",
                file.name, file.mime_type
            )));
        }

        self.generation += 1;
        self.video_scope.release_all();
        let tracks = self.track_scope.release_all();
        if tracks > 0 {
            debug!("Released {} subtitle tracks of the previous file", tracks);
        }
        let url = self.video_scope.acquire(file.data.clone(), &file.mime_type);
        info!("Selected {} as generation {}", file.name, self.generation);

        self.selected_file = Some(file);
        self.status = UploadStatus::Idle;
        self.progress_percent = 0;
        self.subtitles.clear();
        self.notifications.clear();

        Ok(self.video_url.insert(url).as_str())
    }

    pub fn toggle_language(&mut self, language: Language) -> bool {
        let selected = if self.selected_languages.remove(&language) {
            false
        } else {
            self.selected_languages.insert(language)
        };
        debug!("{} {}", if selected { "Selected" } else { "Deselected" }, language);
        selected
    }

    /// Validate and move to `Uploading`. The returned request must be
    /// completed with [`UploadSession::complete_submit`].
    pub fn begin_submit(&mut self) -> Result<UploadRequest> {
        if self.status == UploadStatus::Uploading {
            return Err(SubmintError::Validation("An upload is already in progress".to_string()));
        }

        let file = match (&self.selected_file, self.selected_languages.is_empty()) {
            (Some(file), false) => file.clone(),
            _ => {
                self.notify(NotificationKind::Error, MISSING_INPUT_MESSAGE);
                return Err(SubmintError::Validation(MISSING_INPUT_MESSAGE.to_string()));
            }
        };

        self.status = UploadStatus::Uploading;
        self.progress_percent = 0;

        Ok(UploadRequest {
            generation: self.generation,
            file,
            target_languages: self.target_languages(),
        })
    }

    /// Apply a progress event. Returns false when it was ignored.
    pub fn apply_progress(&mut self, generation: u64, progress: UploadProgress) -> bool {
        if generation != self.generation || self.status != UploadStatus::Uploading {
            return false;
        }
        self.progress_percent = self.progress_percent.max(progress.percent().min(100));
        true
    }

    pub fn complete_submit(
        &mut self,
        generation: u64,
        outcome: Result<ProcessingResponse>,
    ) -> Result<SubmitOutcome> {
        if generation != self.generation {
            warn!(
                "Discarding upload result for generation {} (current {})",
                generation, self.generation
            );
            return Ok(SubmitOutcome::Superseded);
        }

        match outcome {
            Ok(response) => {
                let references = build_references(&self.base_url, &response);
                info!(
                    "Process {} produced {} subtitle tracks",
                    response.process_id,
                    references.len()
                );
                self.subtitles = references.clone();
                self.status = UploadStatus::Succeeded;
                self.progress_percent = 100;
                self.notify(NotificationKind::Success, SUCCESS_MESSAGE);
                Ok(SubmitOutcome::Completed(references))
            }
            Err(e) => {
                error!("Upload error: {}", e);
                self.status = UploadStatus::Failed;
                self.notify(NotificationKind::Error, FAILURE_MESSAGE);
                Err(e)
            }
        }
    }

    /// Take ownership of the subtitle tracks resolved for `generation`,
    /// releasing the ones held before. Tracks for a replaced file are
    /// released right away and false is returned.
    pub fn attach_tracks(&mut self, generation: u64, tracks: ObjectUrlScope) -> bool {
        if generation != self.generation {
            warn!(
                "Releasing {} subtitle tracks for superseded generation {}",
                tracks.len(),
                generation
            );
            return false;
        }
        self.track_scope = tracks;
        true
    }

    /// Release the subtitle tracks, e.g. when the playback view goes away
    pub fn release_tracks(&mut self) -> usize {
        self.track_scope.release_all()
    }

    pub fn held_tracks(&self) -> usize {
        self.track_scope.len()
    }

    /// Record that some subtitle tracks could not be loaded for playback
    pub fn report_track_failures(&mut self, failed: usize, total: usize) {
        if failed > 0 {
            self.notify(NotificationKind::Error, &track_failure_message(failed, total));
        }
    }

    fn notify(&mut self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success => info!("{}", message),
            NotificationKind::Error => warn!("{}", message),
        }
        self.notifications.push(Notification {
            kind,
            message: message.to_string(),
        });
    }

    pub fn target_languages(&self) -> String {
        self.selected_languages
            .iter()
            .map(Language::code)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn selected_file(&self) -> Option<&VideoFile> {
        self.selected_file.as_ref()
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    pub fn selected_languages(&self) -> &BTreeSet<Language> {
        &self.selected_languages
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn subtitles(&self) -> &[SubtitleReference] {
        &self.subtitles
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// Drain the notifications recorded since the last call, oldest first
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
