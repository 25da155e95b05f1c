use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{Result, SubmintError};
use crate::language::Language;
use crate::mint::{MintFlow, MintOutcome, MintState, OwnershipLedger};
use crate::playback::{save_subtitle, write_tracks, PlaybackInput};
use crate::resolve::SubtitleResolver;
use crate::resource::ObjectUrlRegistry;
use crate::service::{ProcessingService, UploadProgress};
use crate::session::{SubmitOutcome, UploadSession};
use crate::video::VideoFile;

/// Drives one upload session from file selection to playback and minting.
///
/// The session sits behind a mutex so another task may select a new file
/// while an upload is in flight; results tagged with an older generation are
/// dropped instead of applied. Resolved subtitle tracks are handed to the
/// session, so replacing its file releases them immediately, and the
/// playback view built for an older file is never exposed.
pub struct Studio {
    registry: ObjectUrlRegistry,
    session: Arc<Mutex<UploadSession>>,
    service: Arc<dyn ProcessingService>,
    resolver: SubtitleResolver,
    ledger: Option<Arc<dyn OwnershipLedger>>,
    playback: Option<PlaybackInput>,
    mint: MintFlow,
    view_generation: u64,
}

impl Studio {
    pub fn new(
        base_url: &str,
        service: Arc<dyn ProcessingService>,
        ledger: Option<Arc<dyn OwnershipLedger>>,
    ) -> Self {
        let registry = ObjectUrlRegistry::new();
        let session = Arc::new(Mutex::new(UploadSession::new(registry.clone(), base_url)));
        Self::with_session(registry, session, service, ledger)
    }

    pub fn with_session(
        registry: ObjectUrlRegistry,
        session: Arc<Mutex<UploadSession>>,
        service: Arc<dyn ProcessingService>,
        ledger: Option<Arc<dyn OwnershipLedger>>,
    ) -> Self {
        let resolver = SubtitleResolver::new(Arc::clone(&service), registry.clone());
        let view_generation = session.lock().generation();
        Self {
            registry,
            session,
            service,
            resolver,
            ledger,
            playback: None,
            mint: MintFlow::new(),
            view_generation,
        }
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    pub fn session(&self) -> Arc<Mutex<UploadSession>> {
        Arc::clone(&self.session)
    }

    pub fn playback(&self) -> Option<&PlaybackInput> {
        if self.session.lock().generation() != self.view_generation {
            return None;
        }
        self.playback.as_ref()
    }

    pub fn mint_state(&self) -> MintState {
        self.mint.state()
    }

    pub fn select_file(&mut self, file: VideoFile) -> Result<String> {
        let url = self.session.lock().select_file(file)?.to_string();
        self.sync_generation();
        Ok(url)
    }

    pub fn toggle_language(&self, language: Language) -> bool {
        self.session.lock().toggle_language(language)
    }

    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        self.submit_with_progress(|_| {}).await
    }

    /// Upload the selected file, map the response and resolve the subtitle
    /// tracks into a playback input. `on_progress` sees every applied
    /// progress percentage.
    pub async fn submit_with_progress<F: FnMut(u8)>(&mut self, mut on_progress: F) -> Result<SubmitOutcome> {
        self.sync_generation();

        let request = self.session.lock().begin_submit()?;
        let generation = request.generation;

        let (tx, mut rx) = mpsc::unbounded_channel::<UploadProgress>();
        let result = {
            let upload = self.service.process_video(request, tx);
            tokio::pin!(upload);

            loop {
                tokio::select! {
                    result = &mut upload => break result,
                    Some(progress) = rx.recv() => {
                        if let Some(percent) = self.apply_progress(generation, progress) {
                            on_progress(percent);
                        }
                    }
                }
            }
        };
        while let Ok(progress) = rx.try_recv() {
            if let Some(percent) = self.apply_progress(generation, progress) {
                on_progress(percent);
            }
        }

        let outcome = self.session.lock().complete_submit(generation, result)?;
        let references = match outcome {
            SubmitOutcome::Completed(references) => references,
            SubmitOutcome::Superseded => return Ok(SubmitOutcome::Superseded),
        };

        self.session.lock().release_tracks();
        let resolved = self.resolver.resolve(&references).await;
        let tracks = self.resolver.take_tracks();

        let video_url = {
            let mut session = self.session.lock();
            if !session.attach_tracks(generation, tracks) {
                return Ok(SubmitOutcome::Superseded);
            }
            session.report_track_failures(references.len() - resolved.len(), references.len());
            session.video_url().map(str::to_string)
        };

        let video_url = video_url
            .ok_or_else(|| SubmintError::Validation("No video selected".to_string()))?;
        let playback = PlaybackInput::compose(video_url, &resolved);
        info!("Playback ready with {} tracks", playback.tracks.len());
        self.playback = Some(playback);
        // a new subtitle set is a new record to register
        self.mint = MintFlow::new();

        Ok(SubmitOutcome::Completed(references))
    }

    fn apply_progress(&self, generation: u64, progress: UploadProgress) -> Option<u8> {
        let mut session = self.session.lock();
        session
            .apply_progress(generation, progress)
            .then(|| session.progress_percent())
    }

    /// Register ownership of the current video and its subtitle set
    pub async fn mint(&mut self) -> Result<MintOutcome> {
        self.sync_generation();
        if self.playback.is_none() {
            return Err(SubmintError::Validation("No processed video to mint".to_string()));
        }

        let (video_url, subtitles) = {
            let session = self.session.lock();
            (
                session.video_url().map(str::to_string),
                session.subtitles().to_vec(),
            )
        };
        let video_url = video_url
            .ok_or_else(|| SubmintError::Validation("No video selected".to_string()))?;

        self.mint.mint(self.ledger.as_deref(), &video_url, &subtitles).await
    }

    /// Download every subtitle of the current session as SRT into `dir`
    pub async fn save_subtitles(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let references = self.session.lock().subtitles().to_vec();
        let mut saved = Vec::with_capacity(references.len());
        for reference in &references {
            match save_subtitle(self.service.as_ref(), reference, dir).await {
                Ok(path) => saved.push(path),
                Err(e) => warn!("Download error for {}: {}", reference.language, e),
            }
        }
        Ok(saved)
    }

    /// Materialize the playback tracks and manifest into `dir`
    pub async fn write_playback(&self, dir: &Path) -> Result<PathBuf> {
        let playback = self
            .playback()
            .ok_or_else(|| SubmintError::Validation("Playback is not ready".to_string()))?;
        write_tracks(&self.registry, playback, dir).await
    }

    /// Tear the playback view down, releasing its subtitle tracks
    pub fn close_playback(&mut self) {
        let released = self.session.lock().release_tracks();
        self.playback = None;
        info!("Closed playback view ({} tracks released)", released);
    }

    /// Reset everything downstream of the session when its file changed
    fn sync_generation(&mut self) {
        let current = self.session.lock().generation();
        if current != self.view_generation {
            self.playback = None;
            self.mint = MintFlow::new();
            self.view_generation = current;
        }
    }
}
