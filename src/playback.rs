use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::{Result, SubmintError};
use crate::resource::ObjectUrlRegistry;
use crate::service::ProcessingService;
use crate::subtitle::{ResolvedSubtitle, SubtitleReference};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTrack {
    pub kind: String,
    pub label: String,
    pub src_lang: String,
    pub src: String,
    pub default: bool,
}

/// Player configuration: a video source plus its subtitle tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackInput {
    pub video_url: String,
    pub tracks: Vec<PlaybackTrack>,
}

impl PlaybackInput {
    /// Only the first "Original" track is marked default.
    pub fn compose(video_url: impl Into<String>, resolved: &[ResolvedSubtitle]) -> Self {
        let mut has_default = false;
        let tracks = resolved
            .iter()
            .map(|subtitle| {
                let src_lang = subtitle.language.to_lowercase();
                let default = !has_default && src_lang == "original";
                has_default |= default;
                PlaybackTrack {
                    kind: "subtitles".to_string(),
                    label: subtitle.language.clone(),
                    src_lang,
                    src: subtitle.local_url.clone(),
                    default,
                }
            })
            .collect();

        Self {
            video_url: video_url.into(),
            tracks,
        }
    }

    pub fn default_track(&self) -> Option<&PlaybackTrack> {
        self.tracks.iter().find(|track| track.default)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// File name stem for a service-supplied label. Only `[a-z0-9_-]` survive,
/// so the result never leaves the directory it is joined onto.
pub fn file_stem(label: &str) -> String {
    let stem: String = label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "track".to_string()
    } else {
        stem
    }
}

pub fn download_file_name(language: &str) -> String {
    format!("subtitles_{}.srt", file_stem(language))
}

/// Download the SRT behind a reference into `dir`
pub async fn save_subtitle(
    service: &dyn ProcessingService,
    reference: &SubtitleReference,
    dir: &Path,
) -> Result<PathBuf> {
    let data = service.download_subtitle(reference).await?;
    fs::create_dir_all(dir).await?;
    let path = dir.join(download_file_name(&reference.language));
    fs::write(&path, &data).await?;
    info!("Saved {} subtitles to {}", reference.language, path.display());
    Ok(path)
}

/// Write every resolved track as `<label>.vtt` (see [`file_stem`]) plus a `playback.json`
/// manifest pointing at the written files
pub async fn write_tracks(
    registry: &ObjectUrlRegistry,
    input: &PlaybackInput,
    dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;

    let mut manifest = input.clone();
    let mut used = HashSet::new();
    for (index, track) in manifest.tracks.iter_mut().enumerate() {
        let object = registry.get(&track.src).ok_or_else(|| {
            SubmintError::FileNotFound(format!("{} track {} was released", track.label, track.src))
        })?;
        let mut stem = file_stem(&track.src_lang);
        if !used.insert(stem.clone()) {
            stem = format!("{}_{}", stem, index);
            used.insert(stem.clone());
        }
        let path = dir.join(format!("{}.vtt", stem));
        fs::write(&path, &object.data).await?;
        track.src = path.display().to_string();
    }

    if registry.get(&input.video_url).is_none() {
        warn!("Video object URL {} is no longer live", input.video_url);
    }

    let manifest_path = dir.join("playback.json");
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).await?;
    info!("Wrote {} tracks and {}", manifest.tracks.len(), manifest_path.display());
    Ok(manifest_path)
}
