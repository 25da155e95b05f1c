use serde::{Deserialize, Serialize};

use crate::language::{display_label, Language, ORIGINAL_LABEL};
use crate::service::ProcessingResponse;

/// Prefix the service puts in place of a filename when a translation failed
pub const TRANSLATION_FAILED_PREFIX: &str = "Translation failed";

/// Server-provided pointer to a subtitle file that has not been fetched yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleReference {
    pub language: String,
    #[serde(rename = "url")]
    pub remote_url: String,
}

impl SubtitleReference {
    pub fn new(language: impl Into<String>, remote_url: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            remote_url: remote_url.into(),
        }
    }

    pub fn is_original(&self) -> bool {
        self.language.eq_ignore_ascii_case(ORIGINAL_LABEL)
    }
}

/// Subtitle content fetched and exposed under a local object URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSubtitle {
    pub language: String,
    pub local_url: String,
}

pub fn download_url(base_url: &str, process_id: &str, filename: &str) -> String {
    format!("{}/api/download/{}/{}", base_url.trim_end_matches('/'), process_id, filename)
}

/// Map a processing response into subtitle references.
///
/// "Original" always comes first. Translations whose value is a failure
/// marker are dropped; the rest follow in supported-language order, with
/// unknown keys last in key order.
pub fn build_references(base_url: &str, response: &ProcessingResponse) -> Vec<SubtitleReference> {
    let mut references = vec![SubtitleReference::new(
        ORIGINAL_LABEL,
        download_url(base_url, &response.process_id, &response.original_srt),
    )];

    let mut translations: Vec<(&String, &String)> = response
        .translations
        .iter()
        .filter(|(_, filename)| !filename.starts_with(TRANSLATION_FAILED_PREFIX))
        .collect();
    translations.sort_by_key(|(key, _)| {
        let rank = Language::lookup(key).map(|lang| lang as u8).unwrap_or(u8::MAX);
        (rank, key.to_string())
    });

    references.extend(translations.into_iter().map(|(key, filename)| {
        SubtitleReference::new(
            display_label(key),
            download_url(base_url, &response.process_id, filename),
        )
    }));

    references
}
