use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::resource::{ObjectUrlRegistry, ObjectUrlScope};
use crate::service::ProcessingService;
use crate::subtitle::{ResolvedSubtitle, SubtitleReference};

pub const SUBTITLE_MIME_TYPE: &str = "text/vtt";

/// Fetches subtitle references into locally addressable tracks.
///
/// Each call to [`SubtitleResolver::resolve`] releases the tracks of the
/// previous call before acquiring new ones, unless they were handed off with
/// [`SubtitleResolver::take_tracks`]. Dropping the resolver releases
/// whatever it still holds.
pub struct SubtitleResolver {
    service: Arc<dyn ProcessingService>,
    registry: ObjectUrlRegistry,
    scope: ObjectUrlScope,
}

impl SubtitleResolver {
    pub fn new(service: Arc<dyn ProcessingService>, registry: ObjectUrlRegistry) -> Self {
        Self {
            service,
            scope: ObjectUrlScope::new(registry.clone()),
            registry,
        }
    }

    /// Resolve every reference independently. Failed items are logged and
    /// left out; the result keeps input order.
    pub async fn resolve(&mut self, references: &[SubtitleReference]) -> Vec<ResolvedSubtitle> {
        let released = self.scope.release_all();
        if released > 0 {
            debug!("Released {} subtitle tracks from the previous resolution", released);
        }

        let fetches = references.iter().map(|reference| {
            let service = Arc::clone(&self.service);
            async move { service.fetch_subtitle(reference).await }
        });
        let results = join_all(fetches).await;

        let mut resolved = Vec::with_capacity(references.len());
        for (reference, result) in references.iter().zip(results) {
            match result {
                Ok(text) => {
                    let local_url = self.scope.acquire(Bytes::from(text), SUBTITLE_MIME_TYPE);
                    resolved.push(ResolvedSubtitle {
                        language: reference.language.clone(),
                        local_url,
                    });
                }
                Err(e) => warn!("Error loading subtitle for {}: {}", reference.language, e),
            }
        }

        info!("Resolved {}/{} subtitle tracks", resolved.len(), references.len());
        resolved
    }

    /// Hand the tracks of the last resolution to a new owner
    pub fn take_tracks(&mut self) -> ObjectUrlScope {
        std::mem::replace(&mut self.scope, ObjectUrlScope::new(self.registry.clone()))
    }

    pub fn held(&self) -> usize {
        self.scope.len()
    }
}
