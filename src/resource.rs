//! Process-local object URLs.
//!
//! Binary payloads (the selected video, fetched subtitle tracks) are exposed
//! under `blob:submint/<uuid>` URLs until released. A URL stays valid until
//! it is released; releasing it again is a no-op.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const URL_PREFIX: &str = "blob:submint/";

#[derive(Debug, Clone)]
pub struct ObjectData {
    pub data: Bytes,
    pub mime_type: String,
}

/// Shared registry of live object URLs
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    inner: Arc<Mutex<HashMap<String, ObjectData>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, data: Bytes, mime_type: &str) -> String {
        let url = format!("{}{}", URL_PREFIX, Uuid::new_v4());
        debug!("Acquired object URL {} ({} bytes, {})", url, data.len(), mime_type);
        self.inner.lock().insert(
            url.clone(),
            ObjectData {
                data,
                mime_type: mime_type.to_string(),
            },
        );
        url
    }

    /// Returns false when the URL was unknown or already released
    pub fn release(&self, url: &str) -> bool {
        let released = self.inner.lock().remove(url).is_some();
        if released {
            debug!("Released object URL {}", url);
        }
        released
    }

    pub fn get(&self, url: &str) -> Option<ObjectData> {
        self.inner.lock().get(url).cloned()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.inner.lock().contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_object_url(url: &str) -> bool {
        url.starts_with(URL_PREFIX)
    }
}

/// Owns a set of object URLs and releases them when dropped.
pub struct ObjectUrlScope {
    registry: ObjectUrlRegistry,
    urls: Vec<String>,
}

impl ObjectUrlScope {
    pub fn new(registry: ObjectUrlRegistry) -> Self {
        Self {
            registry,
            urls: Vec::new(),
        }
    }

    pub fn acquire(&mut self, data: Bytes, mime_type: &str) -> String {
        let url = self.registry.acquire(data, mime_type);
        self.urls.push(url.clone());
        url
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Release everything held so far. The scope stays usable.
    pub fn release_all(&mut self) -> usize {
        let mut released = 0;
        for url in self.urls.drain(..) {
            if self.registry.release(&url) {
                released += 1;
            } else {
                warn!("Object URL {} was released outside its scope", url);
            }
        }
        released
    }
}

impl Drop for ObjectUrlScope {
    fn drop(&mut self) {
        if !self.urls.is_empty() {
            debug!("Releasing {} object URLs on scope exit", self.urls.len());
            self.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_twice_is_noop() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.acquire(Bytes::from_static(b"WEBVTT"), "text/vtt");

        assert!(ObjectUrlRegistry::is_object_url(&url));
        assert_eq!(registry.get(&url).unwrap().mime_type, "text/vtt");
        assert!(registry.release(&url));
        assert!(!registry.release(&url));
        assert!(registry.get(&url).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_acquired_urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.acquire(Bytes::from_static(b"a"), "text/plain");
        let b = registry.acquire(Bytes::from_static(b"a"), "text/plain");
        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_scope_releases_on_drop() {
        let registry = ObjectUrlRegistry::new();
        {
            let mut scope = ObjectUrlScope::new(registry.clone());
            scope.acquire(Bytes::from_static(b"one"), "text/vtt");
            scope.acquire(Bytes::from_static(b"two"), "text/vtt");
            assert_eq!(registry.live_count(), 2);
        }
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_scope_releases_on_error_path() {
        fn failing(registry: &ObjectUrlRegistry) -> Result<(), String> {
            let mut scope = ObjectUrlScope::new(registry.clone());
            scope.acquire(Bytes::from_static(b"partial"), "text/vtt");
            Err("fetch failed".to_string())
        }

        let registry = ObjectUrlRegistry::new();
        assert!(failing(&registry).is_err());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_release_all_keeps_scope_usable() {
        let registry = ObjectUrlRegistry::new();
        let mut scope = ObjectUrlScope::new(registry.clone());
        scope.acquire(Bytes::from_static(b"x"), "text/vtt");
        assert_eq!(scope.release_all(), 1);
        assert!(scope.is_empty());

        let url = scope.acquire(Bytes::from_static(b"y"), "text/vtt");
        assert!(registry.is_live(&url));
        assert_eq!(scope.len(), 1);
    }
}
