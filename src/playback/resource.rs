//! Local handles for fetched audio.
//!
//! Every [`AudioResource`] is registered when it is built and released when
//! it is dropped. Resources are not `Clone`, so a handle is released exactly
//! once; the registry keeps counters so a session's bookkeeping can be
//! checked from the outside.

use std::{
    collections::HashSet,
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};

use crate::upstream::AudioBytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(u64);

impl Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob:tunegate/{}", self.0)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashSet<ResourceHandle>,
    created: usize,
    released: usize,
}

/// Issues and revokes resource handles.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, mime: String, data: Vec<u8>) -> AudioResource {
        let handle = {
            let mut state = self.lock();
            state.next_id += 1;
            let handle = ResourceHandle(state.next_id);
            state.live.insert(handle);
            state.created += 1;
            handle
        };
        debug!("created {handle} ({} bytes, {mime})", data.len());

        AudioResource {
            handle,
            mime,
            data,
            registry: self.clone(),
        }
    }

    /// Builds a resource from fetched bytes.
    ///
    /// The declared content type wins, then `fallback_mime`, then `audio/mpeg`.
    pub fn create_from(&self, audio: AudioBytes, fallback_mime: &str) -> AudioResource {
        let mime = [audio.content_type.as_deref(), Some(fallback_mime)]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|m| !m.is_empty())
            .unwrap_or(crate::upstream::DEFAULT_AUDIO_MIME)
            .to_string();
        self.create(mime, audio.data)
    }

    fn release(&self, handle: ResourceHandle) {
        let mut state = self.lock();
        if state.live.remove(&handle) {
            state.released += 1;
            debug!("released {handle}");
        } else {
            warn!("{handle} released twice");
        }
    }

    /// Resources built and not yet released.
    pub fn live(&self) -> usize {
        self.lock().live.len()
    }

    pub fn created(&self) -> usize {
        self.lock().created
    }

    pub fn released(&self) -> usize {
        self.lock().released
    }
}

/// Audio ready for local playback, owned by exactly one session.
#[derive(Debug)]
pub struct AudioResource {
    handle: ResourceHandle,
    mime: String,
    data: Vec<u8>,
    registry: ResourceRegistry,
}

impl AudioResource {
    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    pub fn url(&self) -> String {
        self.handle.to_string()
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for AudioResource {
    fn drop(&mut self) {
        self.registry.release(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_releases_once() {
        let registry = ResourceRegistry::new();

        let resource = registry.create("audio/mpeg".into(), vec![1, 2, 3]);
        assert_eq!(registry.live(), 1);
        assert!(resource.url().starts_with("blob:tunegate/"));

        drop(resource);

        assert_eq!(registry.live(), 0);
        assert_eq!(registry.created(), 1);
        assert_eq!(registry.released(), 1);
    }

    #[test]
    fn test_handles_are_distinct() {
        let registry = ResourceRegistry::new();

        let a = registry.create("audio/mpeg".into(), vec![]);
        let b = registry.create("audio/mpeg".into(), vec![]);

        assert_ne!(a.handle(), b.handle());
        assert_eq!(registry.live(), 2);
    }

    #[test]
    fn test_mime_resolution_order() {
        let registry = ResourceRegistry::new();
        let bytes = |ct: Option<&str>| AudioBytes {
            content_type: ct.map(str::to_string),
            data: vec![0],
        };

        assert_eq!(
            registry.create_from(bytes(Some("audio/ogg")), "audio/flac").mime(),
            "audio/ogg"
        );
        assert_eq!(
            registry.create_from(bytes(None), "audio/flac").mime(),
            "audio/flac"
        );
        assert_eq!(registry.create_from(bytes(None), "").mime(), "audio/mpeg");
    }
}
