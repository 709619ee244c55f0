use std::fmt::Display;

use super::resource::AudioResource;
use crate::domain::{ids::Digest, track::Track};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Confirming,
    Fetching,
    Ready,
    Playing,
    Paused,
    Errored(String),
}

impl PlaybackState {
    /// A confirm/fetch pair is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, PlaybackState::Confirming | PlaybackState::Fetching)
    }
}

impl Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Confirming => write!(f, "confirming"),
            PlaybackState::Fetching => write!(f, "fetching"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Errored(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Playback of one selected track.
///
/// Lives from track selection until another track is selected or the player
/// closes. Dropping it drops the resource, which releases its handle.
#[derive(Debug)]
pub struct PlaybackSession {
    pub(super) id: u64,
    pub(super) track: Track,
    pub(super) state: PlaybackState,
    pub(super) digest: Option<Digest>,
    pub(super) muted: bool,
    /// in [0, 1]
    pub(super) progress: f64,
    pub(super) last_error: Option<String>,
    pub(super) resource: Option<AudioResource>,
}

impl PlaybackSession {
    pub(super) fn new(id: u64, track: Track) -> Self {
        Self {
            id,
            track,
            state: PlaybackState::Idle,
            digest: None,
            muted: false,
            progress: 0.0,
            last_error: None,
            resource: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn resource(&self) -> Option<&AudioResource> {
        self.resource.as_ref()
    }

    pub(super) fn fail(&mut self, message: String) {
        self.last_error = Some(message.clone());
        self.state = PlaybackState::Errored(message);
    }
}
