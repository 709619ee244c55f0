use log::{debug, info, warn};

use super::{
    resource::ResourceRegistry,
    session::{PlaybackSession, PlaybackState},
};
use crate::{
    domain::{
        ids::{BlobId, Digest, TrackId},
        track::Track,
    },
    error::GatewayError,
    upstream::AudioBytes,
};

/// Permission to run one confirm/fetch pair for a session.
///
/// Results are only applied while the session that issued the ticket is
/// still the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    session: u64,
    pub track_id: TrackId,
    pub blob_id: BlobId,
}

/// What a play request turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayAction {
    /// Nothing is loaded yet: confirm and fetch first.
    Load(LoadTicket),
    Play,
    Pause,
    /// A load is already in flight.
    Ignored,
}

/// Event-driven player holding at most one playback session.
#[derive(Debug, Default)]
pub struct Player {
    registry: ResourceRegistry,
    session: Option<PlaybackSession>,
    next_session: u64,
}

impl Player {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            session: None,
            next_session: 0,
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Selects a track, ending the session of any other track.
    ///
    /// Returns false if the track was already selected.
    pub fn select(&mut self, track: Track) -> bool {
        if let Some(session) = &self.session {
            if session.track.object_id == track.object_id {
                return false;
            }
        }

        self.next_session += 1;
        info!("selected track {} ({})", track.object_id, track.title);
        // the old session and its resource go away here
        self.session = Some(PlaybackSession::new(self.next_session, track));
        true
    }

    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            info!("closed player on track {}", session.track.object_id);
        }
    }

    /// Handles a click on play/pause.
    pub fn request_play(&mut self) -> Result<PlayAction, GatewayError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| GatewayError::invalid_input("no track selected"))?;

        let action = match session.state {
            PlaybackState::Confirming | PlaybackState::Fetching => {
                debug!(
                    "play on {} ignored, load in flight",
                    session.track.object_id
                );
                PlayAction::Ignored
            }
            PlaybackState::Idle | PlaybackState::Errored(_) => {
                session.state = PlaybackState::Confirming;
                session.last_error = None;
                session.digest = None;
                PlayAction::Load(LoadTicket {
                    session: session.id,
                    track_id: session.track.object_id.clone(),
                    blob_id: session.track.blob_id.clone(),
                })
            }
            PlaybackState::Ready | PlaybackState::Paused => {
                session.state = PlaybackState::Playing;
                PlayAction::Play
            }
            PlaybackState::Playing => {
                session.state = PlaybackState::Paused;
                PlayAction::Pause
            }
        };
        Ok(action)
    }

    /// The session a ticket belongs to, if it is still current.
    fn session_for(&mut self, ticket: &LoadTicket) -> Option<&mut PlaybackSession> {
        match self.session.as_mut() {
            Some(session) if session.id == ticket.session => Some(session),
            _ => {
                debug!("dropping stale result for track {}", ticket.track_id);
                None
            }
        }
    }

    /// Access was confirmed. Returns true if the bytes should be fetched now.
    pub fn on_confirmed(&mut self, ticket: &LoadTicket, digest: Digest) -> bool {
        let Some(session) = self.session_for(ticket) else {
            return false;
        };
        if session.state != PlaybackState::Confirming {
            warn!("confirmation arrived in state {}", session.state);
            return false;
        }

        info!("access to {} confirmed, digest {digest}", ticket.track_id);
        session.digest = Some(digest);
        session.state = PlaybackState::Fetching;
        true
    }

    /// Bytes arrived. Returns true if the session is now ready.
    pub fn on_fetched(&mut self, ticket: &LoadTicket, audio: AudioBytes) -> bool {
        let registry = self.registry.clone();
        let Some(session) = self.session_for(ticket) else {
            return false;
        };
        if session.state != PlaybackState::Fetching {
            warn!("audio arrived in state {}", session.state);
            return false;
        }

        let resource = registry.create_from(audio, &session.track.mime_type);
        info!(
            "track {} ready at {} ({} bytes)",
            ticket.track_id,
            resource.url(),
            resource.len()
        );
        session.resource = Some(resource);
        session.progress = 0.0;
        session.state = PlaybackState::Ready;
        true
    }

    /// Either load step failed.
    pub fn on_failed(&mut self, ticket: &LoadTicket, err: &GatewayError) -> bool {
        let Some(session) = self.session_for(ticket) else {
            return false;
        };
        if !session.state.is_loading() {
            return false;
        }

        warn!("playback of {} failed: {err}", ticket.track_id);
        session.fail(err.to_string());
        true
    }

    /// Returns the new mute flag, or None when nothing is loaded.
    pub fn toggle_mute(&mut self) -> Option<bool> {
        let session = self.session.as_mut().filter(|s| s.resource.is_some())?;
        session.muted = !session.muted;
        Some(session.muted)
    }

    /// Jumps to a fraction of the track. False when nothing is loaded.
    pub fn seek(&mut self, fraction: f64) -> bool {
        match self.session.as_mut().filter(|s| s.resource.is_some()) {
            Some(session) if fraction.is_finite() => {
                session.progress = fraction.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    pub fn on_time_update(&mut self, position_secs: f64, duration_secs: f64) {
        if !duration_secs.is_finite() || duration_secs <= 0.0 || !position_secs.is_finite() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.progress = (position_secs / duration_secs).clamp(0.0, 1.0);
        }
    }

    /// Playback reached the end; the resource stays for a replay.
    pub fn on_ended(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.state == PlaybackState::Playing {
                session.state = PlaybackState::Paused;
                session.progress = 0.0;
            }
        }
    }
}
