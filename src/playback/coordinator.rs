use log::debug;

use super::{
    player::{LoadTicket, PlayAction, Player},
    session::{PlaybackSession, PlaybackState},
};
use crate::{domain::track::Track, error::GatewayError, upstream::Backend};

/// How a load ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    /// Another load for the same session is still running.
    InFlight,
    /// The session moved on while the calls were running.
    Stale,
}

/// Runs confirm-then-fetch against a backend and feeds the results to a
/// [`Player`].
///
/// The confirm step always completes before the fetch starts and a failed
/// confirmation never fetches. Nothing is retried.
pub struct PlaybackCoordinator<'a, B: Backend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> PlaybackCoordinator<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Selects `track` and loads it up to `Ready`.
    ///
    /// Does nothing if the track is already loaded or loading.
    pub fn start_playback(
        &self,
        player: &mut Player,
        track: Track,
    ) -> Result<LoadOutcome, GatewayError> {
        player.select(track);
        match player.session().map(PlaybackSession::state) {
            Some(state) if state.is_loading() => return Ok(LoadOutcome::InFlight),
            Some(PlaybackState::Idle | PlaybackState::Errored(_)) | None => {}
            Some(_) => return Ok(LoadOutcome::Ready),
        }

        match player.request_play()? {
            PlayAction::Load(ticket) => self.load(player, ticket),
            _ => Ok(LoadOutcome::InFlight),
        }
    }

    /// A play/pause click: loads on first use, then toggles locally.
    pub fn toggle(&self, player: &mut Player) -> Result<PlayAction, GatewayError> {
        match player.request_play()? {
            PlayAction::Load(ticket) => match self.load(player, ticket)? {
                LoadOutcome::Ready => player.request_play(),
                LoadOutcome::InFlight | LoadOutcome::Stale => Ok(PlayAction::Ignored),
            },
            action => Ok(action),
        }
    }

    pub fn load(
        &self,
        player: &mut Player,
        ticket: LoadTicket,
    ) -> Result<LoadOutcome, GatewayError> {
        debug!("confirming access to {}", ticket.track_id);
        match self.backend.confirm_access(&ticket.track_id) {
            Ok(digest) => {
                if !player.on_confirmed(&ticket, digest) {
                    return Ok(LoadOutcome::Stale);
                }
            }
            Err(err) => {
                let err = confirmation_failure(err);
                if !player.on_failed(&ticket, &err) {
                    return Ok(LoadOutcome::Stale);
                }
                return Err(err);
            }
        }

        debug!("fetching {} / {}", ticket.track_id, ticket.blob_id);
        match self.backend.fetch_bytes(&ticket.track_id, Some(&ticket.blob_id)) {
            Ok(audio) => {
                if !player.on_fetched(&ticket, audio) {
                    return Ok(LoadOutcome::Stale);
                }
            }
            Err(err) => {
                let err = fetch_failure(err);
                if !player.on_failed(&ticket, &err) {
                    return Ok(LoadOutcome::Stale);
                }
                return Err(err);
            }
        }

        Ok(LoadOutcome::Ready)
    }
}

/// Any failure during the confirm step is a failed confirmation.
fn confirmation_failure(err: GatewayError) -> GatewayError {
    match err {
        GatewayError::ConfirmationFailed(_) => err,
        other => GatewayError::ConfirmationFailed(other.to_string()),
    }
}

fn fetch_failure(err: GatewayError) -> GatewayError {
    match err {
        GatewayError::FetchFailed(_) => err,
        other => GatewayError::FetchFailed(other.to_string()),
    }
}
