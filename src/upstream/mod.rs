//! Access to the external audio backend.
//!
//! The backend is consumed, not built: these traits are the seams the
//! coordinator and the gateway server depend on, and [`client::HttpBackend`]
//! is the one real implementation.

use crate::{
    domain::{
        ids::{BlobId, Digest, TrackId},
        track::Track,
        upload::UploadPayload,
    },
    error::GatewayError,
};

pub mod client;

pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// Raw audio bytes with the content type the backend declared.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBytes {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Access confirmation, byte retrieval and upload.
pub trait Backend {
    /// Grants access to a track and returns the receipt of the grant.
    fn confirm_access(&self, track_id: &TrackId) -> Result<Digest, GatewayError>;

    /// Retrieves the bytes of a track whose access was confirmed.
    fn fetch_bytes(
        &self,
        track_id: &TrackId,
        blob_id: Option<&BlobId>,
    ) -> Result<AudioBytes, GatewayError>;

    /// Stores a new track, returning the backend's reply verbatim.
    fn upload(&self, payload: &UploadPayload) -> Result<serde_json::Value, GatewayError>;
}

/// Lists the known tracks.
pub trait Catalog {
    fn list_tracks(&self) -> Result<Vec<Track>, GatewayError>;
}

/// Everything the gateway server forwards to.
pub trait Upstream: Backend + Catalog + Send + Sync {}

impl<T: Backend + Catalog + Send + Sync> Upstream for T {}
