use chrono::Utc;
use log::{debug, info};
use rouille::{Request, Response, input::post::BufferedFile};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    config::HttpConfig,
    domain::{
        confirmation::ConfirmationResult,
        ids::{BlobId, TrackId},
        track::TrackListing,
        upload::{AudioFile, UploadPayload},
    },
    error::GatewayError,
    http::error::ApiError,
    upstream::{Backend, Catalog, DEFAULT_AUDIO_MIME, Upstream},
};

/// Forwards `/confirm`, `/stream`, `/lookup` and `/upload` to the backend.
pub struct GatewayServer {
    upstream: Arc<dyn Upstream>,
    pub config: HttpConfig,
}

#[derive(Deserialize)]
struct ConfirmRequest {
    #[serde(rename = "trackId", default)]
    track_id: Option<String>,
}

impl GatewayServer {
    pub fn new(upstream: Arc<dyn Upstream>, config: HttpConfig) -> Self {
        Self { upstream, config }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (POST) (/confirm) => {
                self.handle_confirm(request)
            },
            (GET) (/stream) => {
                self.handle_stream(request)
            },
            (GET) (/lookup) => {
                self.handle_lookup()
            },
            (POST) (/upload) => {
                self.handle_upload(request)
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.raw_url());
    }

    fn confirm(&self, request: &Request) -> Result<Response, ApiError> {
        let body: ConfirmRequest = rouille::input::json_input(request)
            .map_err(|_| GatewayError::invalid_input("trackId is required"))?;
        let track_id = TrackId::parse(body.track_id.as_deref().unwrap_or_default())?;

        match self.upstream.confirm_access(&track_id) {
            Ok(digest) => Ok(Response::json(&ConfirmationResult::granted(&digest))),
            Err(GatewayError::ConfirmationFailed(msg)) => {
                Ok(Response::json(&ConfirmationResult::denied(msg)).with_status_code(502))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn handle_confirm(&self, request: &Request) -> Response {
        self.confirm(request).unwrap_or_else(ApiError::into_response)
    }

    /// Both ids are checked before anything goes upstream.
    fn stream(&self, request: &Request) -> Result<Response, ApiError> {
        let required = || GatewayError::invalid_input("trackId and blobId are required");
        let track_id = request
            .get_param("trackId")
            .and_then(|raw| TrackId::parse(&raw).ok())
            .ok_or_else(required)?;
        let blob_id = request
            .get_param("blobId")
            .and_then(|raw| BlobId::parse(&raw).ok())
            .ok_or_else(required)?;

        let audio = self.upstream.fetch_bytes(&track_id, Some(&blob_id))?;
        let content_type = audio
            .content_type
            .unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string());
        debug!(
            "STREAM {} -> 200 OK, {} bytes, MIME type: {}",
            track_id,
            audio.data.len(),
            content_type
        );

        Ok(Response::from_data(content_type, audio.data))
    }

    fn handle_stream(&self, request: &Request) -> Response {
        self.stream(request).unwrap_or_else(ApiError::into_response)
    }

    fn handle_lookup(&self) -> Response {
        match self.upstream.list_tracks() {
            Ok(tracks) => Response::json(&TrackListing {
                success: true,
                tracks,
                error: None,
            }),
            Err(e) => ApiError::from(e).into_response(),
        }
    }

    /// Accepts a multipart form (`audio`, `title`, `artist_address`) or a
    /// ready-made JSON payload.
    fn parse_upload(request: &Request) -> Result<UploadPayload, ApiError> {
        let is_json = request
            .header("Content-Type")
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let payload: UploadPayload = rouille::input::json_input(request)
                .map_err(|e| ApiError::BadRequest(format!("invalid upload body: {e}")))?;
            if payload.audio.is_empty() {
                return Err(GatewayError::invalid_input("No audio file provided").into());
            }
            return Ok(payload);
        }

        let form = rouille::post_input!(request, {
            audio: Option<BufferedFile>,
            title: Option<String>,
            artist_address: Option<String>,
        })
        .map_err(|e| ApiError::BadRequest(format!("invalid upload form: {e}")))?;

        let audio = form
            .audio
            .ok_or_else(|| GatewayError::invalid_input("No audio file provided"))?;
        let file = AudioFile {
            filename: audio.filename.unwrap_or_else(|| "audio".to_string()),
            mime: Some(audio.mime),
            data: audio.data,
        };

        Ok(UploadPayload::new(
            file,
            form.title.as_deref().unwrap_or_default(),
            form.artist_address.as_deref().unwrap_or_default(),
            Utc::now(),
        )?)
    }

    fn upload(&self, request: &Request) -> Result<Response, ApiError> {
        let payload = Self::parse_upload(request)?;
        info!(
            "upload {:?} by {} ({}, {} bytes)",
            payload.title,
            payload.artist_address,
            payload.metadata.mime_type,
            payload.metadata.file_size
        );
        let reply = self.upstream.upload(&payload)?;
        Ok(Response::json(&reply))
    }

    fn handle_upload(&self, request: &Request) -> Response {
        self.upload(request).unwrap_or_else(ApiError::into_response)
    }
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
