use std::time::Duration;

use anyhow::anyhow;
use log::{debug, warn};
use reqwest::{blocking::Client, header::CONTENT_TYPE};
use serde_json::json;

use super::{AudioBytes, Backend, Catalog};
use crate::{
    config::BackendConfig,
    domain::{
        confirmation::{CONFIRM_FAILED, ConfirmationResult},
        ids::{BlobId, Digest, TrackId},
        track::{Track, TrackListing},
        upload::UploadPayload,
    },
    error::GatewayError,
};

/// Talks to the audio backend over plain HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        Self::with_base_url(config.base_url(), Duration::from_secs(config.timeout_secs))
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unknown(anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Backend for HttpBackend {
    fn confirm_access(&self, track_id: &TrackId) -> Result<Digest, GatewayError> {
        debug!("POST /confirm-stream trackId={track_id}");

        let response = self
            .client
            .post(self.url("/confirm-stream"))
            .json(&json!({ "trackId": track_id }))
            .send()
            .map_err(|e| GatewayError::from_transport(e, GatewayError::ConfirmationFailed))?;

        let status = response.status();
        let reply = response.json::<ConfirmationResult>();

        if !status.is_success() {
            warn!("confirm-stream for {track_id} answered {status}");
            let error = reply
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| CONFIRM_FAILED.to_string());
            return Err(GatewayError::ConfirmationFailed(error));
        }

        reply
            .map_err(|e| GatewayError::ConfirmationFailed(format!("invalid confirmation reply: {e}")))?
            .into_digest()
    }

    fn fetch_bytes(
        &self,
        track_id: &TrackId,
        blob_id: Option<&BlobId>,
    ) -> Result<AudioBytes, GatewayError> {
        debug!("GET /stream trackId={track_id} blobId={blob_id:?}");

        let mut query = vec![("trackId", track_id.as_str())];
        if let Some(blob_id) = blob_id {
            query.push(("blobId", blob_id.as_str()));
        }

        let response = self
            .client
            .get(self.url("/stream"))
            .query(&query)
            .send()
            .map_err(|e| GatewayError::from_transport(e, GatewayError::FetchFailed))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::FetchFailed(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response
            .bytes()
            .map_err(|e| GatewayError::from_transport(e, GatewayError::FetchFailed))?
            .to_vec();

        debug!("stream {track_id}: {} bytes, type {content_type:?}", data.len());
        Ok(AudioBytes { content_type, data })
    }

    fn upload(&self, payload: &UploadPayload) -> Result<serde_json::Value, GatewayError> {
        debug!(
            "POST /upload title={:?} file={} ({} bytes)",
            payload.title, payload.metadata.filename, payload.metadata.file_size
        );

        let response = self
            .client
            .post(self.url("/upload"))
            .json(payload)
            .send()
            .map_err(|e| GatewayError::from_transport(e, |m| GatewayError::Unknown(anyhow!(m))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unknown(anyhow!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .map_err(|e| GatewayError::Unknown(anyhow!("invalid upload reply: {e}")))
    }
}

impl Catalog for HttpBackend {
    fn list_tracks(&self) -> Result<Vec<Track>, GatewayError> {
        debug!("GET /lookup");

        let response = self
            .client
            .get(self.url("/lookup"))
            .send()
            .map_err(|e| GatewayError::from_transport(e, |m| GatewayError::Unknown(anyhow!(m))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unknown(anyhow!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let listing: TrackListing = response
            .json()
            .map_err(|e| GatewayError::Unknown(anyhow!("invalid lookup reply: {e}")))?;

        if !listing.success {
            return Err(GatewayError::Unknown(anyhow!(
                listing
                    .error
                    .unwrap_or_else(|| "Failed to fetch tracks".to_string())
            )));
        }

        Ok(listing.tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{track::tests::mock_track, upload::UploadMetadata};

    use rouille::{Request, Response};
    use std::{
        net::TcpListener,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
            mpsc::Sender,
        },
    };

    /// A throwaway backend on an ephemeral port, stopped on drop.
    struct FakeBackend {
        backend: HttpBackend,
        stop: Sender<()>,
    }

    impl Drop for FakeBackend {
        fn drop(&mut self) {
            let _ = self.stop.send(());
        }
    }

    fn fake_backend<F>(handler: F) -> FakeBackend
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let server = rouille::Server::new("127.0.0.1:0", handler).unwrap();
        let addr = server.server_addr();
        let (_handle, stop) = server.stoppable();

        FakeBackend {
            backend: HttpBackend::with_base_url(format!("http://{addr}"), Duration::from_secs(5))
                .unwrap(),
            stop,
        }
    }

    fn track_id(raw: &str) -> TrackId {
        TrackId::parse(raw).unwrap()
    }

    #[test]
    fn test_confirm_returns_digest() -> anyhow::Result<()> {
        let fake = fake_backend(|request| {
            let body: serde_json::Value = rouille::input::json_input(request).unwrap();
            assert_eq!(request.url(), "/confirm-stream");
            assert_eq!(body["trackId"], "abc");
            Response::json(&json!({ "success": true, "message": "0xdigest" }))
        });

        let digest = fake.backend.confirm_access(&track_id("abc"))?;

        assert_eq!(digest.as_str(), "0xdigest");
        Ok(())
    }

    #[test]
    fn test_confirm_denied_carries_backend_error() {
        let fake = fake_backend(|_| {
            Response::json(&json!({ "success": false, "error": "not authorized" }))
                .with_status_code(403)
        });

        let err = fake.backend.confirm_access(&track_id("abc")).unwrap_err();

        assert!(matches!(err, GatewayError::ConfirmationFailed(ref m) if m == "not authorized"));
    }

    #[test]
    fn test_confirm_non_json_failure_is_generic() {
        let fake = fake_backend(|_| Response::text("boom").with_status_code(500));

        let err = fake.backend.confirm_access(&track_id("abc")).unwrap_err();

        assert_eq!(err.to_string(), CONFIRM_FAILED);
    }

    #[test]
    fn test_fetch_bytes_sends_both_ids() -> anyhow::Result<()> {
        let fake = fake_backend(|request| {
            assert_eq!(request.get_param("trackId").as_deref(), Some("abc"));
            assert_eq!(request.get_param("blobId").as_deref(), Some("blob-1"));
            Response::from_data("audio/ogg", vec![7u8; 2048])
        });

        let blob = BlobId::parse("blob-1")?;
        let audio = fake.backend.fetch_bytes(&track_id("abc"), Some(&blob))?;

        assert_eq!(audio.data.len(), 2048);
        assert_eq!(audio.content_type.as_deref(), Some("audio/ogg"));
        Ok(())
    }

    #[test]
    fn test_fetch_bytes_without_blob_omits_param() -> anyhow::Result<()> {
        let fake = fake_backend(|request| {
            assert!(request.get_param("blobId").is_none());
            Response::from_data("audio/mpeg", b"x".to_vec())
        });

        let audio = fake.backend.fetch_bytes(&track_id("abc"), None)?;

        assert_eq!(audio.data, b"x");
        Ok(())
    }

    #[test]
    fn test_fetch_bytes_error_status() {
        let fake = fake_backend(|_| Response::empty_404());

        let err = fake.backend.fetch_bytes(&track_id("abc"), None).unwrap_err();

        assert!(matches!(err, GatewayError::FetchFailed(ref m) if m.contains("404")));
    }

    #[test]
    fn test_list_tracks() -> anyhow::Result<()> {
        let fake = fake_backend(|_| {
            Response::json(&TrackListing {
                success: true,
                tracks: vec![mock_track("a", "blob-a"), mock_track("b", "blob-b")],
                error: None,
            })
        });

        let tracks = fake.backend.list_tracks()?;

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].blob_id.as_str(), "blob-b");
        Ok(())
    }

    #[test]
    fn test_list_tracks_keeps_valid_rows() -> anyhow::Result<()> {
        let fake = fake_backend(|_| {
            let mut broken = serde_json::to_value(mock_track("b", "blob-b")).unwrap();
            broken["blobId"] = json!("");
            Response::json(&json!({
                "success": true,
                "tracks": [mock_track("a", "blob-a"), broken, mock_track("c", "blob-c")]
            }))
        });

        let tracks = fake.backend.list_tracks()?;

        let ids: Vec<&str> = tracks.iter().map(|t| t.object_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        Ok(())
    }

    #[test]
    fn test_list_tracks_unsuccessful() {
        let fake = fake_backend(|_| Response::json(&json!({ "success": false, "error": "db down" })));

        let err = fake.backend.list_tracks().unwrap_err();

        assert_eq!(err.to_string(), "db down");
    }

    #[test]
    fn test_upload_relays_reply() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let fake = fake_backend(move |request| {
            seen.fetch_add(1, Ordering::SeqCst);
            let payload: UploadPayload = rouille::input::json_input(request).unwrap();
            Response::json(&json!({ "success": true, "title": payload.title }))
        });

        let payload = UploadPayload {
            audio: "eA==".to_string(),
            title: "Night Drive".to_string(),
            artist_address: "0xcfab".to_string(),
            metadata: UploadMetadata {
                filename: "a.mp3".to_string(),
                file_size: 1,
                mime_type: "audio/mpeg".to_string(),
                uploaded_at: "2024-01-01T00:00:00.000Z".to_string(),
            },
        };
        let reply = fake.backend.upload(&payload)?;

        assert_eq!(reply["title"], "Night Drive");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_unreachable_backend_is_upstream_unavailable() -> anyhow::Result<()> {
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let backend =
            HttpBackend::with_base_url(format!("http://127.0.0.1:{port}/"), Duration::from_secs(2))?;

        let err = backend.confirm_access(&track_id("abc")).unwrap_err();

        assert!(matches!(err, GatewayError::UpstreamUnavailable(_)));
        Ok(())
    }
}
