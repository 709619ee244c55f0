use chrono::{DateTime, Local, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{BlobId, TrackId};

/// Represent an uploaded track, as listed by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Primary identifier, used for confirmation and streaming.
    pub object_id: TrackId,
    pub blob_id: BlobId,
    pub mime_type: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub artist_id: String,
    #[serde(default)]
    pub on_chain_object_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub artist: Artist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub wallet_address: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Catalog reply of `/lookup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackListing {
    #[serde(default)]
    pub success: bool,
    /// Rows that do not parse are skipped, not fatal.
    #[serde(default, deserialize_with = "tolerant_tracks")]
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn tolerant_tracks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Track>, D::Error> {
    let rows = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();

    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<Track>(row) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("skipping catalog row {index}: {e}");
                None
            }
        })
        .collect())
}

impl Track {
    pub fn size_mb(&self) -> f64 {
        self.file_size as f64 / 1024.0 / 1024.0
    }

    pub fn uploaded_on(&self) -> String {
        DateTime::<Local>::from(self.uploaded_at)
            .format("%Y-%m-%d")
            .to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn mock_track(object_id: &str, blob_id: &str) -> Track {
        Track {
            id: format!("row-{object_id}"),
            title: format!("Track {object_id}"),
            object_id: TrackId::parse(object_id).unwrap(),
            blob_id: BlobId::parse(blob_id).unwrap(),
            mime_type: "audio/mpeg".to_string(),
            file_size: 2048,
            uploaded_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            artist_id: "artist-1".to_string(),
            on_chain_object_id: Some("0xwalrus".to_string()),
            created_at: None,
            artist: Artist {
                id: "artist-1".to_string(),
                wallet_address: "0xcfab".to_string(),
                created_at: None,
            },
        }
    }

    #[test]
    fn test_parse_backend_track_json() -> anyhow::Result<()> {
        let json = r#"{
            "id": "1",
            "title": "Night Drive",
            "objectId": "0xobject",
            "blobId": "blob-42",
            "mimeType": "audio/mpeg",
            "fileSize": 3145728,
            "uploadedAt": "2024-11-02T10:15:00.000Z",
            "artistId": "a1",
            "onChainObjectId": "0xonchain",
            "createdAt": "2024-11-02T10:15:01.000Z",
            "artist": {
                "id": "a1",
                "walletAddress": "0xcfab",
                "createdAt": "2024-10-01T00:00:00.000Z"
            }
        }"#;

        let track: Track = serde_json::from_str(json)?;

        assert_eq!(track.object_id.as_str(), "0xobject");
        assert_eq!(track.blob_id.as_str(), "blob-42");
        assert_eq!(track.artist.wallet_address, "0xcfab");
        assert!((track.size_mb() - 3.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn test_listing_skips_malformed_rows() -> anyhow::Result<()> {
        let good = serde_json::to_value(mock_track("good", "blob-good"))?;
        let mut empty_blob = serde_json::to_value(mock_track("bad", "blob-bad"))?;
        empty_blob["blobId"] = "".into();
        let mut bad_date = serde_json::to_value(mock_track("late", "blob-late"))?;
        bad_date["uploadedAt"] = "yesterday".into();

        let listing: TrackListing = serde_json::from_value(serde_json::json!({
            "success": true,
            "tracks": [empty_blob, good, bad_date]
        }))?;

        assert!(listing.success);
        assert_eq!(listing.tracks.len(), 1);
        assert_eq!(listing.tracks[0].object_id.as_str(), "good");
        Ok(())
    }

    #[test]
    fn test_listing_with_null_tracks_is_empty() -> anyhow::Result<()> {
        let listing: TrackListing =
            serde_json::from_str(r#"{"success": true, "tracks": null}"#)?;
        assert!(listing.tracks.is_empty());
        Ok(())
    }

    #[test]
    fn test_track_without_blob_is_rejected() {
        let json = r#"{
            "id": "1", "title": "t", "objectId": "0xobject", "blobId": "",
            "mimeType": "audio/mpeg", "fileSize": 1,
            "uploadedAt": "2024-11-02T10:15:00Z",
            "artist": { "id": "a1", "walletAddress": "0x1" }
        }"#;

        assert!(serde_json::from_str::<Track>(json).is_err());
    }
}
