use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// JSON body the backend expects on `/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    /// base64 encoded audio
    pub audio: String,
    pub title: String,
    pub artist_address: String,
    pub metadata: UploadMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub uploaded_at: String,
}

/// Raw audio file as received from a form or read from disk.
#[derive(Debug)]
pub struct AudioFile {
    pub filename: String,
    /// Declared MIME type, if the sender gave one.
    pub mime: Option<String>,
    pub data: Vec<u8>,
}

impl AudioFile {
    /// Declared type, else a guess from the file name.
    pub fn mime_type(&self) -> String {
        match self.mime.as_deref().map(str::trim) {
            Some(mime) if !mime.is_empty() && mime != "application/octet-stream" => {
                mime.to_string()
            }
            _ => mime_guess::from_path(&self.filename)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

impl UploadPayload {
    pub fn new(
        file: AudioFile,
        title: &str,
        artist_address: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Self, GatewayError> {
        if file.data.is_empty() {
            return Err(GatewayError::invalid_input("No audio file provided"));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(GatewayError::invalid_input(
                "Please enter a title for the audio file",
            ));
        }
        let artist_address = artist_address.trim();
        if artist_address.is_empty() {
            return Err(GatewayError::invalid_input("artist_address is required"));
        }

        let mime_type = file.mime_type();
        Ok(Self {
            audio: STANDARD.encode(&file.data),
            title: title.to_string(),
            artist_address: artist_address.to_string(),
            metadata: UploadMetadata {
                filename: file.filename,
                file_size: file.data.len() as u64,
                mime_type,
                uploaded_at: uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        })
    }
}
