use serde::{Deserialize, Serialize};

use super::ids::Digest;
use crate::error::GatewayError;

pub const CONFIRM_FAILED: &str = "Failed to confirm stream";

/// Body of a confirmation reply, as sent by the backend and by our gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmationResult {
    #[serde(default)]
    pub success: bool,
    /// The digest, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConfirmationResult {
    pub fn granted(digest: &Digest) -> Self {
        Self {
            success: true,
            message: Some(digest.0.clone()),
            error: None,
        }
    }

    pub fn denied(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    /// A reply only grants access if it says so and carries a digest.
    pub fn into_digest(self) -> Result<Digest, GatewayError> {
        match (self.success, self.message) {
            (true, Some(digest)) if !digest.is_empty() => Ok(Digest(digest)),
            (true, _) => Err(GatewayError::ConfirmationFailed(
                "confirmation carried no digest".to_string(),
            )),
            (false, _) => Err(GatewayError::ConfirmationFailed(
                self.error.unwrap_or_else(|| CONFIRM_FAILED.to_string()),
            )),
        }
    }
}
