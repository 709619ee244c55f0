use log::error;
use rouille::Response;
use serde_json::json;

use crate::error::GatewayError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidInput(msg) => ApiError::BadRequest(msg),

            GatewayError::ConfirmationFailed(msg) | GatewayError::FetchFailed(msg) => {
                ApiError::BadGateway(msg)
            }

            GatewayError::UpstreamUnavailable(_) => ApiError::BadGateway(err.to_string()),

            GatewayError::Unknown(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::BadGateway(_) => 502,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) | ApiError::BadGateway(msg) | ApiError::Internal(msg) => msg,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status_code();
        if status >= 500 {
            error!("{status}: {}", self.message());
        }
        Response::json(&json!({ "success": false, "error": self.message() }))
            .with_status_code(status)
    }
}
