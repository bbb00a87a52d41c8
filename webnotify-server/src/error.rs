//! HTTP error handling

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use webnotify_hub::HubError;

/// Request-level failure reported to the caller as plain text
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no message found in GET request")]
    MissingMessage,

    #[error("could not decode message")]
    Undecodable,

    #[error("error reading body")]
    UnreadableBody,

    #[error("message body too large")]
    BodyTooLarge,

    #[error("invalid HTTP method")]
    InvalidMethod,

    #[error("invalid API call")]
    InvalidApiCall,

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingMessage | ApiError::Undecodable => StatusCode::BAD_REQUEST,
            ApiError::UnreadableBody => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InvalidApiCall => StatusCode::NOT_FOUND,
            ApiError::Hub(HubError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Hub(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
