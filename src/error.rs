use poem::error::ResponseError;
use poem::http::StatusCode;
use poem::Response;
use poem_openapi::Object;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::StoreError;
use crate::media::MediaTypeError;
use crate::storage::StorageError;

/// JSON body of every error response.
#[derive(Debug, Serialize, Object)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl ToString) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Why an upload request was rejected. Each one ends the request.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid video id: {0}")]
    InvalidIdentifier(String),

    #[error("Couldn't find JWT")]
    MissingCredential,

    #[error("Couldn't validate JWT: {0}")]
    InvalidCredential(String),

    /// Reads the same as `Forbidden` so callers can't tell which ids exist.
    #[error("Unauthorized action by user")]
    RecordNotFound,

    #[error("Couldn't get video: {0}")]
    StoreUnavailable(String),

    #[error("Unauthorized action by user")]
    Forbidden,

    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Malformed multipart payload: {0}")]
    MalformedMultipart(String),

    #[error("Invalid content type: {0}")]
    UnsupportedMediaType(#[from] MediaTypeError),

    #[error("Couldn't store asset: {0}")]
    Storage(#[from] StorageError),

    #[error("Couldn't update video: {0}")]
    UpdateFailed(String),
}

impl From<AuthError> for UploadError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredential => UploadError::MissingCredential,
            AuthError::InvalidCredential(msg) => UploadError::InvalidCredential(msg),
        }
    }
}

impl From<StoreError> for UploadError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => UploadError::RecordNotFound,
            StoreError::Unavailable(msg) => UploadError::StoreUnavailable(msg),
        }
    }
}

impl ResponseError for UploadError {
    fn status(&self) -> StatusCode {
        match self {
            UploadError::InvalidIdentifier(_)
            | UploadError::MalformedMultipart(_)
            | UploadError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            UploadError::MissingCredential
            | UploadError::InvalidCredential(_)
            | UploadError::RecordNotFound
            | UploadError::Forbidden => StatusCode::UNAUTHORIZED,
            UploadError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::StoreUnavailable(_)
            | UploadError::Storage(_)
            | UploadError::UpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_response(&self) -> Response {
        let body = serde_json::to_string(&ErrorBody::new(self))
            .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string());
        Response::builder()
            .status(self.status())
            .content_type("application/json; charset=utf-8")
            .body(body)
    }
}
