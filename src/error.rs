//! Error types for request handling.

use hyper::StatusCode;
use thiserror::Error;

/// Failure of a transfer operation, converted to an HTTP status at the handler boundary.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Malformed request: missing file field, empty or unusable filename, broken multipart.
    #[error("{0}")]
    BadRequest(String),

    /// Download target absent or outside the storage directory.
    #[error("{0}")]
    NotFound(String),

    /// Request body exceeds the configured size cap.
    #[error("Payload too large (max {max} bytes)")]
    PayloadTooLarge { max: u64 },

    /// Disk I/O failure while writing or reading a stored file.
    #[error("Internal error: {0}")]
    Internal(#[from] std::io::Error),
}

impl TransferError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(name: &str) -> Self {
        Self::NotFound(format!("File not found: {name}"))
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure is the server's fault rather than the client's
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<multer::Error> for TransferError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit } | multer::Error::FieldSizeExceeded { limit, .. } => {
                Self::PayloadTooLarge { max: limit }
            }
            other => Self::BadRequest(format!("Malformed multipart body: {other}")),
        }
    }
}
