//! Request handler module
//!
//! Routes requests to the index, upload, download and health handlers.

mod download;
mod index;
pub mod page;
pub mod router;
mod upload;

// Re-export main entry point
pub use router::handle_request;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::error::TransferError;
use crate::{http, logger};

/// Convert a handler failure into its response, logging server-side faults as errors
fn error_response(err: &TransferError) -> Response<Full<Bytes>> {
    if err.is_internal() {
        logger::log_error(&err.to_string());
    } else {
        logger::log_warning(&err.to_string());
    }
    http::build_error_response(err)
}
