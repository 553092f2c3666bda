//! Upload handler: stores the `file` field of a multipart form

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{HeaderMap, Request, Response, StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use std::net::SocketAddr;

use super::error_response;
use crate::config::AppState;
use crate::error::TransferError;
use crate::storage::sanitize_filename;
use crate::{http, logger};

/// Form field carrying the uploaded file
const FILE_FIELD: &str = "file";

pub const UPLOAD_SUCCESS: &str = "File uploaded successfully";

/// A file written to storage by an upload
#[derive(Debug)]
pub struct StoredUpload {
    pub name: String,
    pub bytes: u64,
}

pub async fn handle<B>(
    req: Request<B>,
    state: &AppState,
    peer_addr: &SocketAddr,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    match receive_upload(req, state).await {
        Ok(stored) => {
            logger::log_upload_stored(&stored.name, stored.bytes, peer_addr);
            http::build_text_response(StatusCode::OK, UPLOAD_SUCCESS)
        }
        Err(err) => error_response(&err),
    }
}

/// Stream the first `file` field of the form into storage
///
/// Fields with other names, and a `file` field that is not a file part,
/// are skipped.
pub async fn receive_upload<B>(req: Request<B>, state: &AppState) -> Result<StoredUpload, TransferError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let max_body_size = state.config.http.max_body_size;
    check_body_size(req.headers(), max_body_size)?;
    let boundary = multipart_boundary(req.headers())?;

    let stream = req.into_body().into_data_stream();
    let mut multipart = match max_body_size {
        Some(max) => Multipart::with_constraints(
            stream,
            boundary,
            Constraints::new().size_limit(SizeLimit::new().whole_stream(max)),
        ),
        None => Multipart::new(stream, boundary),
    };

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(raw_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        if raw_name.is_empty() {
            return Err(TransferError::bad_request("No selected file"));
        }
        let name = sanitize_filename(&raw_name).ok_or_else(|| {
            TransferError::bad_request(format!("Invalid file name: {raw_name}"))
        })?;

        let mut pending = state.storage.create(&name).await?;
        while let Some(chunk) = field.chunk().await? {
            pending.write_chunk(&chunk).await?;
        }
        let bytes = pending.commit().await?;

        return Ok(StoredUpload { name, bytes });
    }

    Err(TransferError::bad_request("No file part"))
}

/// Reject requests whose declared Content-Length exceeds the configured cap
fn check_body_size(headers: &HeaderMap, max_body_size: Option<u64>) -> Result<(), TransferError> {
    let Some(max) = max_body_size else {
        return Ok(());
    };
    let Some(content_length) = headers.get(CONTENT_LENGTH) else {
        return Ok(());
    };

    match content_length.to_str().ok().map(str::parse::<u64>) {
        Some(Ok(size)) if size > max => Err(TransferError::PayloadTooLarge { max }),
        Some(Ok(_)) => Ok(()),
        _ => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            Ok(())
        }
    }
}

fn multipart_boundary(headers: &HeaderMap) -> Result<String, TransferError> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| TransferError::bad_request("Expected a multipart/form-data body"))
}
