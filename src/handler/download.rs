//! Download handler: sends a stored file back as an attachment

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;

use super::error_response;
use crate::config::AppState;
use crate::error::TransferError;
use crate::{http, logger};

/// Serve `/download/{raw_name}`, where `raw_name` is still percent-encoded
pub async fn serve(
    state: &AppState,
    raw_name: &str,
    is_head: bool,
    peer_addr: &SocketAddr,
) -> Response<Full<Bytes>> {
    let Ok(name) = percent_decode_str(raw_name).decode_utf8() else {
        return error_response(&TransferError::not_found(raw_name));
    };

    match state.storage.read(&name).await {
        Ok(data) => {
            logger::log_download(&name, data.len(), peer_addr);
            http::build_attachment_response(data, &name, is_head)
        }
        Err(err) => error_response(&err),
    }
}
