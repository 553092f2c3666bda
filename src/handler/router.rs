//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for route matching,
//! method validation, response decoration and access logging.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{download, index, upload};
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};

const DOWNLOAD_PREFIX: &str = "/download/";

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let started = Instant::now();
    let mut entry = AccessLogEntry::from_request(
        &peer_addr,
        req.method(),
        req.uri(),
        req.version(),
        req.headers(),
    );

    let mut response = route_request(req, &state, &peer_addr).await;

    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    if state.access_log_enabled() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(
    req: Request<B>,
    state: &AppState,
    peer_addr: &SocketAddr,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let is_read = method == Method::GET || method == Method::HEAD;
    let is_head = method == Method::HEAD;

    // Health check endpoints
    let health = &state.config.health;
    if health.enabled && is_read {
        if path == health.liveness_path {
            return http::build_health_response(StatusCode::OK, "ok");
        }
        if path == health.readiness_path {
            return if state.storage.is_available().await {
                http::build_health_response(StatusCode::OK, "ok")
            } else {
                http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
            };
        }
    }

    if let Some(raw_name) = path.strip_prefix(DOWNLOAD_PREFIX) {
        return if is_read {
            download::serve(state, raw_name, is_head, peer_addr).await
        } else {
            http::build_405_response("GET, HEAD")
        };
    }

    match (method, path.as_str()) {
        (Method::GET | Method::HEAD, "/") => index::serve(state, req.uri().query(), is_head).await,
        (Method::POST, "/" | "/upload") => upload::handle(req, state, peer_addr).await,
        (_, "/") => http::build_405_response("GET, HEAD, POST"),
        (_, "/upload") => http::build_405_response("POST"),
        _ => http::build_404_response(),
    }
}
