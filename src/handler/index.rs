//! Index handler: the upload form and the list of stored files

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::error_response;
use super::page::{self, Banner};
use crate::config::AppState;
use crate::http;

pub async fn serve(state: &AppState, query: Option<&str>, is_head: bool) -> Response<Full<Bytes>> {
    match state.storage.list().await {
        Ok(files) => {
            let banner = Banner::from_query(query);
            http::build_html_response(page::render_index(&files, banner.as_ref()), is_head)
        }
        Err(err) => error_response(&err),
    }
}
