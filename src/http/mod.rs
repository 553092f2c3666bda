//! HTTP protocol layer module
//!
//! Response builders and header helpers shared by the request handlers.

pub mod disposition;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_405_response, build_attachment_response, build_error_response,
    build_health_response, build_html_response, build_text_response,
};
