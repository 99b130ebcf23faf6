//! Core traits for yaddns
//!
//! - [`HttpTransport`]: issue GET/POST requests and return the response body

pub mod http_transport;

pub use http_transport::{
    DEFAULT_HTTP_TIMEOUT, FORM_CONTENT_TYPE, HttpMethod, HttpRequest, HttpTransport,
    PDD_TOKEN_HEADER, USER_AGENT,
};
