// Path: crates/corenet-stream/src/http/mod.rs
//! A single HTTP/1.1 request/response over a plain TCP transport. TLS is
//! accepted as a request flag but returns [`HttpError::TlsUnavailable`]:
//! this build carries no TLS crate, matching the spec's own
//! "support https only if SSL is available" conditional.

mod client;
mod parse;

pub use client::{send, HttpClientConfig, HttpError, HttpMethod, HttpRequest, HttpResponse};
