// Path: crates/corenet-stream/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # corenet-stream
//!
//! The stream abstraction (one event-socket, a transport, an optional
//! obfuscation engine) and the HTTP/1.1 client built on top of it (§4.4).

mod http;
mod stream;

pub use http::{send, HttpClientConfig, HttpError, HttpMethod, HttpRequest, HttpResponse};
pub use stream::Stream;
