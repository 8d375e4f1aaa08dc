// Path: crates/corenet-rpc/src/lib.rs
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

//! # corenet-rpc
//!
//! The CLI/JSON-RPC admin channel (§4.5): a per-connection request
//! framer, loopback/Unix-domain-first access control with per-IP rate
//! limiting, a command+alias registry, detached-thread dispatch that
//! assembles an HTTP-like reply with a JSON-RPC body, and the TCP/
//! Unix-domain listeners that drive all of it over a real socket.

mod access;
mod conn;
mod dispatch;
mod error;
mod protocol;
mod ratelimit;
mod registry;
mod response;
mod server;

pub use access::{AccessControl, AccessDecision, PeerKind};
pub use conn::{ConnState, RequestParser};
pub use dispatch::{Dispatcher, DynamicHeaderProvider, StatsCallback};
pub use error::RpcError;
pub use protocol::{build_response_body, CommandError, CommandResult, JsonRpcRequest, ResponseValue};
pub use ratelimit::RateLimiter;
pub use registry::{CommandEntry, CommandHandler, CommandRegistry};
pub use response::build_http_response;
pub use server::{serve_tcp, serve_unix};
