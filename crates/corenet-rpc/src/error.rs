// Path: crates/corenet-rpc/src/error.rs
//! Error kinds for the admin channel's own plumbing (registry mutation,
//! header composition). Per-request parse/access/dispatch failures are
//! folded directly into an HTTP status or a JSON-RPC error body instead
//! of this enum — see [`crate::dispatch`].

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),
    #[error("alias '{0}' is already registered")]
    DuplicateAlias(String),
}
