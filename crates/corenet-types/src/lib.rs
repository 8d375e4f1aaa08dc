// Path: crates/corenet-types/src/lib.rs
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

//! # corenet-types
//!
//! Core data structures shared across the corenet platform SDK: node
//! addresses, cluster GUUIDs, the replicated store-object model, its wire
//! packet envelope, and the typed configuration value used by the config
//! loader and the JSON-RPC admin channel.

pub mod addr;
pub mod config_value;
pub mod error;
pub mod guuid;
pub mod packet;
pub mod store;
pub mod u256;

pub use addr::NodeAddress;
pub use config_value::ConfigValue;
pub use error::CoreError;
pub use guuid::Guuid;
pub use packet::GdbPacket;
pub use store::{DriverHash, OpType, StoreFlags, StoreObject};
pub use u256::U256;
