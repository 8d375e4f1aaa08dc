// Path: crates/corenet-telemetry/src/lib.rs
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

//! # corenet-telemetry
//!
//! Observability infrastructure shared by every corenet crate: structured
//! logging initialization, a Prometheus metrics endpoint, and abstract
//! sinks that decouple instrumentation call sites from the metrics
//! backend.

/// A lightweight HTTP server for exposing `/metrics`, `/healthz`, and `/readyz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

pub use init::{init_tracing, LogFormat};
pub use sinks::{cluster_metrics, gdb_metrics, reactor_metrics, rpc_metrics, transport_metrics};
