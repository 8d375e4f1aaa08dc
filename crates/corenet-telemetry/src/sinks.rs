// Path: crates/corenet-telemetry/src/sinks.rs
//! Abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Installs the process-wide metrics sink. Returns `false` if a sink was
/// already installed (idempotent, matching the rest of the core's
/// register-once conventions).
pub fn install(sink: &'static dyn MetricsSink) -> bool {
    SINK.set(sink).is_ok()
}

/// Returns a static reference to the configured reactor metrics sink.
pub fn reactor_metrics() -> &'static dyn ReactorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured transport/obfuscation sink.
pub fn transport_metrics() -> &'static dyn TransportMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured cluster/link sink.
pub fn cluster_metrics() -> &'static dyn ClusterMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured global-DB sink.
pub fn gdb_metrics() -> &'static dyn GdbMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured RPC admin channel sink.
pub fn rpc_metrics() -> &'static dyn RpcMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Metrics for the worker/reactor layer.
pub trait ReactorMetricsSink: Send + Sync + std::fmt::Debug {
    fn set_event_sockets(&self, worker: &str, count: i64);
    fn inc_activity_timeouts(&self, worker: &str);
    fn inc_reassignments(&self);
}
impl ReactorMetricsSink for NopSink {
    fn set_event_sockets(&self, _worker: &str, _count: i64) {}
    fn inc_activity_timeouts(&self, _worker: &str) {}
    fn inc_reassignments(&self) {}
}

/// Metrics for the transport registry and obfuscation engine.
pub trait TransportMetricsSink: Send + Sync + std::fmt::Debug {
    fn inc_bytes_obfuscated(&self, transport: &str, bytes: u64);
    fn inc_fake_packets(&self, transport: &str);
    fn inc_padding_bytes(&self, transport: &str, bytes: u64);
}
impl TransportMetricsSink for NopSink {
    fn inc_bytes_obfuscated(&self, _transport: &str, _bytes: u64) {}
    fn inc_fake_packets(&self, _transport: &str) {}
    fn inc_padding_bytes(&self, _transport: &str, _bytes: u64) {}
}

/// Metrics for cluster membership and the link manager.
pub trait ClusterMetricsSink: Send + Sync + std::fmt::Debug {
    fn set_links_established(&self, network: &str, count: i64);
    fn inc_link_attempts(&self, network: &str);
    fn inc_link_failures(&self, network: &str);
    fn set_cluster_members(&self, cluster: &str, count: i64);
}
impl ClusterMetricsSink for NopSink {
    fn set_links_established(&self, _network: &str, _count: i64) {}
    fn inc_link_attempts(&self, _network: &str) {}
    fn inc_link_failures(&self, _network: &str) {}
    fn set_cluster_members(&self, _cluster: &str, _count: i64) {}
}

/// Metrics for the global-DB driver and its sync/anti-entropy layer.
pub trait GdbMetricsSink: Send + Sync + std::fmt::Debug {
    fn inc_objects_applied(&self, group: &str);
    fn inc_objects_rejected(&self, group: &str, reason: &'static str);
    fn set_log_list_bytes(&self, peer: &str, bytes: i64);
}
impl GdbMetricsSink for NopSink {
    fn inc_objects_applied(&self, _group: &str) {}
    fn inc_objects_rejected(&self, _group: &str, _reason: &'static str) {}
    fn set_log_list_bytes(&self, _peer: &str, _bytes: i64) {}
}

/// Metrics for the CLI/JSON-RPC admin channel.
pub trait RpcMetricsSink: Send + Sync + std::fmt::Debug {
    fn observe_request_duration(&self, method: &str, duration_secs: f64);
    fn inc_requests_total(&self, method: &str, status_code: u16);
    fn inc_access_denied(&self);
}
impl RpcMetricsSink for NopSink {
    fn observe_request_duration(&self, _method: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _method: &str, _status_code: u16) {}
    fn inc_access_denied(&self) {}
}

/// A unified sink implementing every domain-specific trait; the single
/// point of implementation for a concrete metrics backend.
pub trait MetricsSink:
    ReactorMetricsSink + TransportMetricsSink + ClusterMetricsSink + GdbMetricsSink + RpcMetricsSink
{
}

impl<T> MetricsSink for T where
    T: ReactorMetricsSink + TransportMetricsSink + ClusterMetricsSink + GdbMetricsSink + RpcMetricsSink
{
}
