// Path: crates/corenet-telemetry/src/prometheus.rs
//! Concrete implementation of every `*MetricsSink` backed by the `prometheus` crate.

use crate::sinks::{
    ClusterMetricsSink, GdbMetricsSink, ReactorMetricsSink, RpcMetricsSink, TransportMetricsSink,
};
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};

/// The process-wide Prometheus registration for corenet's metrics.
#[derive(Debug)]
pub struct PrometheusSink {
    event_sockets: IntGaugeVec,
    activity_timeouts: IntCounterVec,
    reassignments: IntCounterVec,
    bytes_obfuscated: IntCounterVec,
    fake_packets: IntCounterVec,
    padding_bytes: IntCounterVec,
    links_established: IntGaugeVec,
    link_attempts: IntCounterVec,
    link_failures: IntCounterVec,
    cluster_members: IntGaugeVec,
    objects_applied: IntCounterVec,
    objects_rejected: IntCounterVec,
    log_list_bytes: IntGaugeVec,
    request_duration: HistogramVec,
    requests_total: IntCounterVec,
    access_denied: IntCounterVec,
}

impl PrometheusSink {
    /// Registers every metric with the default Prometheus registry.
    pub fn new() -> Result<PrometheusSink, prometheus::Error> {
        Ok(PrometheusSink {
            event_sockets: register_int_gauge_vec!(
                "corenet_reactor_event_sockets",
                "Event-sockets owned by a worker",
                &["worker"]
            )?,
            activity_timeouts: register_int_counter_vec!(
                "corenet_reactor_activity_timeouts_total",
                "Event-sockets force-closed by the activity check",
                &["worker"]
            )?,
            reassignments: register_int_counter_vec!(
                "corenet_reactor_reassignments_total",
                "Event-sockets moved across workers",
                &["op"]
            )?,
            bytes_obfuscated: register_int_counter_vec!(
                "corenet_transport_bytes_obfuscated_total",
                "Bytes passed through the obfuscation engine",
                &["transport"]
            )?,
            fake_packets: register_int_counter_vec!(
                "corenet_transport_fake_packets_total",
                "Fake traffic-mixing packets generated",
                &["transport"]
            )?,
            padding_bytes: register_int_counter_vec!(
                "corenet_transport_padding_bytes_total",
                "Padding bytes appended by the obfuscation engine",
                &["transport"]
            )?,
            links_established: register_int_gauge_vec!(
                "corenet_cluster_links_established",
                "Links currently in the ESTABLISHED state, per network",
                &["network"]
            )?,
            link_attempts: register_int_counter_vec!(
                "corenet_cluster_link_attempts_total",
                "Outbound connect attempts, per network",
                &["network"]
            )?,
            link_failures: register_int_counter_vec!(
                "corenet_cluster_link_failures_total",
                "Failed outbound connect attempts, per network",
                &["network"]
            )?,
            cluster_members: register_int_gauge_vec!(
                "corenet_cluster_members",
                "Current member count, per cluster",
                &["cluster"]
            )?,
            objects_applied: register_int_counter_vec!(
                "corenet_gdb_objects_applied_total",
                "Store objects applied by the global-DB driver",
                &["group"]
            )?,
            objects_rejected: register_int_counter_vec!(
                "corenet_gdb_objects_rejected_total",
                "Store objects rejected during sync apply",
                &["group", "reason"]
            )?,
            log_list_bytes: register_int_gauge_vec!(
                "corenet_gdb_log_list_bytes",
                "Resident bytes queued in a peer's log-list",
                &["peer"]
            )?,
            request_duration: register_histogram_vec!(
                "corenet_rpc_request_duration_seconds",
                "Latency of admin JSON-RPC requests",
                &["method"]
            )?,
            requests_total: register_int_counter_vec!(
                "corenet_rpc_requests_total",
                "Admin JSON-RPC requests, by method and HTTP status",
                &["method", "status"]
            )?,
            access_denied: register_int_counter_vec!(
                "corenet_rpc_access_denied_total",
                "Admin JSON-RPC requests rejected by access control",
                &[]
            )?,
        })
    }
}

impl ReactorMetricsSink for PrometheusSink {
    fn set_event_sockets(&self, worker: &str, count: i64) {
        self.event_sockets.with_label_values(&[worker]).set(count);
    }
    fn inc_activity_timeouts(&self, worker: &str) {
        self.activity_timeouts.with_label_values(&[worker]).inc();
    }
    fn inc_reassignments(&self) {
        self.reassignments.with_label_values(&["reassign"]).inc();
    }
}

impl TransportMetricsSink for PrometheusSink {
    fn inc_bytes_obfuscated(&self, transport: &str, bytes: u64) {
        self.bytes_obfuscated
            .with_label_values(&[transport])
            .inc_by(bytes);
    }
    fn inc_fake_packets(&self, transport: &str) {
        self.fake_packets.with_label_values(&[transport]).inc();
    }
    fn inc_padding_bytes(&self, transport: &str, bytes: u64) {
        self.padding_bytes
            .with_label_values(&[transport])
            .inc_by(bytes);
    }
}

impl ClusterMetricsSink for PrometheusSink {
    fn set_links_established(&self, network: &str, count: i64) {
        self.links_established
            .with_label_values(&[network])
            .set(count);
    }
    fn inc_link_attempts(&self, network: &str) {
        self.link_attempts.with_label_values(&[network]).inc();
    }
    fn inc_link_failures(&self, network: &str) {
        self.link_failures.with_label_values(&[network]).inc();
    }
    fn set_cluster_members(&self, cluster: &str, count: i64) {
        self.cluster_members.with_label_values(&[cluster]).set(count);
    }
}

impl GdbMetricsSink for PrometheusSink {
    fn inc_objects_applied(&self, group: &str) {
        self.objects_applied.with_label_values(&[group]).inc();
    }
    fn inc_objects_rejected(&self, group: &str, reason: &'static str) {
        self.objects_rejected
            .with_label_values(&[group, reason])
            .inc();
    }
    fn set_log_list_bytes(&self, peer: &str, bytes: i64) {
        self.log_list_bytes.with_label_values(&[peer]).set(bytes);
    }
}

impl RpcMetricsSink for PrometheusSink {
    fn observe_request_duration(&self, method: &str, duration_secs: f64) {
        self.request_duration
            .with_label_values(&[method])
            .observe(duration_secs);
    }
    fn inc_requests_total(&self, method: &str, status_code: u16) {
        self.requests_total
            .with_label_values(&[method, &status_code.to_string()])
            .inc();
    }
    fn inc_access_denied(&self) {
        self.access_denied.with_label_values(&[]).inc();
    }
}
