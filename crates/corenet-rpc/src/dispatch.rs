// Path: crates/corenet-rpc/src/dispatch.rs
//! Ties the registry, access control, and response assembly together
//! (§4.5). A request is parsed, access-checked, resolved, then run on a
//! detached thread so the caller (normally the worker thread draining
//! the connection's event-socket) never blocks on a command handler —
//! the same decoupling the global-DB log-list uses for its producer.

use std::cell::Cell;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use corenet_telemetry::sinks::rpc_metrics;
use corenet_telemetry::time::ScopeTimer;

use crate::access::{AccessControl, AccessDecision, PeerKind};
use crate::protocol::{build_response_body, CommandError, JsonRpcRequest};
use crate::ratelimit::RateLimiter;
use crate::registry::CommandRegistry;
use crate::response::build_http_response;

pub type StatsCallback = Arc<dyn Fn(&str, std::time::Duration) + Send + Sync>;
pub type DynamicHeaderProvider = Arc<dyn Fn() -> Vec<(String, String)> + Send + Sync>;

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    access: AccessControl,
    rate_limiter: Option<RateLimiter>,
    stats_callback: Option<StatsCallback>,
    static_headers: Vec<(String, String)>,
    dynamic_header_providers: Mutex<Vec<DynamicHeaderProvider>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, access: AccessControl) -> Dispatcher {
        Dispatcher {
            registry,
            access,
            rate_limiter: None,
            stats_callback: None,
            static_headers: Vec::new(),
            dynamic_header_providers: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Dispatcher {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn with_stats_callback(mut self, callback: StatsCallback) -> Dispatcher {
        self.stats_callback = Some(callback);
        self
    }

    pub fn add_static_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.static_headers.push((name.into(), value.into()));
    }

    pub fn add_dynamic_header_provider(&self, provider: DynamicHeaderProvider) {
        self.dynamic_header_providers.lock().unwrap_or_else(|e| e.into_inner()).push(provider);
    }

    /// Parses `raw_body`, enforces access control, resolves the command
    /// (direct or alias), and spawns it on a detached thread. `on_reply`
    /// fires exactly once with the finished response bytes, either
    /// immediately (parse/access failure) or from the detached thread.
    pub fn dispatch(&self, peer: PeerKind, raw_body: &[u8], on_reply: impl FnOnce(Vec<u8>) + Send + 'static) {
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.allow(peer) {
                rpc_metrics().inc_requests_total("<rate-limited>", 429);
                on_reply(build_http_response(429, 0, &[], b"too many requests"));
                return;
            }
        }

        let request: JsonRpcRequest = match serde_json::from_slice(raw_body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(target: "rpc", error = %e, "failed to parse request body as JSON-RPC");
                rpc_metrics().inc_requests_total("<unparsed>", 500);
                on_reply(build_http_response(500, 0, &[], b"bad request"));
                return;
            }
        };

        if self.access.decide(peer, &request.method) == AccessDecision::Deny {
            rpc_metrics().inc_access_denied();
            rpc_metrics().inc_requests_total(&request.method, 403);
            on_reply(build_http_response(403, 0, &[], b"forbidden"));
            return;
        }

        let resolved = self.registry.resolve(&request.method, request.params);
        let registry = self.registry.clone();
        let stats_callback = self.stats_callback.clone();
        let static_headers = self.static_headers.clone();
        let dynamic_providers: Vec<DynamicHeaderProvider> =
            self.dynamic_header_providers.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let method = request.method;
        let id = request.id;
        let version = request.version;

        std::thread::spawn(move || {
            let elapsed_secs = Cell::new(0.0f64);
            let (label, outcome) = {
                let _timer = ScopeTimer::new(|secs| elapsed_secs.set(secs));
                run_command(&registry, &method, resolved)
            };
            let elapsed = Duration::from_secs_f64(elapsed_secs.get());

            if let Some(callback) = &stats_callback {
                callback(&label, elapsed);
            }
            rpc_metrics().observe_request_duration(&label, elapsed.as_secs_f64());
            rpc_metrics().inc_requests_total(&label, 200);

            let body = build_response_body(outcome, id, version);
            let mut headers = static_headers;
            for provider in &dynamic_providers {
                headers.extend(provider());
            }
            on_reply(build_http_response(200, elapsed.as_nanos() as u64, &headers, &body));
        });
    }
}

fn run_command(
    registry: &CommandRegistry,
    method: &str,
    resolved: Option<(String, Vec<Value>)>,
) -> (String, crate::protocol::CommandResult) {
    match resolved {
        Some((base, params)) => match registry.handler(&base) {
            Some(handler) => (base, handler(&params)),
            None => (base, Err(vec![CommandError::unknown_method(method)])),
        },
        None => (method.to_string(), Err(vec![CommandError::unknown_method(method)])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseValue;
    use std::sync::mpsc;

    fn registry_with_ping() -> Arc<CommandRegistry> {
        let registry = CommandRegistry::new();
        registry
            .register("ping", "replies pong", Arc::new(|_params| Ok(ResponseValue::Str("pong".into()))))
            .unwrap();
        Arc::new(registry)
    }

    fn wait_for_reply(rx: mpsc::Receiver<Vec<u8>>) -> Vec<u8> {
        rx.recv_timeout(std::time::Duration::from_secs(2)).expect("dispatch reply")
    }

    #[test]
    fn a_known_command_round_trips_through_a_detached_thread() {
        let dispatcher = Dispatcher::new(registry_with_ping(), AccessControl::new(false));
        let (tx, rx) = mpsc::channel();
        let body = br#"{"method":"ping","params":[],"id":1,"version":1}"#;
        dispatcher.dispatch(PeerKind::Loopback, body, move |resp| {
            let _ = tx.send(resp);
        });
        let resp = String::from_utf8(wait_for_reply(rx)).unwrap();
        assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(resp.contains("\"result\":\"pong\""));
    }

    #[test]
    fn remote_peer_without_allow_list_gets_403() {
        let dispatcher = Dispatcher::new(registry_with_ping(), AccessControl::new(false));
        let (tx, rx) = mpsc::channel();
        let body = br#"{"method":"ping","params":[],"id":1,"version":1}"#;
        let remote = PeerKind::Remote(std::net::IpAddr::from([203, 0, 113, 7]));
        dispatcher.dispatch(remote, body, move |resp| {
            let _ = tx.send(resp);
        });
        let resp = String::from_utf8(wait_for_reply(rx)).unwrap();
        assert!(resp.starts_with("HTTP/1.1 403 Forbidden\r\n"));
    }

    #[test]
    fn exhausted_rate_limit_gets_429_before_the_command_runs() {
        let dispatcher = Dispatcher::new(registry_with_ping(), AccessControl::new(true).allow("ping"))
            .with_rate_limiter(crate::ratelimit::RateLimiter::new(0.0, 1.0));
        let remote = PeerKind::Remote(std::net::IpAddr::from([203, 0, 113, 9]));
        let body = br#"{"method":"ping","params":[],"id":1,"version":1}"#;

        let (tx1, rx1) = mpsc::channel();
        dispatcher.dispatch(remote, body, move |resp| {
            let _ = tx1.send(resp);
        });
        assert!(String::from_utf8(wait_for_reply(rx1)).unwrap().starts_with("HTTP/1.1 200 OK\r\n"));

        let (tx2, rx2) = mpsc::channel();
        dispatcher.dispatch(remote, body, move |resp| {
            let _ = tx2.send(resp);
        });
        assert!(String::from_utf8(wait_for_reply(rx2)).unwrap().starts_with("HTTP/1.1 429 Too Many Requests\r\n"));
    }

    #[test]
    fn malformed_body_gets_500() {
        let dispatcher = Dispatcher::new(registry_with_ping(), AccessControl::new(false));
        let (tx, rx) = mpsc::channel();
        dispatcher.dispatch(PeerKind::Loopback, b"not json", move |resp| {
            let _ = tx.send(resp);
        });
        let resp = String::from_utf8(wait_for_reply(rx)).unwrap();
        assert!(resp.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[test]
    fn unknown_method_reports_structured_error_under_200() {
        let dispatcher = Dispatcher::new(registry_with_ping(), AccessControl::new(false));
        let (tx, rx) = mpsc::channel();
        let body = br#"{"method":"nope","params":[],"id":9,"version":1}"#;
        dispatcher.dispatch(PeerKind::Loopback, body, move |resp| {
            let _ = tx.send(resp);
        });
        let resp = String::from_utf8(wait_for_reply(rx)).unwrap();
        assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(resp.contains("\"code\":-1"));
    }
}
