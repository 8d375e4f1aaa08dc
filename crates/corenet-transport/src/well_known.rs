// Path: crates/corenet-transport/src/well_known.rs
//! Well-known transport names (§6 "Transport types and capabilities") and
//! the string parser that maps the config file's free-form transport
//! strings onto them. Grounded on the same fixed-set-string-to-enum
//! pattern `corenet-config`'s value parser uses for config type hints;
//! unlike that parser, an unrecognized string here isn't an error — it
//! falls back to `HTTP` with a logged warning, matching the spec's own
//! "unknown strings resolve to HTTP" fallback.

use std::fmt;

/// A well-known, registry-level transport name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownTransport {
    Http,
    UdpBasic,
    UdpReliable,
    UdpQuicLike,
    WebSocket,
    TlsDirect,
    DnsTunnel,
}

impl WellKnownTransport {
    /// The fixed registry type id each well-known transport occupies.
    /// These ids are reserved; a config-registered custom transport must
    /// pick an id outside this range.
    pub fn type_id(self) -> super::TransportTypeId {
        match self {
            WellKnownTransport::Http => 1,
            WellKnownTransport::UdpBasic => 2,
            WellKnownTransport::UdpReliable => 3,
            WellKnownTransport::UdpQuicLike => 4,
            WellKnownTransport::WebSocket => 5,
            WellKnownTransport::TlsDirect => 6,
            WellKnownTransport::DnsTunnel => 7,
        }
    }

    /// Parses a free-form transport string (typically from a config
    /// file). Unrecognized strings fall back to `HTTP` with a logged
    /// warning rather than failing the config load outright.
    pub fn parse(s: &str) -> WellKnownTransport {
        match s.to_ascii_lowercase().as_str() {
            "http" | "https" => WellKnownTransport::Http,
            "udp" | "udp_basic" => WellKnownTransport::UdpBasic,
            "udp_reliable" => WellKnownTransport::UdpReliable,
            "udp_quic" | "quic" => WellKnownTransport::UdpQuicLike,
            "ws" | "websocket" => WellKnownTransport::WebSocket,
            "tls" | "tls_direct" => WellKnownTransport::TlsDirect,
            "dns" | "dns_tunnel" => WellKnownTransport::DnsTunnel,
            other => {
                tracing::warn!(target: "transport", name = %other, "unknown transport name, defaulting to HTTP");
                WellKnownTransport::Http
            }
        }
    }
}

impl fmt::Display for WellKnownTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WellKnownTransport::Http => "HTTP",
            WellKnownTransport::UdpBasic => "UDP_BASIC",
            WellKnownTransport::UdpReliable => "UDP_RELIABLE",
            WellKnownTransport::UdpQuicLike => "UDP_QUIC_LIKE",
            WellKnownTransport::WebSocket => "WEBSOCKET",
            WellKnownTransport::TlsDirect => "TLS_DIRECT",
            WellKnownTransport::DnsTunnel => "DNS_TUNNEL",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_aliases_map_to_their_well_known_name() {
        assert_eq!(WellKnownTransport::parse("http"), WellKnownTransport::Http);
        assert_eq!(WellKnownTransport::parse("https"), WellKnownTransport::Http);
        assert_eq!(WellKnownTransport::parse("udp"), WellKnownTransport::UdpBasic);
        assert_eq!(WellKnownTransport::parse("udp_basic"), WellKnownTransport::UdpBasic);
        assert_eq!(WellKnownTransport::parse("udp_reliable"), WellKnownTransport::UdpReliable);
        assert_eq!(WellKnownTransport::parse("udp_quic"), WellKnownTransport::UdpQuicLike);
        assert_eq!(WellKnownTransport::parse("quic"), WellKnownTransport::UdpQuicLike);
        assert_eq!(WellKnownTransport::parse("ws"), WellKnownTransport::WebSocket);
        assert_eq!(WellKnownTransport::parse("websocket"), WellKnownTransport::WebSocket);
        assert_eq!(WellKnownTransport::parse("tls"), WellKnownTransport::TlsDirect);
        assert_eq!(WellKnownTransport::parse("tls_direct"), WellKnownTransport::TlsDirect);
        assert_eq!(WellKnownTransport::parse("dns"), WellKnownTransport::DnsTunnel);
        assert_eq!(WellKnownTransport::parse("dns_tunnel"), WellKnownTransport::DnsTunnel);
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(WellKnownTransport::parse("HTTP"), WellKnownTransport::Http);
        assert_eq!(WellKnownTransport::parse("WebSocket"), WellKnownTransport::WebSocket);
    }

    #[test]
    fn unknown_strings_fall_back_to_http() {
        assert_eq!(WellKnownTransport::parse("carrier-pigeon"), WellKnownTransport::Http);
    }

    #[test]
    fn display_round_trips_through_the_registry_name() {
        assert_eq!(WellKnownTransport::WebSocket.to_string(), "WEBSOCKET");
        assert_eq!(WellKnownTransport::UdpQuicLike.to_string(), "UDP_QUIC_LIKE");
    }

    #[test]
    fn type_ids_are_unique() {
        let all = [
            WellKnownTransport::Http,
            WellKnownTransport::UdpBasic,
            WellKnownTransport::UdpReliable,
            WellKnownTransport::UdpQuicLike,
            WellKnownTransport::WebSocket,
            WellKnownTransport::TlsDirect,
            WellKnownTransport::DnsTunnel,
        ];
        let mut ids: Vec<_> = all.iter().map(|t| t.type_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
    }
}
