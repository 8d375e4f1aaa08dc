// Path: crates/corenet-rpc/src/access.rs
//! Access control for the admin channel (§4.5, REDESIGN FLAGS): loopback
//! and Unix-domain peers are always allowed unless explicitly denied;
//! every other peer needs `allowed_cmd_control` plus an allow-list hit.

use std::collections::HashSet;
use std::net::IpAddr;

/// Where a connection came from, as seen by the listening socket. Remote
/// peers carry their address so the rate limiter (see [`crate::ratelimit`])
/// can key a bucket per client without re-deriving it from the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    Loopback,
    UnixDomain,
    Remote(IpAddr),
}

impl PeerKind {
    pub fn for_ip(ip: IpAddr) -> PeerKind {
        if ip.is_loopback() {
            PeerKind::Loopback
        } else {
            PeerKind::Remote(ip)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

pub struct AccessControl {
    pub allowed_cmd_control: bool,
    allow_list: HashSet<String>,
    deny_list: HashSet<String>,
}

impl AccessControl {
    pub fn new(allowed_cmd_control: bool) -> AccessControl {
        AccessControl {
            allowed_cmd_control,
            allow_list: HashSet::new(),
            deny_list: HashSet::new(),
        }
    }

    pub fn allow(mut self, method: impl Into<String>) -> AccessControl {
        self.allow_list.insert(method.into());
        self
    }

    pub fn deny(mut self, method: impl Into<String>) -> AccessControl {
        self.deny_list.insert(method.into());
        self
    }

    /// Loopback and Unix-domain peers are allowed by default and rejected
    /// only if `method` is on the explicit deny-list. Remote peers need
    /// `allowed_cmd_control` *and* an allow-list hit.
    pub fn decide(&self, peer: PeerKind, method: &str) -> AccessDecision {
        match peer {
            PeerKind::Loopback | PeerKind::UnixDomain => {
                if self.deny_list.contains(method) {
                    AccessDecision::Deny
                } else {
                    AccessDecision::Allow
                }
            }
            PeerKind::Remote(_) => {
                if self.allowed_cmd_control && self.allow_list.contains(method) {
                    AccessDecision::Allow
                } else {
                    AccessDecision::Deny
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_allowed_by_default() {
        let access = AccessControl::new(false);
        assert_eq!(access.decide(PeerKind::Loopback, "shutdown"), AccessDecision::Allow);
    }

    #[test]
    fn loopback_can_be_explicitly_denied() {
        let access = AccessControl::new(false).deny("shutdown");
        assert_eq!(access.decide(PeerKind::Loopback, "shutdown"), AccessDecision::Deny);
    }

    #[test]
    fn remote_needs_allowed_cmd_control_and_allow_list() {
        let remote = PeerKind::Remote(IpAddr::from([203, 0, 113, 7]));
        let access = AccessControl::new(false).allow("status");
        assert_eq!(access.decide(remote, "status"), AccessDecision::Deny);

        let access = AccessControl::new(true).allow("status");
        assert_eq!(access.decide(remote, "status"), AccessDecision::Allow);
        assert_eq!(access.decide(remote, "shutdown"), AccessDecision::Deny);
    }

    #[test]
    fn unix_domain_behaves_like_loopback() {
        let access = AccessControl::new(false);
        assert_eq!(access.decide(PeerKind::UnixDomain, "anything"), AccessDecision::Allow);
    }
}
