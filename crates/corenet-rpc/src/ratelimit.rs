// Path: crates/corenet-rpc/src/ratelimit.rs
//! Per-peer-IP rate limiting for the admin channel: a token bucket per
//! client IP, skipped entirely for loopback and Unix-domain peers. Grounded
//! on `http-rpc-gateway`'s `IpLimiter`/`Bucket`, ported off axum's
//! per-request extension lookup onto the [`PeerKind`] this crate already
//! threads through [`crate::dispatch::Dispatcher::dispatch`].

use std::net::IpAddr;
use std::time::Instant;

use dashmap::DashMap;

use crate::access::PeerKind;

struct Bucket {
    tokens: f64,
    last: Instant,
}

/// A token bucket per client IP: `rps` tokens refill per second up to
/// `burst`, and each request costs one token.
pub struct RateLimiter {
    buckets: DashMap<IpAddr, Bucket>,
    rps: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: f64) -> RateLimiter {
        RateLimiter {
            buckets: DashMap::new(),
            rps,
            burst,
        }
    }

    /// Loopback and Unix-domain peers never consume a bucket; only a
    /// `PeerKind::Remote` address is metered.
    pub fn allow(&self, peer: PeerKind) -> bool {
        let ip = match peer {
            PeerKind::Remote(ip) => ip,
            PeerKind::Loopback | PeerKind::UnixDomain => return true,
        };
        let now = Instant::now();
        let mut entry = self.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.burst,
            last: now,
        });
        let elapsed = now.duration_since(entry.last).as_secs_f64();
        entry.tokens = (entry.tokens + elapsed * self.rps).min(self.burst);
        entry.last = now;
        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_and_unix_domain_bypass_the_limiter() {
        let limiter = RateLimiter::new(1.0, 1.0);
        for _ in 0..10 {
            assert!(limiter.allow(PeerKind::Loopback));
            assert!(limiter.allow(PeerKind::UnixDomain));
        }
    }

    #[test]
    fn remote_peers_are_capped_at_the_burst_size() {
        let limiter = RateLimiter::new(0.0, 2.0);
        let remote = PeerKind::Remote(IpAddr::from([203, 0, 113, 7]));
        assert!(limiter.allow(remote));
        assert!(limiter.allow(remote));
        assert!(!limiter.allow(remote));
    }

    #[test]
    fn separate_ips_get_separate_buckets() {
        let limiter = RateLimiter::new(0.0, 1.0);
        let a = PeerKind::Remote(IpAddr::from([203, 0, 113, 7]));
        let b = PeerKind::Remote(IpAddr::from([203, 0, 113, 8]));
        assert!(limiter.allow(a));
        assert!(!limiter.allow(a));
        assert!(limiter.allow(b));
    }
}
