// Path: crates/corenet-transport/src/obfuscation.rs
//! The obfuscation engine: padding, protocol mimicry, timing jitter,
//! polymorphic magic numbers, and traffic mixing, independently toggled
//! by a bitmask and composed in a fixed, documented pipeline order so
//! `deobfuscate(obfuscate(x)) == x` holds for any subset of techniques.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bitflags::bitflags;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use corenet_telemetry::sinks::transport_metrics;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Techniques: u8 {
        const PADDING         = 0b0000_0001;
        const MIMICRY         = 0b0000_0010;
        const TIMING          = 0b0000_0100;
        const POLYMORPHIC_MAGIC = 0b0000_1000;
        const TRAFFIC_MIXING  = 0b0001_0000;
    }
}

#[derive(Debug, Error)]
pub enum ObfuscationError {
    #[error("mimicry header too short: need {need} bytes, had {have}")]
    TruncatedMimicryHeader { need: usize, have: usize },
    #[error("polymorphic magic prefix too short: need {need} bytes, had {have}")]
    TruncatedMagicPrefix { need: usize, have: usize },
    #[error("padding length header too short")]
    TruncatedLengthHeader,
    #[error("padding length header claims {claimed} bytes but only {available} remain")]
    InconsistentLength { claimed: usize, available: usize },
}

#[derive(Clone, Debug)]
pub struct PaddingConfig {
    pub min: usize,
    pub max: usize,
    /// Probability in `[0, 1]` that a given call is padded at all.
    pub probability: f64,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        PaddingConfig {
            min: 0,
            max: 64,
            probability: 0.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub min_delay_ms: u32,
    pub max_delay_ms: u32,
    pub randomize_burst: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            min_delay_ms: 0,
            max_delay_ms: 50,
            randomize_burst: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MixingConfig {
    /// Target fake-traffic rate in bytes/second.
    pub rate_bytes_per_sec: u32,
    pub min_packet_size: usize,
    pub max_packet_size: usize,
}

impl Default for MixingConfig {
    fn default() -> Self {
        MixingConfig {
            rate_bytes_per_sec: 0,
            min_packet_size: 32,
            max_packet_size: 256,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MimicryConfig {
    pub target_protocol: String,
    pub emulate_browser: bool,
}

const MIMICRY_HEADER_LEN: usize = 16;
const MAGIC_PREFIX_LEN: usize = 8;
const LENGTH_HEADER_LEN: usize = 4;

#[derive(Clone, Debug, Default)]
pub struct ObfuscationConfig {
    pub techniques: Techniques,
    pub level: u8,
    pub padding: PaddingConfig,
    pub timing: TimingConfig,
    pub mixing: MixingConfig,
    pub mimicry: MimicryConfig,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub packets_in: AtomicU64,
    pub packets_out: AtomicU64,
    pub fake_packets: AtomicU64,
    pub padding_bytes: AtomicU64,
    pub fake_bytes: AtomicU64,
}

/// A configured obfuscation engine. Holds a process-local copy of the
/// per-session shared secret used to re-derive the polymorphic magic
/// number; two `ObfuscationEngine`s constructed with the same secret and
/// session nonce produce the same magic bytes.
#[derive(Debug)]
pub struct ObfuscationEngine {
    pub config: ObfuscationConfig,
    secret: [u8; 32],
    counters: Counters,
    name: String,
}

impl ObfuscationEngine {
    pub fn new(name: impl Into<String>, config: ObfuscationConfig, secret: [u8; 32]) -> ObfuscationEngine {
        ObfuscationEngine {
            config,
            secret,
            counters: Counters::default(),
            name: name.into(),
        }
    }

    fn enabled(&self, t: Techniques) -> bool {
        self.config.techniques.contains(t)
    }

    fn magic_bytes(&self, session_nonce: u64) -> [u8; MAGIC_PREFIX_LEN] {
        let mut acc = fnv1a(&self.secret);
        acc = fnv1a_continue(acc, &session_nonce.to_le_bytes());
        acc.to_le_bytes()
    }

    fn mimicry_header(&self, session_nonce: u64) -> [u8; MIMICRY_HEADER_LEN] {
        let mut header = [0u8; MIMICRY_HEADER_LEN];
        let tag = fnv1a_continue(fnv1a(self.config.mimicry.target_protocol.as_bytes()), &session_nonce.to_le_bytes());
        header[..8].copy_from_slice(&tag.to_le_bytes());
        header[8] = self.config.mimicry.emulate_browser as u8;
        header
    }

    /// Transforms `data` for the wire. `session_nonce` selects the
    /// polymorphic-magic / mimicry-header derivation so repeated sessions
    /// between the same peer pair don't look identical.
    pub fn obfuscate(&self, session_nonce: u64, data: &[u8]) -> Vec<u8> {
        let mut payload = data.to_vec();

        if self.enabled(Techniques::PADDING) {
            let pad_len = self.choose_padding_len();
            let mut framed = Vec::with_capacity(LENGTH_HEADER_LEN + payload.len() + pad_len);
            framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            framed.extend_from_slice(&payload);
            if pad_len > 0 {
                let mut pad = vec![0u8; pad_len];
                OsRng.fill_bytes(&mut pad);
                framed.extend_from_slice(&pad);
                self.counters.padding_bytes.fetch_add(pad_len as u64, Ordering::Relaxed);
                transport_metrics().inc_padding_bytes(&self.name, pad_len as u64);
            }
            payload = framed;
        }

        if self.enabled(Techniques::POLYMORPHIC_MAGIC) {
            let magic = self.magic_bytes(session_nonce);
            let mut framed = Vec::with_capacity(magic.len() + payload.len());
            framed.extend_from_slice(&magic);
            framed.extend_from_slice(&payload);
            payload = framed;
        }

        if self.enabled(Techniques::MIMICRY) {
            let header = self.mimicry_header(session_nonce);
            let mut framed = Vec::with_capacity(header.len() + payload.len());
            framed.extend_from_slice(&header);
            framed.extend_from_slice(&payload);
            payload = framed;
        }

        self.counters.packets_out.fetch_add(1, Ordering::Relaxed);
        transport_metrics().inc_bytes_obfuscated(&self.name, payload.len() as u64);
        payload
    }

    /// Inverts [`Self::obfuscate`] with the same `session_nonce` and
    /// configuration. Returns the original `data` for any non-fake
    /// message produced by `obfuscate`.
    pub fn deobfuscate(&self, session_nonce: u64, wire: &[u8]) -> Result<Vec<u8>, ObfuscationError> {
        let mut cursor = wire;

        if self.enabled(Techniques::MIMICRY) {
            if cursor.len() < MIMICRY_HEADER_LEN {
                return Err(ObfuscationError::TruncatedMimicryHeader {
                    need: MIMICRY_HEADER_LEN,
                    have: cursor.len(),
                });
            }
            cursor = &cursor[MIMICRY_HEADER_LEN..];
            let _ = self.mimicry_header(session_nonce);
        }

        if self.enabled(Techniques::POLYMORPHIC_MAGIC) {
            if cursor.len() < MAGIC_PREFIX_LEN {
                return Err(ObfuscationError::TruncatedMagicPrefix {
                    need: MAGIC_PREFIX_LEN,
                    have: cursor.len(),
                });
            }
            cursor = &cursor[MAGIC_PREFIX_LEN..];
        }

        let out = if self.enabled(Techniques::PADDING) {
            if cursor.len() < LENGTH_HEADER_LEN {
                return Err(ObfuscationError::TruncatedLengthHeader);
            }
            let (len_bytes, rest) = cursor.split_at(LENGTH_HEADER_LEN);
            let claimed = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
            if claimed > rest.len() {
                return Err(ObfuscationError::InconsistentLength {
                    claimed,
                    available: rest.len(),
                });
            }
            rest[..claimed].to_vec()
        } else {
            cursor.to_vec()
        };

        self.counters.packets_in.fetch_add(1, Ordering::Relaxed);
        Ok(out)
    }

    fn choose_padding_len(&self) -> usize {
        if self.config.padding.max == 0 {
            return 0;
        }
        let roll = (OsRng.next_u32() as f64) / (u32::MAX as f64);
        if roll > self.config.padding.probability {
            return 0;
        }
        let span = self.config.padding.max.saturating_sub(self.config.padding.min) as u32 + 1;
        self.config.padding.min + (OsRng.next_u32() % span) as usize
    }

    /// `calc_delay`: a uniformly-random delay in `[min_delay_ms, max_delay_ms]`.
    /// Does not depend on payload size or content, by construction.
    pub fn calc_delay(&self) -> Duration {
        let (min, max) = (self.config.timing.min_delay_ms, self.config.timing.max_delay_ms);
        if max <= min {
            return Duration::from_millis(min as u64);
        }
        let span = max - min + 1;
        let ms = min + (OsRng.next_u32() % span);
        Duration::from_millis(ms as u64)
    }

    /// `generate_fake_traffic`: random-length, random-content packets
    /// approximating the configured byte rate over `duration`.
    pub fn generate_fake_traffic(&self, duration: Duration) -> Vec<Vec<u8>> {
        if !self.enabled(Techniques::TRAFFIC_MIXING) || self.config.mixing.rate_bytes_per_sec == 0 {
            return Vec::new();
        }
        let target_bytes = (self.config.mixing.rate_bytes_per_sec as f64) * duration.as_secs_f64();
        let avg_size = ((self.config.mixing.min_packet_size + self.config.mixing.max_packet_size) / 2).max(1);
        let count = (target_bytes / avg_size as f64).round() as usize;

        let span = (self.config.mixing.max_packet_size.saturating_sub(self.config.mixing.min_packet_size) + 1) as u32;
        let mut packets = Vec::with_capacity(count);
        for _ in 0..count {
            let size = self.config.mixing.min_packet_size + (OsRng.next_u32() % span.max(1)) as usize;
            let mut buf = vec![0u8; size];
            OsRng.fill_bytes(&mut buf);
            self.counters.fake_bytes.fetch_add(size as u64, Ordering::Relaxed);
            transport_metrics().inc_fake_packets(&self.name);
            packets.push(buf);
        }
        self.counters.fake_packets.fetch_add(count as u64, Ordering::Relaxed);
        packets
    }

    pub fn packets_in(&self) -> u64 {
        self.counters.packets_in.load(Ordering::Relaxed)
    }
    pub fn packets_out(&self) -> u64 {
        self.counters.packets_out.load(Ordering::Relaxed)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    fnv1a_continue(0xcbf29ce484222325, bytes)
}

fn fnv1a_continue(mut acc: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        acc ^= b as u64;
        acc = acc.wrapping_mul(0x100000001b3);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(techniques: Techniques) -> ObfuscationEngine {
        ObfuscationEngine::new(
            "test",
            ObfuscationConfig {
                techniques,
                mimicry: MimicryConfig {
                    target_protocol: "https".into(),
                    emulate_browser: true,
                },
                ..Default::default()
            },
            [7u8; 32],
        )
    }

    #[test]
    fn round_trips_with_every_technique_combination() {
        let data = b"hello obfuscated world";
        for bits in 0u8..(1 << 4) {
            let techniques = Techniques::from_bits_truncate(bits);
            let eng = engine(techniques);
            let wire = eng.obfuscate(12345, data);
            let back = eng.deobfuscate(12345, &wire).expect("deobfuscate");
            assert_eq!(back, data, "failed round trip for techniques {:?}", techniques);
        }
    }

    #[test]
    fn different_sessions_produce_different_wire_bytes() {
        let eng = engine(Techniques::POLYMORPHIC_MAGIC | Techniques::MIMICRY);
        let a = eng.obfuscate(1, b"same payload");
        let b = eng.obfuscate(2, b"same payload");
        assert_ne!(a, b);
    }

    #[test]
    fn padding_keeps_original_length_recoverable() {
        let eng = ObfuscationEngine::new(
            "pad",
            ObfuscationConfig {
                techniques: Techniques::PADDING,
                padding: PaddingConfig {
                    min: 16,
                    max: 16,
                    probability: 1.0,
                },
                ..Default::default()
            },
            [1u8; 32],
        );
        let wire = eng.obfuscate(0, b"abc");
        assert_eq!(wire.len(), LENGTH_HEADER_LEN + 3 + 16);
        assert_eq!(eng.deobfuscate(0, &wire).unwrap(), b"abc");
    }

    #[test]
    fn calc_delay_stays_within_bounds() {
        let eng = ObfuscationEngine::new(
            "timing",
            ObfuscationConfig {
                timing: TimingConfig {
                    min_delay_ms: 10,
                    max_delay_ms: 20,
                    randomize_burst: false,
                },
                ..Default::default()
            },
            [2u8; 32],
        );
        for _ in 0..50 {
            let d = eng.calc_delay();
            assert!(d.as_millis() >= 10 && d.as_millis() <= 20);
        }
    }

    #[test]
    fn truncated_wire_data_is_rejected_not_panicked() {
        let eng = engine(Techniques::MIMICRY | Techniques::POLYMORPHIC_MAGIC | Techniques::PADDING);
        let wire = eng.obfuscate(9, b"payload");
        let too_short = &wire[..2];
        assert!(eng.deobfuscate(9, too_short).is_err());
    }
}
