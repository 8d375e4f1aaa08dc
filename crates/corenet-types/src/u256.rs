// Path: crates/corenet-types/src/u256.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 256-bit unsigned integer stored as four little-endian `u64` limbs.
///
/// This is a leaf primitive used wherever the core needs a fixed-width
/// integer wider than `u128` (content hashes treated as numbers, driver
/// hash comparisons promoted to a common width). It implements the minimal
/// arithmetic the rest of the core actually needs rather than a full
/// bignum library.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct U256(pub [u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0, 0, 0, 0]);

    pub fn from_u64(v: u64) -> Self {
        U256([v, 0, 0, 0])
    }

    /// Builds a `U256` from a 32-byte big-endian buffer.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            limbs[3 - i] = u64::from_be_bytes(arr);
        }
        U256(limbs)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..4 {
            out[(3 - i) * 8..(3 - i) * 8 + 8].copy_from_slice(&self.0[i].to_be_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Wrapping addition across all four limbs.
    pub fn wrapping_add(self, other: U256) -> U256 {
        let mut out = [0u64; 4];
        let mut carry = 0u128;
        for i in 0..4 {
            let sum = u128::from(self.0[i]) + u128::from(other.0[i]) + carry;
            out[i] = sum as u64;
            carry = sum >> 64;
        }
        U256(out)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_bytes() {
        let mut bytes = [0u8; 32];
        bytes[31] = 0xff;
        bytes[0] = 0x01;
        let v = U256::from_be_bytes(bytes);
        assert_eq!(v.to_be_bytes(), bytes);
    }

    #[test]
    fn wrapping_add_carries() {
        let max_limb = U256([u64::MAX, 0, 0, 0]);
        let one = U256::from_u64(1);
        let sum = max_limb.wrapping_add(one);
        assert_eq!(sum.0, [0, 1, 0, 0]);
    }

    #[test]
    fn zero_is_zero() {
        assert!(U256::ZERO.is_zero());
        assert!(!U256::from_u64(1).is_zero());
    }
}
