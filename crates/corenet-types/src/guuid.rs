// Path: crates/corenet-types/src/guuid.rs

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cluster global UUID: a 128-bit identifier split into a 64-bit network
/// id and a 64-bit service id. Printed as a single 32-char hex string. The
/// zero GUUID means "anonymous / auto-assigned".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guuid {
    pub network_id: u64,
    pub service_id: u64,
}

impl Guuid {
    pub const ANONYMOUS: Guuid = Guuid {
        network_id: 0,
        service_id: 0,
    };

    pub fn is_anonymous(&self) -> bool {
        self.network_id == 0 && self.service_id == 0
    }
}

impl fmt::Display for Guuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.network_id, self.service_id)
    }
}

impl fmt::Debug for Guuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guuid({})", self)
    }
}

impl FromStr for Guuid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::MalformedGuuid(s.to_string()));
        }
        let network_id = u64::from_str_radix(&s[0..16], 16)
            .map_err(|_| CoreError::MalformedGuuid(s.to_string()))?;
        let service_id = u64::from_str_radix(&s[16..32], 16)
            .map_err(|_| CoreError::MalformedGuuid(s.to_string()))?;
        Ok(Guuid {
            network_id,
            service_id,
        })
    }
}
