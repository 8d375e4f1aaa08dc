// Path: crates/corenet-gdb/src/lib.rs
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

//! # corenet-gdb
//!
//! The global-DB driver interface (§4.8), its `redb` backend, the
//! business-layer invariants a driver doesn't enforce on its own
//! (author/pin checks, the batch-apply transaction policy), and the sync
//! log-list that turns a driver's contents into a prioritized outbound
//! packet feed for one peer (§4.9).

pub mod driver;
mod error;
mod loglist;
mod redb_driver;
mod store;

pub use driver::{driver_path, ApplyOutcome, GdbDriver};
pub use error::GdbError;
pub use loglist::{collect_groups, receiver_accepts, Drained, LogList, LogListItem};
pub use redb_driver::RedbDriver;
pub use store::{BatchReport, GlobalDb};

use std::path::Path;
use std::sync::Arc;

/// Opens the driver named by `driver_name`, composing `<parent>/gdb-<name>`
/// the way the original core does. Only `redb` is backed by a concrete
/// implementation in this build; the legacy `sqlite`/`sqlite3`/`mdbx`/
/// `pgsql` names are recognized (and their path composed) but report
/// [`GdbError::UnsupportedDriver`], matching the spec's "unsupported
/// legacy names log an error" language.
pub fn open_driver(driver_name: &str, parent: &Path) -> Result<Arc<dyn GdbDriver>, GdbError> {
    match driver_name {
        "redb" => {
            let path = driver_path(parent, driver_name);
            Ok(Arc::new(RedbDriver::open(&path)?))
        }
        "sqlite" | "sqlite3" | "mdbx" | "pgsql" => {
            tracing::error!(target: "gdb", driver = driver_name, "driver name recognized but not backed by a concrete implementation in this build");
            Err(GdbError::UnsupportedDriver(driver_name.to_string()))
        }
        other => {
            tracing::error!(target: "gdb", driver = other, "unknown driver name");
            Err(GdbError::UnsupportedDriver(other.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_driver_rejects_legacy_names_but_still_composes_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_driver("sqlite", dir.path());
        assert!(matches!(result, Err(GdbError::UnsupportedDriver(_))));
    }

    #[test]
    fn open_driver_opens_redb() {
        let dir = tempfile::tempdir().unwrap();
        let driver = open_driver("redb", dir.path()).unwrap();
        assert!(driver.flush().is_ok());
    }
}
