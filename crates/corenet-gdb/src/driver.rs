// Path: crates/corenet-gdb/src/driver.rs
//! The fixed callback table every storage engine sits behind (§4.8). Any
//! method may be left at its default, which reports `NotSupported` rather
//! than silently degrading — mirrors `TransportOps`'s defaulted-methods
//! shape in `corenet-transport`.

use corenet_types::{DriverHash, StoreObject};

use crate::error::GdbError;

/// The outcome of a single `apply_store_obj` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The erase targeted a key that was not present.
    NotFound,
}

pub trait GdbDriver: Send + Sync {
    fn apply_store_obj(&self, _obj: &StoreObject) -> Result<ApplyOutcome, GdbError> {
        Err(GdbError::NotSupported)
    }

    /// `key = None` reads the whole group, newest-hash-first is not
    /// guaranteed; callers that need order use `read_cond_store_obj`.
    /// `*count` is the read limit on input and the number actually read
    /// on output.
    fn read_store_obj(
        &self,
        _group: &str,
        _key: Option<&[u8]>,
        _count: &mut usize,
        _with_holes: bool,
    ) -> Result<Vec<StoreObject>, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn read_last_store_obj(&self, _group: &str, _with_holes: bool) -> Result<Option<StoreObject>, GdbError> {
        Err(GdbError::NotSupported)
    }

    /// Records whose driver hash is strictly greater than `hash_from`, in
    /// ascending order.
    fn read_cond_store_obj(
        &self,
        _group: &str,
        _hash_from: DriverHash,
        _count: &mut usize,
        _with_holes: bool,
    ) -> Result<Vec<StoreObject>, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn read_count_store(&self, _group: &str) -> Result<usize, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn read_hashes(&self, _group: &str, _hash_from: DriverHash) -> Result<Vec<DriverHash>, GdbError> {
        Err(GdbError::NotSupported)
    }

    /// Records strictly below `ts`.
    fn read_store_obj_by_timestamp(
        &self,
        _group: &str,
        _ts: u64,
        _count: &mut usize,
    ) -> Result<Vec<StoreObject>, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn is_obj(&self, _group: &str, _key: &[u8]) -> Result<bool, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn is_hash(&self, _group: &str, _hash: DriverHash) -> Result<bool, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn get_by_hash(&self, _group: &str, _hashes: &[DriverHash]) -> Result<Vec<StoreObject>, GdbError> {
        Err(GdbError::NotSupported)
    }

    /// A fresh list of group names matching a shell-glob mask.
    fn get_groups_by_mask(&self, _mask: &str) -> Result<Vec<String>, GdbError> {
        Err(GdbError::NotSupported)
    }

    fn transaction_start(&self) -> Result<(), GdbError> {
        Err(GdbError::NotSupported)
    }

    fn transaction_end(&self, _commit: bool) -> Result<(), GdbError> {
        Err(GdbError::NotSupported)
    }

    fn flush(&self) -> Result<(), GdbError> {
        Ok(())
    }

    fn deinit(&self) -> Result<(), GdbError> {
        Ok(())
    }
}

/// Composes `<parent>/gdb-<driver>` the way the C core does, except for
/// `pgsql` which is a bare connection string.
pub fn driver_path(parent: &std::path::Path, driver_name: &str) -> std::path::PathBuf {
    parent.join(format!("gdb-{driver_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_path_composes_parent_and_name() {
        let p = driver_path(std::path::Path::new("/var/lib/corenet"), "redb");
        assert_eq!(p, std::path::PathBuf::from("/var/lib/corenet/gdb-redb"));
    }
}
