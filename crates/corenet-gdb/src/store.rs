// Path: crates/corenet-gdb/src/store.rs
//! The business-layer facade over a [`GdbDriver`]: author/pin enforcement
//! and the batch-apply transaction policy (§4.8), neither of which the
//! driver contract itself knows about.

use std::sync::Arc;

use corenet_types::{store::validate_group_name, StoreObject};

use corenet_telemetry::sinks::gdb_metrics;

use crate::driver::{ApplyOutcome, GdbDriver};
use crate::error::GdbError;

pub struct GlobalDb {
    driver: Arc<dyn GdbDriver>,
    pub store_time_limit_sec: u64,
}

impl GlobalDb {
    pub fn new(driver: Arc<dyn GdbDriver>, store_time_limit_sec: u64) -> GlobalDb {
        GlobalDb { driver, store_time_limit_sec }
    }

    pub fn driver(&self) -> &Arc<dyn GdbDriver> {
        &self.driver
    }

    /// Applies one object, enforcing the pin/author and stale-erase
    /// invariants the driver contract deliberately leaves to the caller.
    pub fn apply(&self, obj: &StoreObject, author: &[u8]) -> Result<ApplyOutcome, GdbError> {
        if let Some(existing) = self.existing(obj)? {
            if existing.is_pinned() && existing.signature != author {
                gdb_metrics().inc_objects_rejected(&obj.group, "pinned_by_another_author");
                return Err(GdbError::PinnedByAnotherAuthor);
            }
        }
        if obj.is_erase() && obj.timestamp < self.erase_discard_floor() {
            gdb_metrics().inc_objects_rejected(&obj.group, "erase_past_store_time_limit");
            return Ok(ApplyOutcome::Applied);
        }
        let outcome = self.driver.apply_store_obj(obj)?;
        gdb_metrics().inc_objects_applied(&obj.group);
        Ok(outcome)
    }

    fn existing(&self, obj: &StoreObject) -> Result<Option<StoreObject>, GdbError> {
        let mut count = 1;
        let found = self.driver.read_store_obj(&obj.group, Some(&obj.key), &mut count, true)?;
        Ok(found.into_iter().next())
    }

    fn erase_discard_floor(&self) -> u64 {
        now_nanos().saturating_sub(self.store_time_limit_sec.saturating_mul(1_000_000_000))
    }

    /// The batch-apply policy: >1 object with a transaction interface
    /// available wraps the whole batch in one transaction that commits on
    /// clean exit and aborts on the first hard error. Each object's driver
    /// hash is checked for blankness and its group name for shape before
    /// the apply is attempted.
    pub fn apply_batch(&self, objs: &[StoreObject], author: &[u8]) -> Result<BatchReport, GdbError> {
        let mut report = BatchReport::default();
        let use_transaction = objs.len() > 1 && self.driver.transaction_start().is_ok();

        let result = (|| {
            for obj in objs {
                if obj.driver_hash().is_blank() {
                    tracing::warn!(target: "gdb", group = %obj.group, "skipping object with blank driver hash");
                    report.skipped += 1;
                    continue;
                }
                let group_exists = self.driver.read_count_store(&obj.group).unwrap_or(0) > 0;
                if validate_group_name(&obj.group).is_err() && !(obj.is_erase() && !group_exists) {
                    tracing::warn!(target: "gdb", group = %obj.group, "skipping object with invalid group name");
                    report.skipped += 1;
                    continue;
                }
                match self.apply(obj, author) {
                    Ok(ApplyOutcome::Applied) => report.applied += 1,
                    Ok(ApplyOutcome::NotFound) => report.not_found += 1,
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })();

        if use_transaction {
            self.driver.transaction_end(result.is_ok())?;
        }
        result?;
        Ok(report)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub not_found: usize,
    pub skipped: usize,
}

fn now_nanos() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redb_driver::RedbDriver;
    use corenet_types::{OpType, StoreFlags};

    fn sample(group: &str, key: &[u8], ts: u64, crc: u64, pinned: bool, author: &[u8]) -> StoreObject {
        StoreObject {
            group: group.into(),
            key: key.to_vec(),
            value: b"v".to_vec(),
            flags: if pinned { StoreFlags::PINNED } else { StoreFlags::empty() },
            signature: author.to_vec(),
            timestamp: ts,
            crc,
            op_type: OpType::Add,
        }
    }

    fn gdb() -> (GlobalDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(RedbDriver::open(&dir.path().join("db.redb")).unwrap());
        (GlobalDb::new(driver, 3600), dir)
    }

    #[test]
    fn pinned_record_rejects_a_different_author() {
        let (db, _dir) = gdb();
        db.apply(&sample("g", b"k", 10, 1, true, b"alice"), b"alice").unwrap();
        let result = db.apply(&sample("g", b"k", 20, 2, true, b"mallory"), b"mallory");
        assert!(matches!(result, Err(GdbError::PinnedByAnotherAuthor)));
    }

    #[test]
    fn pinned_record_accepts_its_own_author() {
        let (db, _dir) = gdb();
        db.apply(&sample("g", b"k", 10, 1, true, b"alice"), b"alice").unwrap();
        let result = db.apply(&sample("g", b"k", 20, 2, true, b"alice"), b"alice");
        assert!(result.is_ok());
    }

    #[test]
    fn batch_apply_skips_blank_driver_hashes() {
        let (db, _dir) = gdb();
        let mut blank = sample("g", b"k1", 0, 0, false, b"a");
        blank.timestamp = 0;
        blank.crc = 0;
        let good = sample("g", b"k2", 5, 1, false, b"a");
        let report = db.apply_batch(&[blank, good], b"a").unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.applied, 1);
    }
}
