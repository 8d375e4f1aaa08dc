// Path: crates/corenet-gdb/src/redb_driver.rs
//! The concrete `redb` backend: one pair of tables per group (a primary
//! key→object table and a driver-hash-ordered index), plus a group
//! directory table so `get_groups_by_mask` doesn't need table enumeration
//! support from `redb` itself. Grounded on the teacher's
//! `storage/src/redb_epoch_store.rs` sharded-table-per-concern layout.

use std::path::Path;
use std::sync::Mutex;

use corenet_types::{store::validate_group_name, DriverHash, OpType, StoreFlags, StoreObject};
use redb::{Database, ReadableTable, TableDefinition};

use crate::driver::{ApplyOutcome, GdbDriver};
use crate::error::GdbError;

const GROUP_DIRECTORY: TableDefinition<&str, ()> = TableDefinition::new("gdb-groups");

fn primary_table_name(group: &str) -> String {
    format!("g/{group}")
}

fn index_table_name(group: &str) -> String {
    format!("i/{group}")
}

fn hash_key(hash: DriverHash) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&hash.timestamp.to_be_bytes());
    out[8..].copy_from_slice(&hash.crc.to_be_bytes());
    out
}

fn encode_obj(obj: &StoreObject) -> Result<Vec<u8>, GdbError> {
    serde_json::to_vec(obj).map_err(|e| GdbError::Encode(e.to_string()))
}

fn decode_obj(bytes: &[u8]) -> Result<StoreObject, GdbError> {
    serde_json::from_slice(bytes).map_err(|e| GdbError::Decode(e.to_string()))
}

/// A `redb`-backed driver. Transactions are modeled as an explicit
/// buffer-then-commit: `transaction_start` opens a pending buffer,
/// `apply_store_obj` appends to it while one is open, `transaction_end`
/// applies the whole buffer inside one `redb::WriteTransaction`. This
/// avoids holding a live `WriteTransaction<'_>` across calls, which would
/// make the driver struct self-referential.
pub struct RedbDriver {
    db: Database,
    pending: Mutex<Option<Vec<StoreObject>>>,
}

impl RedbDriver {
    pub fn open(path: &Path) -> Result<RedbDriver, GdbError> {
        let db = Database::create(path).map_err(|e| GdbError::Backend(e.to_string()))?;
        {
            let w = db.begin_write().map_err(|e| GdbError::Backend(e.to_string()))?;
            w.open_table(GROUP_DIRECTORY).map_err(|e| GdbError::Backend(e.to_string()))?;
            w.commit().map_err(|e| GdbError::Backend(e.to_string()))?;
        }
        Ok(RedbDriver { db, pending: Mutex::new(None) })
    }

    fn remember_group(&self, group: &str) -> Result<(), GdbError> {
        let w = self.db.begin_write().map_err(|e| GdbError::Backend(e.to_string()))?;
        {
            let mut dir = w.open_table(GROUP_DIRECTORY).map_err(|e| GdbError::Backend(e.to_string()))?;
            dir.insert(group, ()).map_err(|e| GdbError::Backend(e.to_string()))?;
        }
        w.commit().map_err(|e| GdbError::Backend(e.to_string()))
    }

    fn apply_one(&self, obj: &StoreObject) -> Result<ApplyOutcome, GdbError> {
        obj.validate_shape().map_err(|e| GdbError::InvalidGroup(e.to_string()))?;
        let primary_name = primary_table_name(&obj.group);
        let index_name = index_table_name(&obj.group);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let index_def: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new(&index_name);

        let erase = obj.flags.contains(StoreFlags::ERASE) || matches!(obj.op_type, OpType::Del);
        let outcome;

        let w = self.db.begin_write().map_err(|e| GdbError::Backend(e.to_string()))?;
        {
            let mut primary = w.open_table(primary_def).map_err(|e| GdbError::Backend(e.to_string()))?;
            let mut index = w.open_table(index_def).map_err(|e| GdbError::Backend(e.to_string()))?;

            let existing = primary
                .get(obj.key.as_slice())
                .map_err(|e| GdbError::Backend(e.to_string()))?
                .map(|v| decode_obj(v.value()))
                .transpose()?;

            if let Some(existing) = &existing {
                if obj.timestamp <= existing.timestamp {
                    return Ok(ApplyOutcome::Applied);
                }
            }

            if erase {
                if existing.is_none() {
                    outcome = ApplyOutcome::NotFound;
                } else {
                    if let Some(existing) = &existing {
                        index
                            .remove(&hash_key(existing.driver_hash()))
                            .map_err(|e| GdbError::Backend(e.to_string()))?;
                    }
                    primary.remove(obj.key.as_slice()).map_err(|e| GdbError::Backend(e.to_string()))?;
                    outcome = ApplyOutcome::Applied;
                }
            } else {
                if let Some(existing) = &existing {
                    index
                        .remove(&hash_key(existing.driver_hash()))
                        .map_err(|e| GdbError::Backend(e.to_string()))?;
                }
                let bytes = encode_obj(obj)?;
                primary
                    .insert(obj.key.as_slice(), bytes.as_slice())
                    .map_err(|e| GdbError::Backend(e.to_string()))?;
                index
                    .insert(&hash_key(obj.driver_hash()), obj.key.as_slice())
                    .map_err(|e| GdbError::Backend(e.to_string()))?;
                outcome = ApplyOutcome::Applied;
            }
        }
        w.commit().map_err(|e| GdbError::Backend(e.to_string()))?;
        self.remember_group(&obj.group)?;
        Ok(outcome)
    }
}

impl GdbDriver for RedbDriver {
    fn apply_store_obj(&self, obj: &StoreObject) -> Result<ApplyOutcome, GdbError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(buf) = pending.as_mut() {
            buf.push(obj.clone());
            return Ok(ApplyOutcome::Applied);
        }
        drop(pending);
        self.apply_one(obj)
    }

    fn read_store_obj(
        &self,
        group: &str,
        key: Option<&[u8]>,
        count: &mut usize,
        with_holes: bool,
    ) -> Result<Vec<StoreObject>, GdbError> {
        validate_group_name(group).map_err(|e| GdbError::InvalidGroup(e.to_string()))?;
        let primary_name = primary_table_name(group);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let Ok(primary) = r.open_table(primary_def) else {
            *count = 0;
            return Ok(Vec::new());
        };

        let limit = *count;
        let mut out = Vec::new();

        if let Some(key) = key {
            if let Some(v) = primary.get(key).map_err(|e| GdbError::Backend(e.to_string()))? {
                let obj = decode_obj(v.value())?;
                if with_holes || !obj.is_erase() {
                    out.push(obj);
                }
            }
        } else {
            for entry in primary.iter().map_err(|e| GdbError::Backend(e.to_string()))? {
                let (_, v) = entry.map_err(|e| GdbError::Backend(e.to_string()))?;
                let obj = decode_obj(v.value())?;
                if with_holes || !obj.is_erase() {
                    out.push(obj);
                }
                if limit != 0 && out.len() >= limit {
                    break;
                }
            }
        }

        *count = out.len();
        Ok(out)
    }

    fn read_last_store_obj(&self, group: &str, with_holes: bool) -> Result<Option<StoreObject>, GdbError> {
        let index_name = index_table_name(group);
        let primary_name = primary_table_name(group);
        let index_def: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new(&index_name);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let (Ok(index), Ok(primary)) = (r.open_table(index_def), r.open_table(primary_def)) else {
            return Ok(None);
        };
        for entry in index.iter().map_err(|e| GdbError::Backend(e.to_string()))?.rev() {
            let (_, key) = entry.map_err(|e| GdbError::Backend(e.to_string()))?;
            if let Some(v) = primary.get(key.value()).map_err(|e| GdbError::Backend(e.to_string()))? {
                let obj = decode_obj(v.value())?;
                if with_holes || !obj.is_erase() {
                    return Ok(Some(obj));
                }
            }
        }
        Ok(None)
    }

    fn read_cond_store_obj(
        &self,
        group: &str,
        hash_from: DriverHash,
        count: &mut usize,
        with_holes: bool,
    ) -> Result<Vec<StoreObject>, GdbError> {
        let index_name = index_table_name(group);
        let primary_name = primary_table_name(group);
        let index_def: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new(&index_name);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let (Ok(index), Ok(primary)) = (r.open_table(index_def), r.open_table(primary_def)) else {
            *count = 0;
            return Ok(Vec::new());
        };

        let limit = *count;
        let from_key = hash_key(hash_from);
        let mut out = Vec::new();
        let range = index
            .range::<&[u8; 16]>(&from_key..)
            .map_err(|e| GdbError::Backend(e.to_string()))?;
        for entry in range {
            let (k, v) = entry.map_err(|e| GdbError::Backend(e.to_string()))?;
            if k.value() == &from_key {
                continue;
            }
            if let Some(value) = primary.get(v.value()).map_err(|e| GdbError::Backend(e.to_string()))? {
                let obj = decode_obj(value.value())?;
                if with_holes || !obj.is_erase() {
                    out.push(obj);
                }
            }
            if limit != 0 && out.len() >= limit {
                break;
            }
        }
        *count = out.len();
        Ok(out)
    }

    fn read_count_store(&self, group: &str) -> Result<usize, GdbError> {
        let primary_name = primary_table_name(group);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let result = match r.open_table(primary_def) {
            Ok(t) => Ok(t.len().map_err(|e| GdbError::Backend(e.to_string()))? as usize),
            Err(_) => Ok(0),
        };
        result
    }

    fn read_hashes(&self, group: &str, hash_from: DriverHash) -> Result<Vec<DriverHash>, GdbError> {
        let index_name = index_table_name(group);
        let index_def: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new(&index_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let Ok(index) = r.open_table(index_def) else {
            return Ok(Vec::new());
        };
        let from_key = hash_key(hash_from);
        let mut out = Vec::new();
        for entry in index.range::<&[u8; 16]>(&from_key..).map_err(|e| GdbError::Backend(e.to_string()))? {
            let (k, _) = entry.map_err(|e| GdbError::Backend(e.to_string()))?;
            let bytes = k.value();
            if bytes == &from_key {
                continue;
            }
            let mut ts = [0u8; 8];
            let mut crc = [0u8; 8];
            ts.copy_from_slice(&bytes[..8]);
            crc.copy_from_slice(&bytes[8..]);
            out.push(DriverHash { timestamp: u64::from_be_bytes(ts), crc: u64::from_be_bytes(crc) });
        }
        Ok(out)
    }

    fn read_store_obj_by_timestamp(
        &self,
        group: &str,
        ts: u64,
        count: &mut usize,
    ) -> Result<Vec<StoreObject>, GdbError> {
        let primary_name = primary_table_name(group);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let Ok(primary) = r.open_table(primary_def) else {
            *count = 0;
            return Ok(Vec::new());
        };
        let limit = *count;
        let mut out = Vec::new();
        for entry in primary.iter().map_err(|e| GdbError::Backend(e.to_string()))? {
            let (_, v) = entry.map_err(|e| GdbError::Backend(e.to_string()))?;
            let obj = decode_obj(v.value())?;
            if obj.timestamp < ts {
                out.push(obj);
            }
            if limit != 0 && out.len() >= limit {
                break;
            }
        }
        *count = out.len();
        Ok(out)
    }

    fn is_obj(&self, group: &str, key: &[u8]) -> Result<bool, GdbError> {
        let primary_name = primary_table_name(group);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let result = match r.open_table(primary_def) {
            Ok(t) => Ok(t.get(key).map_err(|e| GdbError::Backend(e.to_string()))?.is_some()),
            Err(_) => Ok(false),
        };
        result
    }

    fn is_hash(&self, group: &str, hash: DriverHash) -> Result<bool, GdbError> {
        let index_name = index_table_name(group);
        let index_def: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new(&index_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let result = match r.open_table(index_def) {
            Ok(t) => Ok(t.get(&hash_key(hash)).map_err(|e| GdbError::Backend(e.to_string()))?.is_some()),
            Err(_) => Ok(false),
        };
        result
    }

    fn get_by_hash(&self, group: &str, hashes: &[DriverHash]) -> Result<Vec<StoreObject>, GdbError> {
        let index_name = index_table_name(group);
        let primary_name = primary_table_name(group);
        let index_def: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new(&index_name);
        let primary_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&primary_name);
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let (Ok(index), Ok(primary)) = (r.open_table(index_def), r.open_table(primary_def)) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for hash in hashes {
            if let Some(key) = index.get(&hash_key(*hash)).map_err(|e| GdbError::Backend(e.to_string()))? {
                if let Some(v) = primary.get(key.value()).map_err(|e| GdbError::Backend(e.to_string()))? {
                    out.push(decode_obj(v.value())?);
                }
            }
        }
        Ok(out)
    }

    fn get_groups_by_mask(&self, mask: &str) -> Result<Vec<String>, GdbError> {
        let pattern = glob::Pattern::new(mask).map_err(|e| GdbError::BadPattern(e.to_string()))?;
        let r = self.db.begin_read().map_err(|e| GdbError::Backend(e.to_string()))?;
        let dir = r.open_table(GROUP_DIRECTORY).map_err(|e| GdbError::Backend(e.to_string()))?;
        let mut out = Vec::new();
        for entry in dir.iter().map_err(|e| GdbError::Backend(e.to_string()))? {
            let (k, _) = entry.map_err(|e| GdbError::Backend(e.to_string()))?;
            let name = k.value().to_string();
            if pattern.matches(&name) {
                out.push(name);
            }
        }
        Ok(out)
    }

    fn transaction_start(&self) -> Result<(), GdbError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.is_some() {
            return Err(GdbError::TransactionAlreadyActive);
        }
        *pending = Some(Vec::new());
        Ok(())
    }

    fn transaction_end(&self, commit: bool) -> Result<(), GdbError> {
        let buffered = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.take().ok_or(GdbError::NoActiveTransaction)?
        };
        if !commit {
            return Ok(());
        }
        for obj in &buffered {
            self.apply_one(obj)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), GdbError> {
        Ok(())
    }

    fn deinit(&self) -> Result<(), GdbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_types::OpType;

    fn obj(group: &str, key: &[u8], ts: u64, crc: u64) -> StoreObject {
        StoreObject {
            group: group.into(),
            key: key.to_vec(),
            value: b"v".to_vec(),
            flags: StoreFlags::empty(),
            signature: vec![1],
            timestamp: ts,
            crc,
            op_type: OpType::Add,
        }
    }

    #[test]
    fn apply_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        driver.apply_store_obj(&obj("g1", b"k1", 10, 1)).unwrap();
        let mut count = 0;
        let out = driver.read_store_obj("g1", Some(b"k1"), &mut count, true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, b"k1");
    }

    #[test]
    fn older_timestamp_reapply_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        driver.apply_store_obj(&obj("g1", b"k1", 20, 1)).unwrap();
        driver.apply_store_obj(&obj("g1", b"k1", 10, 2)).unwrap();
        let mut count = 0;
        let out = driver.read_store_obj("g1", Some(b"k1"), &mut count, true).unwrap();
        assert_eq!(out[0].timestamp, 20);
    }

    #[test]
    fn erase_of_missing_key_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        let mut erase = obj("g1", b"missing", 5, 1);
        erase.flags |= StoreFlags::ERASE;
        erase.op_type = OpType::Del;
        assert_eq!(driver.apply_store_obj(&erase).unwrap(), ApplyOutcome::NotFound);
    }

    #[test]
    fn get_groups_by_mask_filters_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        driver.apply_store_obj(&obj("peers.active", b"a", 1, 1)).unwrap();
        driver.apply_store_obj(&obj("peers.ignored", b"b", 1, 2)).unwrap();
        driver.apply_store_obj(&obj("stats.uptime", b"c", 1, 3)).unwrap();
        let mut groups = driver.get_groups_by_mask("peers.*").unwrap();
        groups.sort();
        assert_eq!(groups, vec!["peers.active".to_string(), "peers.ignored".to_string()]);
    }

    #[test]
    fn transaction_buffers_until_end_commit() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        driver.transaction_start().unwrap();
        driver.apply_store_obj(&obj("g1", b"k1", 1, 1)).unwrap();
        assert_eq!(driver.read_count_store("g1").unwrap(), 0);
        driver.transaction_end(true).unwrap();
        assert_eq!(driver.read_count_store("g1").unwrap(), 1);
    }

    #[test]
    fn transaction_abort_discards_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        driver.transaction_start().unwrap();
        driver.apply_store_obj(&obj("g1", b"k1", 1, 1)).unwrap();
        driver.transaction_end(false).unwrap();
        assert_eq!(driver.read_count_store("g1").unwrap(), 0);
    }

    #[test]
    fn read_cond_store_obj_returns_only_newer_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RedbDriver::open(&dir.path().join("db.redb")).unwrap();
        driver.apply_store_obj(&obj("g1", b"k1", 10, 1)).unwrap();
        driver.apply_store_obj(&obj("g1", b"k2", 20, 1)).unwrap();
        let mut count = 0;
        let out = driver
            .read_cond_store_obj("g1", DriverHash { timestamp: 10, crc: 1 }, &mut count, true)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, b"k2");
    }
}
