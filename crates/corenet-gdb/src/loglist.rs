// Path: crates/corenet-gdb/src/loglist.rs
//! The sync log-list (§4.9): a bounded producer/consumer queue of
//! serialized sync packets built for one peer from the driver's current
//! contents, bridging the driver's pull-based reads to a push-style
//! replication stream.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex};

use corenet_types::packet::WireObject;
use corenet_types::GdbPacket;

use corenet_telemetry::sinks::gdb_metrics;

use crate::driver::GdbDriver;
use crate::error::GdbError;

const READ_BATCH: usize = 64;
const ONE_DAY_NANOS: u64 = 24 * 60 * 60 * 1_000_000_000;

#[derive(Clone)]
pub struct LogListItem {
    pub pkt: GdbPacket,
    pub content_hash: u64,
}

/// Expands `sync_group_items` and, if requested, `sync_group_extra_items`
/// masks through the driver's `get_groups_by_mask`, then applies the
/// per-instance allow/deny filter (whitelist wins when both are set).
pub fn collect_groups(
    driver: &dyn GdbDriver,
    group_masks: &[String],
    extra_masks: &[String],
    include_extra: bool,
    whitelist: Option<&str>,
    blacklist: Option<&str>,
) -> Result<Vec<String>, GdbError> {
    let mut masks: Vec<&str> = group_masks.iter().map(String::as_str).collect();
    if include_extra {
        masks.extend(extra_masks.iter().map(String::as_str));
    }

    let mut groups: HashSet<String> = HashSet::new();
    for mask in masks {
        for group in driver.get_groups_by_mask(mask)? {
            groups.insert(group);
        }
    }

    let filtered = if let Some(pattern) = whitelist {
        let glob = glob::Pattern::new(pattern).map_err(|e| GdbError::BadPattern(e.to_string()))?;
        groups.into_iter().filter(|g| glob.matches(g)).collect()
    } else if let Some(pattern) = blacklist {
        let glob = glob::Pattern::new(pattern).map_err(|e| GdbError::BadPattern(e.to_string()))?;
        groups.into_iter().filter(|g| !glob.matches(g)).collect()
    } else {
        groups.into_iter().collect()
    };

    let mut out: Vec<String> = filtered;
    out.sort();
    Ok(out)
}

struct Shared {
    items: Mutex<Vec<LogListItem>>,
    running_bytes: std::sync::atomic::AtomicUsize,
    still_running: std::sync::atomic::AtomicBool,
    cv: Condvar,
    max_bytes: usize,
}

/// A handle shared between the producer thread and the consumer. Cloning
/// is cheap; both sides hold an `Arc<Shared>`.
#[derive(Clone)]
pub struct LogList {
    shared: Arc<Shared>,
}

/// What `log_list_get` returns when there's nothing queued right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drained {
    /// The producer is still working; a caller should poll again.
    StillRunning,
    /// The producer finished; there is nothing more to come.
    Done,
}

impl LogList {
    fn new(max_bytes: usize) -> LogList {
        LogList {
            shared: Arc::new(Shared {
                items: Mutex::new(Vec::new()),
                running_bytes: std::sync::atomic::AtomicUsize::new(0),
                still_running: std::sync::atomic::AtomicBool::new(true),
                cv: Condvar::new(),
                max_bytes,
            }),
        }
    }

    /// Builds a log-list for `groups` against `driver`, spawning the
    /// producer on a blocking thread. Returns `None` if there is nothing
    /// to sync (every group's backlog for `peer_addr_group_key` is
    /// already at zero).
    pub fn build(
        driver: Arc<dyn GdbDriver>,
        groups: Vec<String>,
        last_ids: Vec<(String, u64)>,
        max_bytes: usize,
        peer_label: String,
        store_time_limit_sec: u64,
    ) -> Option<LogList> {
        let total: usize = last_ids.len();
        if total == 0 || groups.is_empty() {
            return None;
        }

        let list = LogList::new(max_bytes);
        let shared = list.shared.clone();
        let last_id_map: std::collections::HashMap<String, u64> = last_ids.into_iter().collect();

        std::thread::spawn(move || {
            run_producer(driver, groups, last_id_map, shared, peer_label, store_time_limit_sec);
        });

        Some(list)
    }

    /// Pops the first queued item. `Ok(None(Drained))` distinguishes
    /// "nothing queued yet, producer still working" from "producer is
    /// done, there is nothing more."
    pub fn get(&self) -> Result<LogListItem, Drained> {
        let mut items = self.shared.items.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(item) = items.first().cloned() {
            items.remove(0);
            let size = item.pkt.serialize().len();
            let before = self.shared.running_bytes.fetch_sub(size, std::sync::atomic::Ordering::SeqCst);
            if before >= self.shared.max_bytes && before.saturating_sub(size) < self.shared.max_bytes {
                self.shared.cv.notify_all();
            }
            return Ok(item);
        }
        if self.shared.still_running.load(std::sync::atomic::Ordering::SeqCst) {
            Err(Drained::StillRunning)
        } else {
            Err(Drained::Done)
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.still_running.load(std::sync::atomic::Ordering::SeqCst)
    }
}

fn run_producer(
    driver: Arc<dyn GdbDriver>,
    groups: Vec<String>,
    last_ids: std::collections::HashMap<String, u64>,
    shared: Arc<Shared>,
    peer_label: String,
    store_time_limit_sec: u64,
) {
    let now = now_nanos();
    let store_time_floor = now.saturating_sub(store_time_limit_sec.saturating_mul(1_000_000_000));

    for group in &groups {
        let is_delete_group = group.ends_with(".del");
        let _last_id = last_ids.get(group).copied().unwrap_or(0);

        let mut count = READ_BATCH;
        loop {
            count = READ_BATCH;
            let batch = match driver.read_store_obj(group, None, &mut count, true) {
                Ok(batch) => batch,
                Err(_) => break,
            };
            if batch.is_empty() {
                break;
            }

            for obj in batch {
                let top32_zero = (obj.timestamp >> 32) == 0;
                let too_far_future = obj.timestamp > now.saturating_add(ONE_DAY_NANOS);
                if top32_zero || too_far_future || obj.group.is_empty() {
                    let _ = driver.apply_store_obj(&corenet_types::StoreObject {
                        op_type: corenet_types::OpType::Del,
                        flags: obj.flags | corenet_types::StoreFlags::ERASE,
                        ..obj.clone()
                    });
                    gdb_metrics().inc_objects_rejected(group, "broken_timestamp_or_group");
                    continue;
                }

                let effective_group = if is_delete_group {
                    group.trim_end_matches(".del").to_string()
                } else {
                    group.clone()
                };

                if is_delete_group && obj.timestamp < store_time_floor {
                    let _ = driver.apply_store_obj(&corenet_types::StoreObject {
                        op_type: corenet_types::OpType::Del,
                        flags: obj.flags | corenet_types::StoreFlags::ERASE,
                        ..obj.clone()
                    });
                    continue;
                }

                let mut wire = WireObject::from_store_object(&obj, 0);
                wire.group = effective_group;
                let content_hash = wire.driver_hash().crc;
                let pkt = GdbPacket::new(now, vec![wire]);

                let size = pkt.serialize().len();
                let item = LogListItem { pkt, content_hash };

                let mut items = shared.items.lock().unwrap_or_else(|e| e.into_inner());
                loop {
                    let current = shared.running_bytes.load(std::sync::atomic::Ordering::SeqCst);
                    if current < shared.max_bytes {
                        break;
                    }
                    items = shared.cv.wait(items).unwrap_or_else(|e| e.into_inner());
                }
                items.push(item);
                let new_total = shared.running_bytes.fetch_add(size, std::sync::atomic::Ordering::SeqCst) + size;
                gdb_metrics().set_log_list_bytes(&peer_label, new_total as i64);
            }

            if count < READ_BATCH {
                break;
            }
        }
    }

    shared.still_running.store(false, std::sync::atomic::Ordering::SeqCst);
    shared.cv.notify_all();
}

/// Apply-on-receiver filtering (§4.9): an incoming object is accepted
/// only if its group matches the local sync masks, and rejected if the
/// locally stored record at the same key is pinned (checked by the
/// caller via [`crate::store::GlobalDb::apply`]).
pub fn receiver_accepts(group: &str, sync_masks: &[String]) -> bool {
    sync_masks.iter().any(|mask| glob::Pattern::new(mask).map(|p| p.matches(group)).unwrap_or(false))
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
    use corenet_types::{OpType, StoreFlags, StoreObject};

    fn driver_with(groups: &[(&str, &[u8], u64)]) -> (Arc<dyn GdbDriver>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(RedbDriver::open(&dir.path().join("db.redb")).unwrap());
        for (group, key, ts) in groups {
            driver
                .apply_store_obj(&StoreObject {
                    group: group.to_string(),
                    key: key.to_vec(),
                    value: b"v".to_vec(),
                    flags: StoreFlags::empty(),
                    signature: vec![1],
                    timestamp: *ts,
                    crc: 1,
                    op_type: OpType::Add,
                })
                .unwrap();
        }
        (driver, dir)
    }

    #[test]
    fn collect_groups_applies_whitelist_over_blacklist() {
        let (driver, _dir) = driver_with(&[("peers.active", b"a", now_nanos()), ("peers.ignored", b"b", now_nanos())]);
        let groups = collect_groups(
            driver.as_ref(),
            &["peers.*".to_string()],
            &[],
            false,
            Some("peers.active"),
            Some("peers.*"),
        )
        .unwrap();
        assert_eq!(groups, vec!["peers.active".to_string()]);
    }

    #[test]
    fn log_list_drains_to_done_when_empty() {
        let (driver, _dir) = driver_with(&[("g", b"k", now_nanos())]);
        let list = LogList::build(
            driver,
            vec!["g".to_string()],
            vec![("g".to_string(), 0)],
            1024 * 1024,
            "peer".to_string(),
            3600,
        )
        .expect("non-empty backlog");

        let mut got_item = false;
        for _ in 0..200 {
            match list.get() {
                Ok(_) => {
                    got_item = true;
                    break;
                }
                Err(Drained::StillRunning) => std::thread::sleep(std::time::Duration::from_millis(5)),
                Err(Drained::Done) => break,
            }
        }
        assert!(got_item);
    }

    #[test]
    fn receiver_accepts_checks_masks() {
        assert!(receiver_accepts("peers.active", &["peers.*".to_string()]));
        assert!(!receiver_accepts("stats.uptime", &["peers.*".to_string()]));
    }
}
