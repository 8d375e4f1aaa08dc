// Path: crates/corenet-cluster/src/cluster.rs
//! Cluster membership: a process-wide directory of named peer groups,
//! each holding an at-most-one-entry-per-address member table behind its
//! own reader/writer lock.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use corenet_primitives::KeyedTable;
use corenet_types::{Guuid, NodeAddress};
use rand::seq::IteratorRandom;
use thiserror::Error;

use corenet_telemetry::sinks::cluster_metrics;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClusterRole {
    Enabled,
    Disabled,
    Autonomic,
    Embedded,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClusterStatus {
    Enabled,
    Disabled,
}

pub struct Member {
    pub addr: NodeAddress,
    pub role: i32,
    pub info: Option<Arc<dyn Any + Send + Sync>>,
}

pub type AddCallback = Arc<dyn Fn(&Member) + Send + Sync>;
pub type DeleteCallback = Arc<dyn Fn(&Member) + Send + Sync>;

pub struct Cluster {
    pub guuid: Guuid,
    pub mnemonic: Option<String>,
    pub role: ClusterRole,
    pub status: ClusterStatus,
    members: RwLock<KeyedTable<NodeAddress, Member>>,
    pub on_member_add: Option<AddCallback>,
    pub on_member_delete: Option<DeleteCallback>,
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("mnemonic {0:?} is already in use")]
    MnemonicTaken(String),
    #[error("guuid {0} is already in use")]
    GuuidTaken(Guuid),
    #[error("no cluster with guuid {0}")]
    UnknownCluster(Guuid),
    #[error("address {0} is already a member of this cluster")]
    DuplicateMember(NodeAddress),
}

impl Cluster {
    pub fn member_add(&self, addr: NodeAddress, role: i32, info: Option<Arc<dyn Any + Send + Sync>>) -> Result<(), ClusterError> {
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        if members.contains_key(&addr) {
            tracing::warn!(target: "cluster", %addr, "duplicate member add rejected");
            return Err(ClusterError::DuplicateMember(addr));
        }
        let member = Member { addr, role, info };
        members.insert(addr, Member { addr, role, info: member.info.clone() });
        if let Some(cb) = &self.on_member_add {
            cb(&member);
        }
        cluster_metrics().set_cluster_members(
            self.mnemonic.as_deref().unwrap_or("anonymous"),
            members.len() as i64,
        );
        Ok(())
    }

    pub fn member_delete(&self, addr: NodeAddress) -> bool {
        let removed = {
            let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
            members.remove(&addr)
        };
        if let Some(member) = removed {
            if let Some(cb) = &self.on_member_delete {
                cb(&member);
            }
            let count = self.members.read().unwrap_or_else(|e| e.into_inner()).len();
            cluster_metrics().set_cluster_members(self.mnemonic.as_deref().unwrap_or("anonymous"), count as i64);
            true
        } else {
            false
        }
    }

    pub fn delete_all_members(&self) {
        let removed: Vec<Member> = {
            let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
            let addrs: Vec<NodeAddress> = members.keys().copied().collect();
            addrs.into_iter().filter_map(|addr| members.remove(&addr)).collect()
        };
        for member in &removed {
            if let Some(cb) = &self.on_member_delete {
                cb(member);
            }
        }
        cluster_metrics().set_cluster_members(self.mnemonic.as_deref().unwrap_or("anonymous"), 0);
    }

    pub fn member_count(&self) -> usize {
        self.members.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn contains(&self, addr: NodeAddress) -> bool {
        self.members.read().unwrap_or_else(|e| e.into_inner()).contains_key(&addr)
    }

    pub fn addresses(&self) -> Vec<NodeAddress> {
        self.members.read().unwrap_or_else(|e| e.into_inner()).keys().copied().collect()
    }

    /// Iterates members not in `exclude` and invokes `sender` for each.
    /// `sender` stands in for `stream_ch_pkt_send_by_addr`.
    pub fn broadcast(&self, exclude: &std::collections::HashSet<NodeAddress>, mut sender: impl FnMut(NodeAddress)) {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        for addr in members.keys() {
            if !exclude.contains(addr) {
                sender(*addr);
            }
        }
    }

    /// Picks a uniformly-random member address.
    pub fn get_random_link(&self) -> Option<NodeAddress> {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members.keys().choose(&mut rand::thread_rng()).copied()
    }
}

/// The two process-wide indexes over all clusters (by GUUID, by mnemonic).
#[derive(Default)]
pub struct ClusterRegistry {
    by_guuid: RwLock<HashMap<Guuid, Arc<Cluster>>>,
    by_mnemonic: RwLock<HashMap<String, Guuid>>,
}

impl ClusterRegistry {
    pub fn new() -> ClusterRegistry {
        ClusterRegistry::default()
    }

    pub fn cluster_new(
        &self,
        mnemonic: Option<String>,
        guuid: Guuid,
        role: ClusterRole,
    ) -> Result<Arc<Cluster>, ClusterError> {
        let mut by_guuid = self.by_guuid.write().unwrap_or_else(|e| e.into_inner());
        if by_guuid.contains_key(&guuid) {
            return Err(ClusterError::GuuidTaken(guuid));
        }
        if let Some(m) = &mnemonic {
            let by_mnemonic = self.by_mnemonic.read().unwrap_or_else(|e| e.into_inner());
            if by_mnemonic.contains_key(m) {
                return Err(ClusterError::MnemonicTaken(m.clone()));
            }
        }

        let cluster = Arc::new(Cluster {
            guuid,
            mnemonic: mnemonic.clone(),
            role,
            status: ClusterStatus::Enabled,
            members: RwLock::new(KeyedTable::new()),
            on_member_add: None,
            on_member_delete: None,
        });

        by_guuid.insert(guuid, cluster.clone());
        if let Some(m) = mnemonic {
            self.by_mnemonic.write().unwrap_or_else(|e| e.into_inner()).insert(m, guuid);
        }
        Ok(cluster)
    }

    pub fn get(&self, guuid: Guuid) -> Option<Arc<Cluster>> {
        self.by_guuid.read().unwrap_or_else(|e| e.into_inner()).get(&guuid).cloned()
    }

    pub fn get_by_mnemonic(&self, mnemonic: &str) -> Option<Arc<Cluster>> {
        let guuid = *self.by_mnemonic.read().unwrap_or_else(|e| e.into_inner()).get(mnemonic)?;
        self.get(guuid)
    }

    pub fn delete(&self, guuid: Guuid) {
        let mut by_guuid = self.by_guuid.write().unwrap_or_else(|e| e.into_inner());
        if let Some(cluster) = by_guuid.remove(&guuid) {
            cluster.delete_all_members();
            if let Some(m) = &cluster.mnemonic {
                self.by_mnemonic.write().unwrap_or_else(|e| e.into_inner()).remove(m);
            }
        }
    }

    /// `cluster_link_delete_from_all`: removes `addr` from every cluster
    /// whose role is `AUTONOMIC` or `EMBEDDED`.
    pub fn link_delete_from_all(&self, addr: NodeAddress) {
        let clusters: Vec<Arc<Cluster>> = self
            .by_guuid
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|c| matches!(c.role, ClusterRole::Autonomic | ClusterRole::Embedded))
            .cloned()
            .collect();
        for cluster in clusters {
            cluster.member_delete(addr);
        }
    }

    pub fn len(&self) -> usize {
        self.by_guuid.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guuid(n: u64) -> Guuid {
        Guuid {
            network_id: 1,
            service_id: n,
        }
    }

    #[test]
    fn duplicate_mnemonic_or_guuid_fails_creation() {
        let reg = ClusterRegistry::new();
        reg.cluster_new(Some("main".into()), guuid(1), ClusterRole::Enabled).unwrap();
        assert!(matches!(
            reg.cluster_new(Some("main".into()), guuid(2), ClusterRole::Enabled),
            Err(ClusterError::MnemonicTaken(_))
        ));
        assert!(matches!(
            reg.cluster_new(Some("other".into()), guuid(1), ClusterRole::Enabled),
            Err(ClusterError::GuuidTaken(_))
        ));
    }

    #[test]
    fn member_add_rejects_duplicate_address() {
        let reg = ClusterRegistry::new();
        let cluster = reg.cluster_new(None, guuid(5), ClusterRole::Enabled).unwrap();
        let addr = NodeAddress(42);
        cluster.member_add(addr, 0, None).unwrap();
        assert!(matches!(cluster.member_add(addr, 0, None), Err(ClusterError::DuplicateMember(_))));
        assert_eq!(cluster.member_count(), 1);
    }

    #[test]
    fn broadcast_skips_excluded_addresses() {
        let reg = ClusterRegistry::new();
        let cluster = reg.cluster_new(None, guuid(6), ClusterRole::Enabled).unwrap();
        for i in 1..=3u64 {
            cluster.member_add(NodeAddress(i), 0, None).unwrap();
        }
        let mut excluded = std::collections::HashSet::new();
        excluded.insert(NodeAddress(2));
        let mut seen = Vec::new();
        cluster.broadcast(&excluded, |addr| seen.push(addr));
        seen.sort_by_key(|a| a.0);
        assert_eq!(seen, vec![NodeAddress(1), NodeAddress(3)]);
    }

    #[test]
    fn link_delete_from_all_only_touches_autonomic_and_embedded() {
        let reg = ClusterRegistry::new();
        let enabled = reg.cluster_new(Some("e".into()), guuid(7), ClusterRole::Enabled).unwrap();
        let autonomic = reg.cluster_new(Some("a".into()), guuid(8), ClusterRole::Autonomic).unwrap();
        let addr = NodeAddress(99);
        enabled.member_add(addr, 0, None).unwrap();
        autonomic.member_add(addr, 0, None).unwrap();

        reg.link_delete_from_all(addr);

        assert!(enabled.contains(addr));
        assert!(!autonomic.contains(addr));
    }
}
