// Path: crates/corenet-cluster/src/link.rs
//! The link manager: maintains each managed network's minimum number of
//! healthy uplinks and bridges link lifecycle events to the business
//! layer, mirroring the `Libp2pSync` command/event split generalized
//! from a single swarm to a table of per-peer links.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use corenet_types::{Guuid, NodeAddress};

use corenet_telemetry::sinks::cluster_metrics;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Established,
    Downlink,
}

/// A logical outbound relation to a peer node address.
pub struct Link {
    pub addr: NodeAddress,
    pub state: LinkState,
    pub attempts: u32,
    pub active_clusters: Vec<Guuid>,
    pub static_clusters: Vec<Guuid>,
    pub networks: Vec<u64>,
    pub start_after: u64,
    pub stream_destroyed: bool,
}

impl Link {
    fn new(addr: NodeAddress, now: u64) -> Link {
        Link {
            addr,
            state: LinkState::Disconnected,
            attempts: 0,
            active_clusters: Vec::new(),
            static_clusters: Vec::new(),
            networks: Vec::new(),
            start_after: now,
            stream_destroyed: false,
        }
    }

    fn should_wake(&self, now: u64) -> bool {
        self.start_after <= now
            && self.state == LinkState::Disconnected
            && (!self.networks.is_empty() || !self.static_clusters.is_empty())
    }

    fn is_alive(&self) -> bool {
        !self.active_clusters.is_empty() || !self.static_clusters.is_empty()
    }
}

/// A network owned by the link manager.
pub struct ManagedNetwork {
    pub network_id: u64,
    pub active: bool,
    pub uplinks: u32,
    pub min_links: u32,
    pub link_clusters: Vec<Guuid>,
}

/// A group-mask + net-name pair with an associated notifier, used by both
/// the "sync groups" and "sync extra groups" lists.
#[derive(Clone)]
pub struct SyncGroupEntry {
    pub group_mask: String,
    pub net_name: String,
}

const IGNORED_TTL_SEC: u64 = 30 * 60;

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Callbacks the link manager invokes on the business layer. Each is
/// optional; a manager with none configured still tracks link/network
/// state, it simply never asks the business layer to act.
#[derive(Default, Clone)]
pub struct LinkManagerCallbacks {
    pub fill_host_port: Option<Arc<dyn Fn(NodeAddress) -> Option<(String, u16)> + Send + Sync>>,
    pub connected: Option<Arc<dyn Fn(NodeAddress, u64) + Send + Sync>>,
    pub disconnected: Option<Arc<dyn Fn(NodeAddress, u64, u32) + Send + Sync>>,
    pub link_request: Option<Arc<dyn Fn(u64) + Send + Sync>>,
}

pub struct LinkManager {
    links: RwLock<HashMap<NodeAddress, Link>>,
    networks: RwLock<Vec<ManagedNetwork>>,
    sync_groups: RwLock<Vec<SyncGroupEntry>>,
    sync_extra_groups: RwLock<Vec<SyncGroupEntry>>,
    ignored: RwLock<HashMap<NodeAddress, u64>>,
    pub max_attempts: u32,
    pub reconnect_delay_sec: u64,
    pub callbacks: LinkManagerCallbacks,
    active: std::sync::atomic::AtomicBool,
}

impl LinkManager {
    pub fn new(max_attempts: u32, reconnect_delay_sec: u64, callbacks: LinkManagerCallbacks) -> LinkManager {
        LinkManager {
            links: RwLock::new(HashMap::new()),
            networks: RwLock::new(Vec::new()),
            sync_groups: RwLock::new(Vec::new()),
            sync_extra_groups: RwLock::new(Vec::new()),
            ignored: RwLock::new(HashMap::new()),
            max_attempts,
            reconnect_delay_sec,
            callbacks,
            active: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, std::sync::atomic::Ordering::SeqCst);
        if !active {
            let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
            for link in links.values_mut() {
                link.active_clusters.clear();
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn add_managed_network(&self, network_id: u64, min_links: u32) {
        self.networks.write().unwrap_or_else(|e| e.into_inner()).push(ManagedNetwork {
            network_id,
            active: true,
            uplinks: 0,
            min_links,
            link_clusters: Vec::new(),
        });
    }

    pub fn register_sync_group(&self, entry: SyncGroupEntry) {
        self.sync_groups.write().unwrap_or_else(|e| e.into_inner()).push(entry);
    }

    pub fn register_sync_extra_group(&self, entry: SyncGroupEntry) {
        self.sync_extra_groups.write().unwrap_or_else(|e| e.into_inner()).push(entry);
    }

    pub fn sync_group_masks(&self, include_extra: bool) -> Vec<SyncGroupEntry> {
        let mut out = self.sync_groups.read().unwrap_or_else(|e| e.into_inner()).clone();
        if include_extra {
            out.extend(self.sync_extra_groups.read().unwrap_or_else(|e| e.into_inner()).clone());
        }
        out
    }

    /// Adds a static-cluster membership to a link, creating the link if
    /// it does not already exist.
    pub fn add_static_cluster(&self, addr: NodeAddress, guuid: Guuid) {
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        let link = links.entry(addr).or_insert_with(|| Link::new(addr, now_unix()));
        if !link.static_clusters.contains(&guuid) {
            link.static_clusters.push(guuid);
        }
    }

    /// Removes a static-cluster membership. If that was the last static
    /// cluster and the last active cluster, the link is destroyed.
    pub fn remove_static_cluster(&self, addr: NodeAddress, guuid: Guuid) {
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        let destroy = if let Some(link) = links.get_mut(&addr) {
            link.static_clusters.retain(|g| *g != guuid);
            !link.is_alive()
        } else {
            false
        };
        if destroy {
            links.remove(&addr);
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn link_state(&self, addr: NodeAddress) -> Option<LinkState> {
        self.links.read().unwrap_or_else(|e| e.into_inner()).get(&addr).map(|l| l.state)
    }

    /// Purges ignored-list entries older than 30 minutes, then reports
    /// whether `addr` is still on it.
    pub fn is_ignored(&self, addr: NodeAddress) -> bool {
        let now = now_unix();
        let mut ignored = self.ignored.write().unwrap_or_else(|e| e.into_inner());
        ignored.retain(|_, marked_at| now.saturating_sub(*marked_at) < IGNORED_TTL_SEC);
        ignored.contains_key(&addr)
    }

    pub fn mark_ignored(&self, addr: NodeAddress) {
        self.ignored.write().unwrap_or_else(|e| e.into_inner()).insert(addr, now_unix());
    }

    /// One iteration of the ~2s periodic loop's wake-up pass.
    pub fn wake_up_pass(&self) {
        if !self.is_active() {
            return;
        }
        let now = now_unix();
        let due: Vec<NodeAddress> = {
            let links = self.links.read().unwrap_or_else(|e| e.into_inner());
            links.values().filter(|l| l.should_wake(now)).map(|l| l.addr).collect()
        };
        for addr in due {
            let Some(fill) = &self.callbacks.fill_host_port else { continue };
            if fill(addr).is_some() {
                let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
                if let Some(link) = links.get_mut(&addr) {
                    link.state = LinkState::Connecting;
                }
            }
        }
    }

    /// One iteration of the ~2s periodic loop's request pass.
    pub fn request_pass(&self) {
        if !self.is_active() {
            return;
        }
        let under_target: Vec<u64> = {
            let networks = self.networks.read().unwrap_or_else(|e| e.into_inner());
            networks
                .iter()
                .filter(|n| n.active && n.uplinks < n.min_links)
                .map(|n| n.network_id)
                .collect()
        };
        for network_id in under_target {
            if let Some(cb) = &self.callbacks.link_request {
                cb(network_id);
            }
        }
    }

    /// On `connected`.
    pub fn on_connected(&self, addr: NodeAddress) {
        let networks: Vec<u64> = {
            let links = self.links.read().unwrap_or_else(|e| e.into_inner());
            links.get(&addr).map(|l| l.networks.clone()).unwrap_or_default()
        };
        for network_id in networks {
            if let Some(cb) = &self.callbacks.connected {
                cb(addr, network_id);
            }
        }
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        if let Some(link) = links.get_mut(&addr) {
            link.state = LinkState::Established;
            link.attempts = 0;
        }
    }

    /// On `error`/`disconnect`.
    pub fn on_disconnected(&self, addr: NodeAddress, peer_count: u32) {
        let (should_retry, networks) = {
            let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
            let Some(link) = links.get_mut(&addr) else { return };
            link.attempts += 1;
            if link.attempts < self.max_attempts {
                link.state = LinkState::Disconnected;
                link.start_after = now_unix() + self.reconnect_delay_sec;
                (true, Vec::new())
            } else {
                link.state = LinkState::Disconnected;
                (false, link.networks.clone())
            }
        };

        if should_retry {
            return;
        }

        for network_id in &networks {
            if let Some(cb) = &self.callbacks.disconnected {
                cb(addr, *network_id, peer_count);
            }
        }

        let destroy = {
            let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
            if let Some(link) = links.get_mut(&addr) {
                link.networks.clear();
                !link.is_alive()
            } else {
                false
            }
        };
        if destroy {
            self.links.write().unwrap_or_else(|e| e.into_inner()).remove(&addr);
        }
    }

    pub fn set_uplinks(&self, network_id: u64, uplinks: u32) {
        let mut networks = self.networks.write().unwrap_or_else(|e| e.into_inner());
        if let Some(n) = networks.iter_mut().find(|n| n.network_id == network_id) {
            n.uplinks = uplinks;
            cluster_metrics().set_links_established(&network_id.to_string(), uplinks as i64);
        }
    }

    pub fn exclude_set_from(&self, addrs: impl IntoIterator<Item = NodeAddress>) -> HashSet<NodeAddress> {
        addrs.into_iter().collect()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_cluster_creates_and_later_destroys_the_link() {
        let mgr = LinkManager::new(3, 5, LinkManagerCallbacks::default());
        let addr = NodeAddress(1);
        let guuid = Guuid { network_id: 1, service_id: 1 };
        mgr.add_static_cluster(addr, guuid);
        assert_eq!(mgr.link_count(), 1);
        mgr.remove_static_cluster(addr, guuid);
        assert_eq!(mgr.link_count(), 0);
    }

    #[test]
    fn ignored_list_expires_after_thirty_minutes() {
        let mgr = LinkManager::new(3, 5, LinkManagerCallbacks::default());
        let addr = NodeAddress(2);
        mgr.ignored.write().unwrap().insert(addr, now_unix() - IGNORED_TTL_SEC - 1);
        assert!(!mgr.is_ignored(addr));
    }

    #[test]
    fn retry_budget_gates_disconnect_notification() {
        let notified = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let n2 = notified.clone();
        let callbacks = LinkManagerCallbacks {
            disconnected: Some(Arc::new(move |_, _, _| {
                n2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })),
            ..Default::default()
        };
        let mgr = LinkManager::new(2, 1, callbacks);
        let addr = NodeAddress(3);
        let guuid = Guuid { network_id: 1, service_id: 2 };
        mgr.add_static_cluster(addr, guuid);

        mgr.on_disconnected(addr, 0);
        assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 0);
        mgr.on_disconnected(addr, 0);
        assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
