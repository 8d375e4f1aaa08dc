// Path: crates/corenet-reactor/src/socket.rs
//! The event-socket value type and its callback table.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use corenet_types::NodeAddress;

use crate::WorkerId;

/// Monotonic (within the process) identifier for an event-socket.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EsId(pub u64);

/// What kind of I/O object an event-socket wraps.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EsType {
    RawSocket,
    Udp,
    TcpClient,
    Listening,
    Queue,
    Event,
    Timer,
    File,
    SslClient,
}

impl EsType {
    /// Whether this type participates in the idle-timeout activity check.
    pub fn is_tcp_client_like(self) -> bool {
        matches!(self, EsType::TcpClient | EsType::SslClient)
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct EsFlags: u32 {
        const READY_TO_READ  = 0b0000_0001;
        const READY_TO_WRITE = 0b0000_0010;
        const CONNECTING     = 0b0000_0100;
        const SIGNAL_CLOSE   = 0b0000_1000;
        const REASSIGN_ONCE  = 0b0001_0000;
        const PINNED         = 0b0010_0000;
        /// Set once a cross-worker reassignment has actually happened,
        /// distinct from the `REASSIGN_ONCE` permission flag.
        const REASSIGNED     = 0b0100_0000;
        /// Set so a redirect's delete callback skips user notification;
        /// mirrored from the HTTP client layer in `corenet-stream`.
        const SUPPRESS_DELETE_CALLBACK = 0b1000_0000;
    }
}

/// The per-socket callback table. Every hook is optional; a missing hook
/// is simply skipped. Hooks run on the owning worker's thread.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub connected: Option<Arc<dyn Fn(&mut EventSocket) + Send + Sync>>,
    pub read: Option<Arc<dyn Fn(&mut EventSocket) + Send + Sync>>,
    pub write: Option<Arc<dyn Fn(&mut EventSocket) + Send + Sync>>,
    pub error: Option<Arc<dyn Fn(&mut EventSocket, i32) + Send + Sync>>,
    pub delete: Option<Arc<dyn Fn(&mut EventSocket) + Send + Sync>>,
    pub new: Option<Arc<dyn Fn(&mut EventSocket) + Send + Sync>>,
    pub worker_assign: Option<Arc<dyn Fn(&mut EventSocket) + Send + Sync>>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("connected", &self.connected.is_some())
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .field("error", &self.error.is_some())
            .field("delete", &self.delete.is_some())
            .field("new", &self.new.is_some())
            .field("worker_assign", &self.worker_assign.is_some())
            .finish()
    }
}

/// A value type owned by exactly one worker at a time.
#[derive(Debug)]
pub struct EventSocket {
    pub id: EsId,
    pub es_type: EsType,
    pub peer: NodeAddress,
    pub flags: EsFlags,
    pub input: Vec<u8>,
    pub output: Vec<u8>,
    pub last_active: u64,
    pub callbacks: Callbacks,
    /// Opaque user argument handed back to every callback invocation, the
    /// same role `arg` plays in the callback table the spec describes.
    pub arg: Option<Arc<dyn std::any::Any + Send + Sync>>,
    pub owner: Option<WorkerId>,
}

impl EventSocket {
    pub fn new(id: EsId, es_type: EsType, peer: NodeAddress, callbacks: Callbacks) -> EventSocket {
        EventSocket {
            id,
            es_type,
            peer,
            flags: EsFlags::REASSIGN_ONCE,
            input: Vec::new(),
            output: Vec::new(),
            last_active: now_unix(),
            callbacks,
            arg: None,
            owner: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_active = now_unix();
    }

    pub fn is_idle_past(&self, connection_timeout_sec: u64, now: u64) -> bool {
        self.es_type.is_tcp_client_like()
            && !self.flags.contains(EsFlags::PINNED)
            && self.last_active.saturating_add(connection_timeout_sec) <= now
    }
}

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
