// Path: crates/corenet-transport/src/registry.rs
//! The transport registry: a hash table of transports keyed by a small
//! integer type id, each offering an operations table that the stream
//! layer drives without knowing the concrete carrier.

use std::sync::{Arc, RwLock};

use corenet_primitives::KeyedTable;
use corenet_reactor::EventSocket;
use thiserror::Error;

use crate::obfuscation::ObfuscationEngine;

pub type TransportTypeId = u16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SocketKind {
    Tcp,
    UdpDatagram,
    UdpStreamLike,
    Other,
}

/// Parameters for a client connection attempt, passed to `stage_prepare`.
#[derive(Clone, Debug)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport name exceeds 63 bytes")]
    NameTooLong,
    #[error("transport {0} has no stage_prepare hook; callers must not silently fall back")]
    StagePrepareUnavailable(TransportTypeId),
    #[error("no transport registered for type id {0}")]
    UnknownTypeId(TransportTypeId),
    #[error("no transport registered with name {0:?}")]
    UnknownName(String),
    #[error("transport op failed with code {0}")]
    OpFailed(i32),
}

/// Per-transport operations. Every hook defaults to a platform-neutral
/// no-op except `stage_prepare`, which defaults to "unavailable" so the
/// registry can fail fast instead of silently falling back.
pub trait TransportOps: Send + Sync + std::fmt::Debug {
    fn init(&self, _config: &corenet_types::ConfigValue) -> Result<(), TransportError> {
        Ok(())
    }
    fn deinit(&self) {}
    fn get_capabilities(&self) -> u32 {
        0
    }
    fn stage_prepare(&self, _params: &ConnectParams) -> Result<EventSocket, TransportError> {
        Err(TransportError::StagePrepareUnavailable(0))
    }
    fn connect(&self, _es: &mut EventSocket) -> Result<(), TransportError> {
        Ok(())
    }
    fn accept(&self, _es: &mut EventSocket) -> Result<(), TransportError> {
        Ok(())
    }
    fn read(&self, _es: &mut EventSocket, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(0)
    }
    fn write(&self, _es: &mut EventSocket, _buf: &[u8]) -> Result<usize, TransportError> {
        Ok(0)
    }
    fn close(&self, _es: &mut EventSocket) {}
}

pub struct TransportEntry {
    pub name: String,
    pub type_id: TransportTypeId,
    pub socket_kind: SocketKind,
    pub capabilities: u32,
    pub has_session_control: bool,
    pub ops: Arc<dyn TransportOps>,
    pub obfuscation: Option<Arc<ObfuscationEngine>>,
}

impl std::fmt::Debug for TransportEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportEntry")
            .field("name", &self.name)
            .field("type_id", &self.type_id)
            .field("socket_kind", &self.socket_kind)
            .field("capabilities", &self.capabilities)
            .field("has_obfuscation", &self.obfuscation.is_some())
            .finish()
    }
}

/// The process-wide registry of transports, keyed by type id. Registering
/// the same id twice is an idempotent success (the existing entry is kept,
/// not replaced); unregistering a missing id is likewise a no-op success.
#[derive(Default)]
pub struct TransportRegistry {
    by_id: RwLock<KeyedTable<TransportTypeId, Arc<TransportEntry>>>,
}

impl TransportRegistry {
    pub fn new() -> TransportRegistry {
        TransportRegistry::default()
    }

    pub fn register(
        &self,
        type_id: TransportTypeId,
        name: impl Into<String>,
        socket_kind: SocketKind,
        ops: Arc<dyn TransportOps>,
        has_session_control: bool,
        obfuscation: Option<Arc<ObfuscationEngine>>,
    ) -> Result<(), TransportError> {
        let name = name.into();
        if name.len() > 63 {
            return Err(TransportError::NameTooLong);
        }
        let mut map = self.by_id.write().unwrap_or_else(|e| e.into_inner());
        if map.contains_key(&type_id) {
            return Ok(());
        }
        let capabilities = ops.get_capabilities();
        map.insert(
            type_id,
            Arc::new(TransportEntry {
                name,
                type_id,
                socket_kind,
                capabilities,
                has_session_control,
                ops,
                obfuscation,
            }),
        );
        Ok(())
    }

    pub fn unregister(&self, type_id: TransportTypeId) {
        let mut map = self.by_id.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = map.remove(&type_id) {
            entry.ops.deinit();
        }
    }

    pub fn get(&self, type_id: TransportTypeId) -> Option<Arc<TransportEntry>> {
        self.by_id.read().unwrap_or_else(|e| e.into_inner()).get(&type_id).cloned()
    }

    /// Linear lookup by name, as the spec requires (the id-keyed hash
    /// table is the primary index).
    pub fn get_by_name(&self, name: &str) -> Option<Arc<TransportEntry>> {
        self.by_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .find(|entry| entry.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.by_id.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NullOps;
    impl TransportOps for NullOps {
        fn get_capabilities(&self) -> u32 {
            0xF0
        }
    }

    #[test]
    fn register_is_idempotent_and_keeps_first_entry() {
        let reg = TransportRegistry::new();
        reg.register(1, "tcp", SocketKind::Tcp, Arc::new(NullOps), false, None)
            .unwrap();
        reg.register(1, "tcp-replacement", SocketKind::Tcp, Arc::new(NullOps), false, None)
            .unwrap();
        assert_eq!(reg.get(1).unwrap().name, "tcp");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregister_is_idempotent() {
        let reg = TransportRegistry::new();
        reg.unregister(99);
        reg.register(2, "udp", SocketKind::UdpDatagram, Arc::new(NullOps), false, None)
            .unwrap();
        reg.unregister(2);
        reg.unregister(2);
        assert!(reg.get(2).is_none());
    }

    #[test]
    fn lookup_by_name_is_linear_but_works() {
        let reg = TransportRegistry::new();
        reg.register(5, "websocket", SocketKind::Tcp, Arc::new(NullOps), true, None)
            .unwrap();
        let entry = reg.get_by_name("websocket").unwrap();
        assert_eq!(entry.type_id, 5);
        assert!(reg.get_by_name("missing").is_none());
    }

    #[test]
    fn capability_bitmask_is_cached_at_register_time() {
        let reg = TransportRegistry::new();
        reg.register(7, "dns-tunnel", SocketKind::Other, Arc::new(NullOps), false, None)
            .unwrap();
        assert_eq!(reg.get(7).unwrap().capabilities, 0xF0);
    }

    #[test]
    fn stage_prepare_fails_fast_when_absent() {
        let ops = NullOps;
        let err = ops.stage_prepare(&ConnectParams {
            host: "example".into(),
            port: 443,
            tls: true,
        });
        assert!(matches!(err, Err(TransportError::StagePrepareUnavailable(_))));
    }
}
