// Path: crates/corenet-stream/src/stream.rs
//! The stream value: one event-socket, a transport, and optionally an
//! obfuscation engine. Either the transport or the engine may be absent
//! on its own; a stream with no obfuscation engine passes bytes through
//! unchanged.

use std::sync::Arc;

use corenet_reactor::EsId;
use corenet_transport::{ObfuscationEngine, TransportTypeId};

/// A logical bidirectional channel: an event-socket, a transport, and an
/// optional obfuscation engine, mirrored from the spec's glossary entry
/// for "Stream".
#[derive(Clone)]
pub struct Stream {
    pub es_id: EsId,
    pub transport_type_id: TransportTypeId,
    pub obfuscation: Option<Arc<ObfuscationEngine>>,
    /// Identifies this stream's session for the obfuscation engine's
    /// polymorphic-magic derivation; stable for the stream's lifetime.
    pub session_nonce: u64,
}

impl Stream {
    pub fn new(es_id: EsId, transport_type_id: TransportTypeId, session_nonce: u64) -> Stream {
        Stream {
            es_id,
            transport_type_id,
            obfuscation: None,
            session_nonce,
        }
    }

    pub fn attach_obfuscation(&mut self, engine: Arc<ObfuscationEngine>) {
        self.obfuscation = Some(engine);
    }

    pub fn detach_obfuscation(&mut self) {
        self.obfuscation = None;
    }

    /// Wraps an outgoing write through the attached engine, if any.
    pub fn wrap_outgoing(&self, data: &[u8]) -> Vec<u8> {
        match &self.obfuscation {
            Some(engine) => engine.obfuscate(self.session_nonce, data),
            None => data.to_vec(),
        }
    }

    /// Unwraps incoming bytes through the attached engine, if any.
    pub fn unwrap_incoming(&self, wire: &[u8]) -> Result<Vec<u8>, corenet_transport::ObfuscationError> {
        match &self.obfuscation {
            Some(engine) => engine.deobfuscate(self.session_nonce, wire),
            None => Ok(wire.to_vec()),
        }
    }
}
