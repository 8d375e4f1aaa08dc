// Path: crates/corenet-reactor/src/pool.rs
//! The fixed `0..N-1` set of workers and the reassignment operation that
//! moves a socket between two of them.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::error::ReactorError;
use crate::socket::{EsId, EsFlags, EventSocket};
use crate::worker::{spawn_worker, WorkerHandle, WorkerId};

use corenet_telemetry::sinks::reactor_metrics;

/// The process-wide pool of workers, fixed in size at startup.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    shutdown_senders: Vec<watch::Sender<bool>>,
    registry: Arc<DashMap<EsId, WorkerId>>,
    connection_timeout_sec: u64,
}

impl WorkerPool {
    /// `worker_init(connection_timeout_sec)`, generalized to spawn `count`
    /// workers up front since the pool size is fixed for the process.
    pub fn worker_init(count: usize, connection_timeout_sec: u64) -> WorkerPool {
        let registry: Arc<DashMap<EsId, WorkerId>> = Arc::new(DashMap::new());
        let mut workers = Vec::with_capacity(count);
        let mut shutdown_senders = Vec::with_capacity(count);
        for i in 0..count {
            let (handle, shutdown_tx) =
                spawn_worker(WorkerId(i), connection_timeout_sec, registry.clone());
            workers.push(handle);
            shutdown_senders.push(shutdown_tx);
        }
        WorkerPool {
            workers,
            shutdown_senders,
            registry,
            connection_timeout_sec,
        }
    }

    pub fn connection_timeout_sec(&self) -> u64 {
        self.connection_timeout_sec
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn worker(&self, id: WorkerId) -> Option<&WorkerHandle> {
        self.workers.get(id.0)
    }

    /// `worker_add_events_socket`.
    pub async fn add_events_socket(&self, worker: WorkerId, es: EventSocket) -> Result<(), ReactorError> {
        let handle = self.worker(worker).ok_or(ReactorError::WorkerGone(worker))?;
        handle.add_events_socket(es).await
    }

    /// `worker_add_events_socket_auto`: assigns to the least-loaded worker.
    pub async fn add_events_socket_auto(&self, es: EventSocket) -> Result<WorkerId, ReactorError> {
        let target = self
            .workers
            .iter()
            .min_by_key(|w| w.socket_count())
            .ok_or(ReactorError::WorkerGone(WorkerId(0)))?;
        target.add_events_socket(es).await?;
        Ok(target.id)
    }

    /// `worker_exec_callback_on`.
    pub async fn exec_callback_on(
        &self,
        worker: WorkerId,
        f: impl FnOnce() + Send + 'static,
    ) -> Result<(), ReactorError> {
        let handle = self.worker(worker).ok_or(ReactorError::WorkerGone(worker))?;
        handle.exec_callback(f).await
    }

    /// Moves a socket from its current owner to `to`. Consumes the one
    /// permitted reassignment unless `REASSIGN_ONCE` has already been
    /// cleared by the caller (meaning: no further reassignment budget).
    pub async fn reassign(&self, id: EsId, to: WorkerId) -> Result<(), ReactorError> {
        let current_owner = self
            .registry
            .get(&id)
            .map(|r| *r)
            .ok_or(ReactorError::UnknownSocket(id))?;
        if current_owner == to {
            return Ok(());
        }
        let from = self.worker(current_owner).ok_or(ReactorError::WorkerGone(current_owner))?;

        // Peek-then-take: the take RPC itself removes the socket from the
        // source worker's table, so we check the budget on what comes back.
        let taken = from_take(from, id).await.ok_or(ReactorError::UnknownSocket(id))?;
        let mut es = taken;
        if es.flags.contains(EsFlags::REASSIGNED) && es.flags.contains(EsFlags::REASSIGN_ONCE) {
            // Already moved once under a budget of one; restore it to its
            // original owner rather than silently dropping the socket.
            self.registry.insert(id, current_owner);
            let from = self.worker(current_owner).ok_or(ReactorError::WorkerGone(current_owner))?;
            from.add_events_socket(es).await.ok();
            return Err(ReactorError::ReassignBudgetExhausted(id));
        }
        es.flags.insert(EsFlags::REASSIGNED);
        self.registry.remove(&id);

        let handle = self.worker(to).ok_or(ReactorError::WorkerGone(to))?;
        handle.add_events_socket(es).await?;
        reactor_metrics().inc_reassignments();
        Ok(())
    }

    pub async fn shutdown_all(&self) {
        for tx in &self.shutdown_senders {
            let _ = tx.send(true);
        }
    }
}

async fn from_take(handle: &WorkerHandle, id: EsId) -> Option<EventSocket> {
    handle.take(id).await
}
