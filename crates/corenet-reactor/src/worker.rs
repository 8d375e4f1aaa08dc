// Path: crates/corenet-reactor/src/worker.rs
//! The worker loop itself: a `tokio::select!` over socket I/O traffic and
//! the worker's command queues, generalized from the single swarm-loop
//! task into a fixed pool of `0..N-1` equivalent workers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};

use corenet_telemetry::sinks::reactor_metrics;

use crate::error::ReactorError;
use crate::socket::{now_unix, EsId, EventSocket};

/// Identifies one worker among the fixed `0..N-1` pool.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WorkerId(pub usize);

tokio::task_local! {
    static CURRENT_WORKER: WorkerId;
}

/// Returns the worker whose task is calling, or `None` off-worker.
pub fn current_worker() -> Option<WorkerId> {
    CURRENT_WORKER.try_with(|w| *w).ok()
}

enum WorkerCommand {
    Add(EventSocket, Option<oneshot::Sender<Result<(), ReactorError>>>),
    Take(EsId, oneshot::Sender<Option<EventSocket>>),
    Exec(Box<dyn FnOnce() + Send>),
    Shutdown,
}

/// A lightweight, cloneable reference to a running worker. Shared by every
/// part of the system that needs to hand sockets or callbacks to it.
#[derive(Clone)]
pub struct WorkerHandle {
    pub id: WorkerId,
    cmd_tx: mpsc::Sender<WorkerCommand>,
    socket_count: Arc<AtomicUsize>,
    registry: Arc<DashMap<EsId, WorkerId>>,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle").field("id", &self.id).finish()
    }
}

impl WorkerHandle {
    pub fn socket_count(&self) -> usize {
        self.socket_count.load(Ordering::Relaxed)
    }

    /// Moves ownership of `es` to this worker. See [`crate::WorkerPool::add_events_socket`]
    /// for the full contract; this is the per-handle entry point it calls.
    pub async fn add_events_socket(&self, mut es: EventSocket) -> Result<(), ReactorError> {
        if let Some(existing) = self.registry.get(&es.id).map(|r| *r) {
            if existing == self.id {
                return Ok(());
            }
            return Err(ReactorError::AlreadyOwnedElsewhere(es.id));
        }
        es.owner = Some(self.id);
        self.registry.insert(es.id, self.id);

        if current_worker() == Some(self.id) {
            self.cmd_tx
                .send(WorkerCommand::Add(es, None))
                .await
                .map_err(|_| ReactorError::WorkerGone(self.id))
        } else {
            let (tx, rx) = oneshot::channel();
            self.cmd_tx
                .send(WorkerCommand::Add(es, Some(tx)))
                .await
                .map_err(|_| ReactorError::WorkerGone(self.id))?;
            rx.await.map_err(|_| ReactorError::WorkerGone(self.id))?
        }
    }

    /// Queues `f` to run on this worker's thread. All queue traffic shares
    /// one ordered channel, so this is FIFO against other posts rather
    /// than genuinely priority-ordered.
    pub async fn exec_callback(&self, f: impl FnOnce() + Send + 'static) -> Result<(), ReactorError> {
        self.cmd_tx
            .send(WorkerCommand::Exec(Box::new(f)))
            .await
            .map_err(|_| ReactorError::WorkerGone(self.id))
    }

    pub(crate) async fn take(&self, id: EsId) -> Option<EventSocket> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(WorkerCommand::Take(id, tx)).await.ok()?;
        rx.await.ok().flatten()
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(WorkerCommand::Shutdown).await;
    }
}

struct WorkerState {
    id: WorkerId,
    sockets: HashMap<EsId, EventSocket>,
    connection_timeout_sec: u64,
    registry: Arc<DashMap<EsId, WorkerId>>,
    socket_count: Arc<AtomicUsize>,
}

impl WorkerState {
    fn insert(&mut self, mut es: EventSocket) {
        es.owner = Some(self.id);
        let is_new = !self.sockets.contains_key(&es.id);
        if is_new {
            if let Some(cb) = es.callbacks.new.clone() {
                cb(&mut es);
            }
            if let Some(cb) = es.callbacks.worker_assign.clone() {
                cb(&mut es);
            }
        }
        self.sockets.insert(es.id, es);
        self.socket_count.store(self.sockets.len(), Ordering::Relaxed);
        reactor_metrics().set_event_sockets(&format!("{}", self.id.0), self.sockets.len() as i64);
    }

    fn remove(&mut self, id: EsId) -> Option<EventSocket> {
        let removed = self.sockets.remove(&id);
        if removed.is_some() {
            self.registry.remove(&id);
            self.socket_count.store(self.sockets.len(), Ordering::Relaxed);
            reactor_metrics().set_event_sockets(&format!("{}", self.id.0), self.sockets.len() as i64);
        }
        removed
    }

    fn run_activity_check(&mut self) {
        let now = now_unix();
        let timed_out: Vec<EsId> = self
            .sockets
            .iter()
            .filter(|(_, es)| es.is_idle_past(self.connection_timeout_sec, now))
            .map(|(id, _)| *id)
            .collect();
        for id in timed_out {
            if let Some(mut es) = self.remove(id) {
                if let Some(cb) = es.callbacks.error.clone() {
                    cb(&mut es, libc_etimedout());
                }
                if let Some(cb) = es.callbacks.delete.clone() {
                    cb(&mut es);
                }
                reactor_metrics().inc_activity_timeouts(&format!("{}", self.id.0));
            }
        }
    }
}

/// `ETIMEDOUT` without depending on `libc`: the numeric value is stable
/// across the Unix targets this core ships on.
fn libc_etimedout() -> i32 {
    110
}

async fn run_worker_loop(
    mut state: WorkerState,
    mut cmd_rx: mpsc::Receiver<WorkerCommand>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let half_timeout = Duration::from_secs((state.connection_timeout_sec / 2).max(1));
    let mut activity_timer = interval(half_timeout);
    activity_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = activity_timer.tick() => {
                state.run_activity_check();
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    None => break,
                    Some(WorkerCommand::Shutdown) => break,
                    Some(WorkerCommand::Add(es, ack)) => {
                        state.insert(es);
                        if let Some(ack) = ack {
                            let _ = ack.send(Ok(()));
                        }
                    }
                    Some(WorkerCommand::Take(id, reply)) => {
                        let taken = state.sockets.remove(&id);
                        if taken.is_some() {
                            state.socket_count.store(state.sockets.len(), Ordering::Relaxed);
                        }
                        let _ = reply.send(taken);
                    }
                    Some(WorkerCommand::Exec(f)) => {
                        f();
                    }
                }
            }
        }
    }

    for (_, mut es) in state.sockets.drain() {
        state.registry.remove(&es.id);
        if let Some(cb) = es.callbacks.delete.clone() {
            cb(&mut es);
        }
    }
}

/// Spawns a new worker with the given idle-connection timeout and returns
/// a handle plus a shutdown sender owned by the pool.
pub fn spawn_worker(
    id: WorkerId,
    connection_timeout_sec: u64,
    registry: Arc<DashMap<EsId, WorkerId>>,
) -> (WorkerHandle, watch::Sender<bool>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(1024);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let socket_count = Arc::new(AtomicUsize::new(0));

    let state = WorkerState {
        id,
        sockets: HashMap::new(),
        connection_timeout_sec,
        registry: registry.clone(),
        socket_count: socket_count.clone(),
    };

    tokio::spawn(CURRENT_WORKER.scope(id, run_worker_loop(state, cmd_rx, shutdown_rx)));

    (
        WorkerHandle {
            id,
            cmd_tx,
            socket_count,
            registry,
        },
        shutdown_tx,
    )
}
