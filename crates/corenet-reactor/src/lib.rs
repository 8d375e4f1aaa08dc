// Path: crates/corenet-reactor/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # corenet-reactor
//!
//! The worker/reactor layer: a fixed pool of workers, each single-
//! threaded from the perspective of the event-sockets it owns, driven by
//! a `tokio::select!` loop in the manner of the swarm-command loop this
//! crate generalizes. No two workers ever touch the same event-socket
//! concurrently because ownership is tracked in one shared registry and
//! every mutation happens inside the owning worker's task.

mod error;
mod pool;
mod socket;
mod worker;

pub use error::ReactorError;
pub use pool::WorkerPool;
pub use socket::{now_unix, Callbacks, EsFlags, EsId, EsType, EventSocket};
pub use worker::{current_worker, WorkerHandle, WorkerId};

#[cfg(test)]
mod tests {
    use super::*;
    use corenet_types::NodeAddress;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn add_events_socket_is_idempotent_for_the_same_owner() {
        let pool = WorkerPool::worker_init(2, 30);
        let es = EventSocket::new(EsId(1), EsType::Event, NodeAddress::UNSET, Callbacks::default());
        pool.add_events_socket(WorkerId(0), es).await.unwrap();

        let es_again = EventSocket::new(EsId(1), EsType::Event, NodeAddress::UNSET, Callbacks::default());
        assert!(pool.add_events_socket(WorkerId(0), es_again).await.is_ok());
        pool.shutdown_all().await;
    }

    #[tokio::test]
    async fn add_events_socket_rejects_cross_worker_without_reassign() {
        let pool = WorkerPool::worker_init(2, 30);
        let es = EventSocket::new(EsId(7), EsType::Event, NodeAddress::UNSET, Callbacks::default());
        pool.add_events_socket(WorkerId(0), es).await.unwrap();

        let dup = EventSocket::new(EsId(7), EsType::Event, NodeAddress::UNSET, Callbacks::default());
        let err = pool.add_events_socket(WorkerId(1), dup).await.unwrap_err();
        assert!(matches!(err, ReactorError::AlreadyOwnedElsewhere(_)));
        pool.shutdown_all().await;
    }

    #[tokio::test]
    async fn auto_assign_prefers_the_least_loaded_worker() {
        let pool = WorkerPool::worker_init(2, 30);
        for i in 0..3 {
            let es = EventSocket::new(EsId(i), EsType::Event, NodeAddress::UNSET, Callbacks::default());
            pool.add_events_socket_auto(es).await.unwrap();
        }
        // Give the workers' Add commands a tick to land before inspecting counts.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let counts: Vec<usize> = (0..2)
            .map(|i| pool.worker(WorkerId(i)).map(|w| w.socket_count()).unwrap_or(0))
            .collect();
        assert_eq!(counts.iter().sum::<usize>(), 3);
        pool.shutdown_all().await;
    }

    #[tokio::test]
    async fn new_and_worker_assign_fire_once_on_first_add() {
        let pool = WorkerPool::worker_init(1, 30);
        let new_calls = Arc::new(AtomicUsize::new(0));
        let assign_calls = Arc::new(AtomicUsize::new(0));
        let mut callbacks = Callbacks::default();
        let nc = new_calls.clone();
        callbacks.new = Some(Arc::new(move |_es| {
            nc.fetch_add(1, Ordering::SeqCst);
        }));
        let ac = assign_calls.clone();
        callbacks.worker_assign = Some(Arc::new(move |_es| {
            ac.fetch_add(1, Ordering::SeqCst);
        }));

        let es = EventSocket::new(EsId(42), EsType::Event, NodeAddress::UNSET, callbacks);
        pool.add_events_socket(WorkerId(0), es).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(new_calls.load(Ordering::SeqCst), 1);
        assert_eq!(assign_calls.load(Ordering::SeqCst), 1);
        pool.shutdown_all().await;
    }

    #[tokio::test]
    async fn exec_callback_runs_on_the_targeted_worker() {
        let pool = WorkerPool::worker_init(1, 30);
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        pool.exec_callback_on(WorkerId(0), move || {
            if let Some(tx) = tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
                let _ = tx.send(current_worker());
            }
        })
        .await
        .unwrap();

        let seen = rx.await.unwrap();
        assert_eq!(seen, Some(WorkerId(0)));
        pool.shutdown_all().await;
    }
}
