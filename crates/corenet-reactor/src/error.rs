// Path: crates/corenet-reactor/src/error.rs
use thiserror::Error;

use crate::socket::EsId;
use crate::WorkerId;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("event-socket {0:?} is already owned by a different worker")]
    AlreadyOwnedElsewhere(EsId),
    #[error("worker {0:?} has shut down")]
    WorkerGone(WorkerId),
    #[error("event-socket {0:?} has already used its one cross-worker reassignment")]
    ReassignBudgetExhausted(EsId),
    #[error("event-socket {0:?} is not known to this worker")]
    UnknownSocket(EsId),
}
