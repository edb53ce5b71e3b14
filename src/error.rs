// ABOUTME: Defines all error types for the repex library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under RepexError.

use crate::replica::{ReplicaId, ReplicaState};
use crate::selection::PartitionFault;

/// Top-level error type for the repex library.
#[derive(Debug, thiserror::Error)]
pub enum RepexError {
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("Replica error: {0}")]
    Replica(#[from] ReplicaError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised out of the coordinator's checkpoint calls.
///
/// Every variant is fatal to the ensemble run: the waitlist cannot be
/// repaired locally once one of these has been observed.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Selection policy returned an unusable partition while replica {host} was checking in: {fault}")]
    PartitionInvariantViolation {
        host: ReplicaId,
        fault: PartitionFault,
    },

    #[error(transparent)]
    InvalidStateTransition(#[from] ReplicaError),

    #[error("Replica {0} is not part of this ensemble")]
    UnknownReplica(ReplicaId),

    #[error("Replica {0} is already on the waitlist")]
    AlreadyWaiting(ReplicaId),

    #[error("Replica {0} hosted no exchange")]
    NoExchangePending(ReplicaId),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Coordinator aborted after an earlier fatal error")]
    Aborted,

    #[error("Coordinator has been terminated")]
    Terminated,
}

/// Errors from replica state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicaError {
    #[error("Replica {replica} cannot move from {from} to {to}")]
    InvalidStateTransition {
        replica: ReplicaId,
        from: ReplicaState,
        to: ReplicaState,
    },
}

/// Errors from the workflow engine that executes replica work.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Work failed for replica {replica}: {source}")]
    Work {
        replica: ReplicaId,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Replica(#[from] ReplicaError),

    #[error("Replica {0} is not managed by this engine")]
    UnknownReplica(ReplicaId),

    #[error("Engine is already running")]
    AlreadyRunning,

    #[error("Engine has been shut down")]
    ShutDown,

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[source] Box<CoordinatorError>),
}

impl From<CoordinatorError> for EngineError {
    fn from(err: CoordinatorError) -> Self {
        EngineError::Checkpoint(Box::new(err))
    }
}

/// Errors from audit log output.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Audit log is closed")]
    Closed,
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
