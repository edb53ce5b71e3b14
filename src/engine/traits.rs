// ABOUTME: Defines the WorkflowEngine and Checkpoints traits.
// ABOUTME: Together they form the contract between coordinator and execution engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{CoordinatorError, EngineError};
use crate::replica::{Replica, ReplicaId};

/// Executes replica work on behalf of the coordinator.
///
/// The engine alone moves replicas into `Done`, `Failed` or `Canceled`.
/// Requests are expected to return promptly; `suspend` in particular is
/// called from inside the coordinator's critical section and must not wait
/// for the replica to actually park.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Queue one more simulation segment, advancing the replica's cycle.
    async fn schedule_segment(&self, replica: &Arc<Replica>) -> Result<(), EngineError>;

    /// Queue an exchange step hosted by `host` over `peers`.
    ///
    /// `peers` includes the host.
    async fn schedule_exchange(
        &self,
        host: &Arc<Replica>,
        peers: &[Arc<Replica>],
    ) -> Result<(), EngineError>;

    /// Withhold execution resources from a replica.
    async fn suspend(&self, replica: &Arc<Replica>) -> Result<(), EngineError>;

    /// Grant execution resources back to a suspended replica.
    async fn resume(&self, replica: &Arc<Replica>) -> Result<(), EngineError>;

    /// Cancel outstanding work and release all resources.
    async fn shutdown(&self) -> Result<(), EngineError>;
}

/// The two calls an engine makes into the coordinator.
///
/// The engine calls `ready_for_exchange` exactly once per completed
/// simulation segment, and `exchange_complete` exactly once per completed
/// exchange step. Errors are fatal to the run.
#[async_trait]
pub trait Checkpoints: Send + Sync {
    /// A replica finished a simulation segment.
    async fn ready_for_exchange(&self, replica: &Arc<Replica>) -> Result<(), CoordinatorError>;

    /// The exchange hosted by `host` finished. Returns the resumed peers.
    async fn exchange_complete(
        &self,
        host: &Arc<Replica>,
    ) -> Result<Vec<ReplicaId>, CoordinatorError>;
}
