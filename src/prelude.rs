// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use repex::prelude::*;` to get started quickly.

pub use crate::audit::{AuditKind, AuditRecord, AuditSink, DumpLog, MemoryAudit, NoAudit};
pub use crate::coordinator::{CoordinatorBuilder, CoordinatorConfig, ExchangeCoordinator};
pub use crate::engine::{Checkpoints, LocalEngine, Simulation, SleepSimulation, WorkflowEngine};
pub use crate::error::{
    AuditError, ConfigError, CoordinatorError, EngineError, ReplicaError, RepexError,
};
pub use crate::replica::{Properties, Replica, ReplicaId, ReplicaState};
pub use crate::selection::{
    GroupSizePolicy, NearestPropertyPolicy, Partition, PartitionFault, PolicyDescription,
    Selection, SelectionPolicy,
};
