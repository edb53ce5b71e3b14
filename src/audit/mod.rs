// ABOUTME: Audit module - side-channel records of every state-affecting coordinator event.
// ABOUTME: Provides the AuditSink trait, the append-only dump log, and an in-memory sink.

mod record;
mod sink;

pub use record::{AuditKind, AuditRecord, Highlight};
pub use sink::{AuditSink, DumpLog, MemoryAudit, NoAudit};

#[cfg(test)]
mod sink_test;
