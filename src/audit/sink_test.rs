// ABOUTME: Tests for audit records and sinks.
// ABOUTME: Verifies glyph columns, highlighting, and dump log append/close behavior.

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::error::AuditError;
use crate::replica::{Replica, ReplicaId, ReplicaState};

fn ensemble() -> Vec<Arc<Replica>> {
    let replicas: Vec<_> = (0..4).map(|i| Arc::new(Replica::new(i))).collect();
    replicas[1].transition(ReplicaState::Scheduling).unwrap();
    replicas[2].transition(ReplicaState::Scheduling).unwrap();
    replicas[2].suspend().unwrap();
    replicas[3].transition(ReplicaState::Failed).unwrap();
    replicas
}

#[test]
fn test_capture_uses_state_glyphs() {
    let record = AuditRecord::capture(
        Duration::from_millis(1500),
        AuditKind::Suspend,
        &ensemble(),
        Highlight::None,
        "",
    );
    assert_eq!(record.glyphs, "+|-!");
    assert_eq!(record.render(), " |    1.50 |+|-!| ");
}

#[test]
fn test_capture_highlights_involved_replicas() {
    let ids = [ReplicaId(0), ReplicaId(2)];
    let record = AuditRecord::capture(
        Duration::ZERO,
        AuditKind::Exchange,
        &ensemble(),
        Highlight::Only(&ids),
        " > 2: [0, 2]",
    );
    assert_eq!(record.glyphs, "v|v!");
    assert!(record.render().ends_with("| > 2: [0, 2]"));
}

#[test]
fn test_suspend_ignores_highlight() {
    let record = AuditRecord::capture(
        Duration::ZERO,
        AuditKind::Suspend,
        &ensemble(),
        Highlight::All,
        "",
    );
    assert_eq!(record.glyphs, "+|-!");
}

#[test]
fn test_terminate_marks_everyone() {
    let record = AuditRecord::capture(
        Duration::ZERO,
        AuditKind::Terminate,
        &ensemble(),
        Highlight::All,
        "terminate",
    );
    assert_eq!(record.glyphs, "====");
}

#[test]
fn test_memory_audit_collects_and_closes() {
    let audit = MemoryAudit::new();
    let record = AuditRecord::capture(
        Duration::ZERO,
        AuditKind::Startup,
        &ensemble(),
        Highlight::None,
        "startup",
    );

    audit.record(&record).unwrap();
    assert_eq!(audit.records().len(), 1);
    assert!(audit.lines()[0].ends_with("| startup"));

    audit.close().unwrap();
    assert!(audit.is_closed());
    assert!(matches!(audit.record(&record), Err(AuditError::Closed)));
}

#[test]
fn test_dump_log_appends_and_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.log");
    let replicas = ensemble();

    let log = DumpLog::open(&path).unwrap();
    let startup = AuditRecord::capture(
        Duration::ZERO,
        AuditKind::Startup,
        &replicas,
        Highlight::None,
        "startup",
    );
    log.record(&startup).unwrap();

    // Flushed after every record, visible before close.
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, format!("{}\n", startup.render()));

    log.close().unwrap();
    assert!(matches!(log.record(&startup), Err(AuditError::Closed)));

    // Reopening appends rather than truncating.
    let log = DumpLog::open(&path).unwrap();
    log.record(&startup).unwrap();
    log.close().unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
}
