// ABOUTME: AuditRecord - one timestamped line of per-replica glyphs and a label.
// ABOUTME: Replicas involved in an event are highlighted with an event-specific glyph.

use std::sync::Arc;
use std::time::Duration;

use crate::replica::{Replica, ReplicaId};

/// The kind of event an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    Startup,
    Suspend,
    Exchange,
    Resume,
    Terminate,
    Abort,
}

impl AuditKind {
    /// Glyph used for replicas highlighted by this event, if any.
    pub fn highlight_glyph(self) -> Option<char> {
        match self {
            AuditKind::Exchange => Some('v'),
            AuditKind::Resume => Some('^'),
            AuditKind::Terminate => Some('='),
            AuditKind::Abort => Some('#'),
            AuditKind::Startup | AuditKind::Suspend => None,
        }
    }
}

/// Which replicas an event highlights.
#[derive(Debug, Clone, Copy)]
pub enum Highlight<'a> {
    None,
    All,
    Only(&'a [ReplicaId]),
}

impl Highlight<'_> {
    fn contains(&self, id: ReplicaId) -> bool {
        match self {
            Highlight::None => false,
            Highlight::All => true,
            Highlight::Only(ids) => ids.contains(&id),
        }
    }
}

/// A single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Time since the coordinator started.
    pub elapsed: Duration,
    pub kind: AuditKind,
    /// One glyph per replica, in ensemble order.
    pub glyphs: String,
    pub label: String,
}

impl AuditRecord {
    /// Capture the current state of `ensemble`.
    pub fn capture(
        elapsed: Duration,
        kind: AuditKind,
        ensemble: &[Arc<Replica>],
        highlight: Highlight<'_>,
        label: impl Into<String>,
    ) -> Self {
        let marker = kind.highlight_glyph();
        let glyphs = ensemble
            .iter()
            .map(|r| match marker {
                Some(glyph) if highlight.contains(r.id()) => glyph,
                _ => r.state().glyph(),
            })
            .collect();

        Self {
            elapsed,
            kind,
            glyphs,
            label: label.into(),
        }
    }

    /// Render as a dump log line, without the trailing newline.
    pub fn render(&self) -> String {
        format!(
            " | {:7.2} |{}| {}",
            self.elapsed.as_secs_f64(),
            self.glyphs,
            self.label
        )
    }
}

impl std::fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
