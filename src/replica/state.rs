// ABOUTME: Replica execution states and the transitions allowed between them.
// ABOUTME: Also maps each state to the glyph used in the audit log.

use serde::{Deserialize, Serialize};

/// Execution state of a replica.
///
/// The workflow engine owns these transitions. `Done`, `Failed` and
/// `Canceled` are terminal: once reached, no further transition is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicaState {
    /// Not yet started.
    Initial,
    /// Executing, or queued to execute.
    Scheduling,
    /// Parked and resumable; holds no execution resources.
    Suspended,
    /// Finished all assigned work.
    Done,
    /// Work failed in the engine.
    Failed,
    /// Stopped by a termination request.
    Canceled,
}

impl ReplicaState {
    /// All states, in lifecycle order.
    pub const ALL: [ReplicaState; 6] = [
        ReplicaState::Initial,
        ReplicaState::Scheduling,
        ReplicaState::Suspended,
        ReplicaState::Done,
        ReplicaState::Failed,
        ReplicaState::Canceled,
    ];

    /// Whether this state is final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReplicaState::Done | ReplicaState::Failed | ReplicaState::Canceled
        )
    }

    /// Whether a replica in this state may move to `next`.
    ///
    /// Re-entering the current non-terminal state is accepted as a no-op.
    pub fn can_transition_to(self, next: ReplicaState) -> bool {
        use ReplicaState::*;

        if self.is_terminal() {
            return false;
        }
        if self == next {
            return true;
        }
        match (self, next) {
            (Initial, Scheduling | Failed | Canceled) => true,
            (Scheduling, Suspended | Done | Failed | Canceled) => true,
            (Suspended, Scheduling | Failed | Canceled) => true,
            _ => false,
        }
    }

    /// Single-character column glyph for the audit log.
    pub fn glyph(self) -> char {
        match self {
            ReplicaState::Initial => '+',
            ReplicaState::Scheduling => '|',
            ReplicaState::Suspended => '-',
            ReplicaState::Done => ' ',
            ReplicaState::Failed => '!',
            ReplicaState::Canceled => 'X',
        }
    }
}

impl std::fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplicaState::Initial => write!(f, "INITIAL"),
            ReplicaState::Scheduling => write!(f, "SCHEDULING"),
            ReplicaState::Suspended => write!(f, "SUSPENDED"),
            ReplicaState::Done => write!(f, "DONE"),
            ReplicaState::Failed => write!(f, "FAILED"),
            ReplicaState::Canceled => write!(f, "CANCELED"),
        }
    }
}
