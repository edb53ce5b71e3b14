// ABOUTME: Replica handle - identity, cycle counter, watched state, and exchange peers.
// ABOUTME: State changes are validated against the replica state machine.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use super::ReplicaState;
use crate::error::ReplicaError;

/// Opaque key/value attributes consulted by selection policies.
pub type Properties = serde_json::Map<String, Value>;

/// Stable identifier of a replica within its ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(pub u32);

impl std::fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ReplicaId {
    fn from(id: u32) -> Self {
        ReplicaId(id)
    }
}

/// Handle to one independent cyclic worker.
///
/// Replicas are shared as `Arc<Replica>` between the caller, the workflow
/// engine and the coordinator. All mutation goes through interior
/// mutability:
///
/// - **cycle** only ever grows, one step per scheduled simulation segment.
/// - **state** is published on a watch channel so engines can park a worker
///   until it is resumed.
/// - **exchange peers** are set while this replica hosts an exchange and are
///   taken back by the coordinator when the exchange completes.
#[derive(Debug)]
pub struct Replica {
    id: ReplicaId,
    cycle: AtomicU64,
    state: watch::Sender<ReplicaState>,
    exchange_peers: Mutex<Vec<ReplicaId>>,
    properties: RwLock<Properties>,
}

impl Replica {
    /// Create a replica in the `Initial` state with cycle 0.
    pub fn new(id: u32) -> Self {
        Self {
            id: ReplicaId(id),
            cycle: AtomicU64::new(0),
            state: watch::Sender::new(ReplicaState::Initial),
            exchange_peers: Mutex::new(Vec::new()),
            properties: RwLock::new(Properties::new()),
        }
    }

    /// Set a property at construction time.
    pub fn with_property(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.write().insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    /// Number of simulation segments scheduled so far.
    pub fn cycle(&self) -> u64 {
        self.cycle.load(Ordering::Acquire)
    }

    /// Record that one more simulation segment has been scheduled.
    ///
    /// Returns the new cycle number.
    pub fn begin_segment(&self) -> u64 {
        self.cycle.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current execution state.
    pub fn state(&self) -> ReplicaState {
        *self.state.borrow()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ReplicaState> {
        self.state.subscribe()
    }

    /// Move to `next`, returning the previous state.
    ///
    /// Fails with `InvalidStateTransition` and leaves the state untouched if
    /// the move is not allowed, which includes any move out of a terminal
    /// state.
    pub fn transition(&self, next: ReplicaState) -> Result<ReplicaState, ReplicaError> {
        let mut outcome = Ok(next);
        self.state.send_if_modified(|current| {
            let from = *current;
            if !from.can_transition_to(next) {
                outcome = Err(ReplicaError::InvalidStateTransition {
                    replica: self.id,
                    from,
                    to: next,
                });
                return false;
            }
            outcome = Ok(from);
            if from == next {
                return false;
            }
            *current = next;
            true
        });
        outcome
    }

    /// Park this replica.
    pub fn suspend(&self) -> Result<ReplicaState, ReplicaError> {
        self.transition(ReplicaState::Suspended)
    }

    /// Unpark this replica.
    pub fn resume(&self) -> Result<ReplicaState, ReplicaError> {
        self.transition(ReplicaState::Scheduling)
    }

    /// Wait until the replica is neither suspended nor initial.
    ///
    /// Returns the state that ended the wait.
    pub async fn wait_until_runnable(&self) -> ReplicaState {
        let mut rx = self.state.subscribe();
        match rx
            .wait_for(|s| !matches!(s, ReplicaState::Suspended | ReplicaState::Initial))
            .await
        {
            Ok(state) => *state,
            // The sender lives as long as `self`.
            Err(_) => self.state(),
        }
    }

    /// Peers of the exchange this replica is currently hosting.
    pub fn exchange_peers(&self) -> Vec<ReplicaId> {
        self.exchange_peers.lock().clone()
    }

    pub(crate) fn set_exchange_peers(&self, peers: Vec<ReplicaId>) {
        *self.exchange_peers.lock() = peers;
    }

    pub(crate) fn take_exchange_peers(&self) -> Vec<ReplicaId> {
        std::mem::take(&mut *self.exchange_peers.lock())
    }

    /// Read a single property.
    pub fn property(&self, key: &str) -> Option<Value> {
        self.properties.read().get(key).cloned()
    }

    /// Read a property as a number.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.read().get(key).and_then(Value::as_f64)
    }

    /// Replace a property, returning the previous value.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.write().insert(key.into(), value.into())
    }

    /// Snapshot of all properties.
    pub fn properties(&self) -> Properties {
        self.properties.read().clone()
    }
}

impl PartialEq for Replica {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Replica {}
