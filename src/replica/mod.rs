// ABOUTME: Replica module - handles to the independent cyclic workers of an ensemble.
// ABOUTME: Contains the replica state machine and the audit glyph table.

mod replica;
mod state;

pub use replica::{Properties, Replica, ReplicaId};
pub use state::ReplicaState;
