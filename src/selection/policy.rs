// ABOUTME: Defines the SelectionPolicy trait and the decision it returns.
// ABOUTME: Policies also describe themselves for the startup policy artifact.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Partition;
use crate::replica::Replica;

/// The outcome of one policy invocation.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Not enough suitable replicas yet. The newest arrival keeps waiting.
    NotYet,
    /// Split the waitlist into replicas that exchange now and those that wait.
    Exchange(Partition),
}

impl Selection {
    pub fn is_exchange(&self) -> bool {
        matches!(self, Selection::Exchange(_))
    }
}

/// Human-readable record of a configured policy.
///
/// Written once at coordinator startup so a run can be reproduced. It is
/// never read back by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDescription {
    /// Policy name.
    pub policy: String,
    /// Policy configuration.
    #[serde(default)]
    pub parameters: Value,
}

impl PolicyDescription {
    pub fn new(policy: impl Into<String>, parameters: Value) -> Self {
        Self {
            policy: policy.into(),
            parameters,
        }
    }
}

/// Decides which waiting replicas take part in an exchange.
///
/// Policies are called by the coordinator with the current waitlist, in
/// arrival order, and the criteria value configured at construction. The
/// newest arrival is always the last element. They run inside the
/// coordinator's critical section and must not block.
///
/// A returned [`Partition`] must place every waitlist member in exactly one
/// of its two sets, and the exchange set must contain the newest arrival,
/// which hosts the exchange. The coordinator aborts the run otherwise.
pub trait SelectionPolicy: Send + Sync {
    /// Returns the unique name of this policy.
    fn name(&self) -> &str;

    /// Describe this policy's configuration for the audit artifact.
    fn describe(&self) -> PolicyDescription {
        PolicyDescription::new(self.name(), Value::Null)
    }

    /// Inspect the waitlist and decide.
    fn select(&self, waitlist: &[Arc<Replica>], criteria: &Value) -> Selection;
}
