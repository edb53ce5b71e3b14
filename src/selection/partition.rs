// ABOUTME: Partition of a waitlist snapshot into exchange and remaining sets.
// ABOUTME: Validation rejects any output that loses, invents, or duplicates replicas.

use std::collections::HashMap;
use std::sync::Arc;

use crate::replica::{Replica, ReplicaId};

/// Ways a policy's partition can fail to reconcile with the waitlist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionFault {
    #[error("waitlist holds {expected} replicas but the partition holds {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("replica {0} is missing from the partition")]
    Missing(ReplicaId),

    #[error("replica {0} appears more than once in the partition")]
    Duplicate(ReplicaId),

    #[error("replica {0} is not on the waitlist")]
    Unknown(ReplicaId),

    /// Host rule: the checking-in replica hosts the exchange, so the
    /// exchange set cannot be empty even when the split is otherwise exact.
    #[error("host rule: exchange set is empty, so the checking-in replica has nothing to host")]
    EmptyExchange,

    /// Host rule: the exchange set must contain the checking-in replica.
    #[error("host rule: exchange set does not contain checking-in replica {0}")]
    HostExcluded(ReplicaId),
}

impl PartitionFault {
    /// True for faults that break the hosting rule rather than the
    /// bipartition itself.
    pub fn is_host_rule(&self) -> bool {
        matches!(self, Self::EmptyExchange | Self::HostExcluded(_))
    }
}

/// A bipartition of the waitlist.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Replicas that exchange now.
    pub exchange: Vec<Arc<Replica>>,
    /// Replicas that keep waiting, in waitlist order.
    pub remaining: Vec<Arc<Replica>>,
}

impl Partition {
    pub fn new(exchange: Vec<Arc<Replica>>, remaining: Vec<Arc<Replica>>) -> Self {
        Self {
            exchange,
            remaining,
        }
    }

    /// Split `waitlist` by a predicate, preserving order in both sets.
    pub fn split_by<F>(waitlist: &[Arc<Replica>], mut into_exchange: F) -> Self
    where
        F: FnMut(&Replica) -> bool,
    {
        let (exchange, remaining): (Vec<_>, Vec<_>) =
            waitlist.iter().cloned().partition(|r| into_exchange(&**r));
        Self {
            exchange,
            remaining,
        }
    }

    pub fn exchange_ids(&self) -> Vec<ReplicaId> {
        self.exchange.iter().map(|r| r.id()).collect()
    }

    pub fn remaining_ids(&self) -> Vec<ReplicaId> {
        self.remaining.iter().map(|r| r.id()).collect()
    }

    /// Check that this partition is a strict bipartition of `waitlist` and
    /// that `host` exchanges.
    pub fn validate(
        &self,
        waitlist: &[Arc<Replica>],
        host: ReplicaId,
    ) -> Result<(), PartitionFault> {
        let actual = self.exchange.len() + self.remaining.len();
        if actual != waitlist.len() {
            return Err(PartitionFault::SizeMismatch {
                expected: waitlist.len(),
                actual,
            });
        }

        let mut seen: HashMap<ReplicaId, usize> = HashMap::with_capacity(actual);
        for replica in self.exchange.iter().chain(self.remaining.iter()) {
            *seen.entry(replica.id()).or_default() += 1;
        }

        for replica in self.exchange.iter().chain(self.remaining.iter()) {
            let id = replica.id();
            if !waitlist.iter().any(|w| w.id() == id) {
                return Err(PartitionFault::Unknown(id));
            }
            if seen.get(&id).copied().unwrap_or(0) > 1 {
                return Err(PartitionFault::Duplicate(id));
            }
        }

        for replica in waitlist {
            if !seen.contains_key(&replica.id()) {
                return Err(PartitionFault::Missing(replica.id()));
            }
        }

        if self.exchange.is_empty() {
            return Err(PartitionFault::EmptyExchange);
        }
        if !self.exchange.iter().any(|r| r.id() == host) {
            return Err(PartitionFault::HostExcluded(host));
        }

        Ok(())
    }
}
