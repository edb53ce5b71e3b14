// ABOUTME: Simulation trait - the user work executed for segments and exchanges.
// ABOUTME: SleepSimulation stands in for real work with fixed, staggered delays.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::replica::Replica;

/// Work executed by [`LocalEngine`](super::LocalEngine) workers.
#[async_trait]
pub trait Simulation: Send + Sync {
    /// Run one simulation segment for `replica`.
    async fn simulate(&self, replica: &Replica) -> Result<(), anyhow::Error>;

    /// Run the exchange step hosted by `host`.
    async fn exchange(&self, host: &Replica, peers: &[Arc<Replica>]) -> Result<(), anyhow::Error>;
}

/// Sleeps instead of simulating.
///
/// Segment time is staggered by replica id so that replicas reach their
/// checkpoints out of lockstep.
#[derive(Debug, Clone, Copy)]
pub struct SleepSimulation {
    pub segment: Duration,
    pub exchange: Duration,
}

impl SleepSimulation {
    pub fn new(segment: Duration, exchange: Duration) -> Self {
        Self { segment, exchange }
    }

    fn segment_time(&self, replica: &Replica) -> Duration {
        let stagger = (replica.id().0 % 4) + 4;
        self.segment * stagger / 4
    }
}

impl Default for SleepSimulation {
    fn default() -> Self {
        Self::new(Duration::from_millis(10), Duration::from_millis(2))
    }
}

#[async_trait]
impl Simulation for SleepSimulation {
    async fn simulate(&self, replica: &Replica) -> Result<(), anyhow::Error> {
        tokio::time::sleep(self.segment_time(replica)).await;
        Ok(())
    }

    async fn exchange(&self, _host: &Replica, _peers: &[Arc<Replica>]) -> Result<(), anyhow::Error> {
        tokio::time::sleep(self.exchange).await;
        Ok(())
    }
}
