// ABOUTME: LocalEngine - runs every replica as a tokio task in this process.
// ABOUTME: Workers execute queued stages, call checkpoints, and park while suspended.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinSet;

use super::{Checkpoints, Simulation, WorkflowEngine};
use crate::error::{EngineError, ReplicaError};
use crate::replica::{Replica, ReplicaId, ReplicaState};

/// A unit of queued work.
#[derive(Debug, Clone)]
enum Stage {
    Segment,
    Exchange(Vec<Arc<Replica>>),
}

/// One replica and its pending stages.
struct Slot {
    replica: Arc<Replica>,
    stages: Mutex<VecDeque<Stage>>,
}

impl Slot {
    fn push(&self, stage: Stage) {
        self.stages.lock().push_back(stage);
    }

    fn next(&self) -> Option<Stage> {
        self.stages.lock().pop_front()
    }
}

/// In-process workflow engine.
///
/// Each replica gets a worker task when [`run`](LocalEngine::run) is called.
/// A worker drains its replica's stage queue, calling back into the
/// coordinator after every stage. A suspended worker waits on the replica's
/// state channel. A worker whose queue is empty marks its replica `Done`.
///
/// A replica stuck waiting for exchange partners that never arrive stays
/// suspended, and `run` does not return until the engine is shut down.
pub struct LocalEngine {
    slots: HashMap<ReplicaId, Arc<Slot>>,
    simulation: Arc<dyn Simulation>,
    running: AtomicBool,
    shut_down: AtomicBool,
}

impl LocalEngine {
    /// Create an engine managing `ensemble`.
    pub fn new(ensemble: &[Arc<Replica>], simulation: impl Simulation + 'static) -> Self {
        let slots = ensemble
            .iter()
            .map(|replica| {
                let slot = Slot {
                    replica: replica.clone(),
                    stages: Mutex::new(VecDeque::new()),
                };
                (replica.id(), Arc::new(slot))
            })
            .collect();

        Self {
            slots,
            simulation: Arc::new(simulation),
            running: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Number of stages queued for a replica.
    pub fn pending(&self, id: ReplicaId) -> usize {
        self.slots
            .get(&id)
            .map(|slot| slot.stages.lock().len())
            .unwrap_or(0)
    }

    fn slot(&self, id: ReplicaId) -> Result<&Arc<Slot>, EngineError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(EngineError::ShutDown);
        }
        self.slots.get(&id).ok_or(EngineError::UnknownReplica(id))
    }

    /// Run all replicas until every worker has finished.
    ///
    /// The first worker error cancels the remaining replicas and is
    /// returned once all workers have stopped.
    pub async fn run(&self, checkpoints: Arc<dyn Checkpoints>) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyRunning);
        }

        let mut workers = JoinSet::new();
        for slot in self.slots.values() {
            let slot = slot.clone();
            let simulation = self.simulation.clone();
            let checkpoints = checkpoints.clone();
            workers.spawn(async move { work(slot, simulation, checkpoints).await });
        }

        let mut first_error = None;
        while let Some(joined) = workers.join_next().await {
            let result = joined.map_err(EngineError::from).and_then(|r| r);
            if let Err(err) = result {
                if first_error.is_none() {
                    tracing::error!(error = %err, "replica worker failed, canceling ensemble");
                    self.cancel_all();
                    first_error = Some(err);
                } else {
                    tracing::debug!(error = %err, "worker stopped after cancellation");
                }
            }
        }

        self.running.store(false, Ordering::Release);
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn cancel_all(&self) {
        for slot in self.slots.values() {
            slot.stages.lock().clear();
            if !slot.replica.is_terminal() {
                // Lost races against a worker finishing are harmless.
                let _ = slot.replica.transition(ReplicaState::Canceled);
            }
        }
    }
}

#[async_trait]
impl WorkflowEngine for LocalEngine {
    async fn schedule_segment(&self, replica: &Arc<Replica>) -> Result<(), EngineError> {
        let slot = self.slot(replica.id())?;
        if replica.state() == ReplicaState::Initial {
            replica.transition(ReplicaState::Scheduling)?;
        } else if replica.is_terminal() {
            return Err(EngineError::Replica(ReplicaError::InvalidStateTransition {
                replica: replica.id(),
                from: replica.state(),
                to: ReplicaState::Scheduling,
            }));
        }
        let cycle = replica.begin_segment();
        slot.push(Stage::Segment);
        tracing::debug!(replica = %replica.id(), cycle, "segment scheduled");
        Ok(())
    }

    async fn schedule_exchange(
        &self,
        host: &Arc<Replica>,
        peers: &[Arc<Replica>],
    ) -> Result<(), EngineError> {
        let slot = self.slot(host.id())?;
        slot.push(Stage::Exchange(peers.to_vec()));
        tracing::debug!(host = %host.id(), peers = peers.len(), "exchange scheduled");
        Ok(())
    }

    async fn suspend(&self, replica: &Arc<Replica>) -> Result<(), EngineError> {
        self.slot(replica.id())?;
        replica.suspend()?;
        Ok(())
    }

    async fn resume(&self, replica: &Arc<Replica>) -> Result<(), EngineError> {
        self.slot(replica.id())?;
        replica.resume()?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.cancel_all();
        tracing::debug!("local engine shut down");
        Ok(())
    }
}

/// Worker loop for one replica.
async fn work(
    slot: Arc<Slot>,
    simulation: Arc<dyn Simulation>,
    checkpoints: Arc<dyn Checkpoints>,
) -> Result<(), EngineError> {
    let replica = &slot.replica;

    loop {
        if replica.wait_until_runnable().await.is_terminal() {
            return Ok(());
        }

        let Some(stage) = slot.next() else {
            finish(replica, ReplicaState::Done);
            return Ok(());
        };

        match stage {
            Stage::Segment => {
                if let Err(source) = simulation.simulate(replica).await {
                    finish(replica, ReplicaState::Failed);
                    return Err(EngineError::Work {
                        replica: replica.id(),
                        source,
                    });
                }
                if replica.is_terminal() {
                    return Ok(());
                }
                checkpoints.ready_for_exchange(replica).await?;
            }
            Stage::Exchange(peers) => {
                if let Err(source) = simulation.exchange(replica, &peers).await {
                    finish(replica, ReplicaState::Failed);
                    return Err(EngineError::Work {
                        replica: replica.id(),
                        source,
                    });
                }
                if replica.is_terminal() {
                    return Ok(());
                }
                checkpoints.exchange_complete(replica).await?;
            }
        }
    }
}

fn finish(replica: &Replica, outcome: ReplicaState) {
    if let Err(err) = replica.transition(outcome) {
        // Already terminal, usually canceled by shutdown.
        tracing::debug!(error = %err, "replica already finished");
    } else {
        tracing::debug!(replica = %replica.id(), state = %outcome, "replica finished");
    }
}
