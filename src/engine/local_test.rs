// ABOUTME: Tests for LocalEngine scheduling, worker lifecycle, and shutdown.
// ABOUTME: Uses stub checkpoints so the engine is exercised without a coordinator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Checkpoints, LocalEngine, Simulation, SleepSimulation, WorkflowEngine};
use crate::error::{CoordinatorError, EngineError};
use crate::replica::{Replica, ReplicaId, ReplicaState};

/// Records check-ins and never starts an exchange.
#[derive(Default)]
struct CountingCheckpoints {
    ready: Mutex<Vec<ReplicaId>>,
}

#[async_trait]
impl Checkpoints for CountingCheckpoints {
    async fn ready_for_exchange(&self, replica: &Arc<Replica>) -> Result<(), CoordinatorError> {
        self.ready.lock().push(replica.id());
        Ok(())
    }

    async fn exchange_complete(
        &self,
        host: &Arc<Replica>,
    ) -> Result<Vec<ReplicaId>, CoordinatorError> {
        Err(CoordinatorError::NoExchangePending(host.id()))
    }
}

/// Fails every segment of one replica.
struct FailingSimulation {
    victim: ReplicaId,
}

#[async_trait]
impl Simulation for FailingSimulation {
    async fn simulate(&self, replica: &Replica) -> Result<(), anyhow::Error> {
        if replica.id() == self.victim {
            anyhow::bail!("segment diverged");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(())
    }

    async fn exchange(&self, _host: &Replica, _peers: &[Arc<Replica>]) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

fn ensemble(n: u32) -> Vec<Arc<Replica>> {
    (0..n).map(|i| Arc::new(Replica::new(i))).collect()
}

fn fast() -> SleepSimulation {
    SleepSimulation::new(Duration::from_millis(1), Duration::from_millis(1))
}

#[tokio::test]
async fn test_schedule_segment_starts_replica() {
    let replicas = ensemble(2);
    let engine = LocalEngine::new(&replicas, fast());

    engine.schedule_segment(&replicas[0]).await.unwrap();
    engine.schedule_segment(&replicas[0]).await.unwrap();

    assert_eq!(replicas[0].state(), ReplicaState::Scheduling);
    assert_eq!(replicas[0].cycle(), 2);
    assert_eq!(engine.pending(ReplicaId(0)), 2);
    assert_eq!(replicas[1].state(), ReplicaState::Initial);
    assert_eq!(engine.pending(ReplicaId(1)), 0);
}

#[tokio::test]
async fn test_unknown_replica_rejected() {
    let engine = LocalEngine::new(&ensemble(1), fast());
    let stranger = Arc::new(Replica::new(9));

    let err = engine.schedule_segment(&stranger).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownReplica(ReplicaId(9))));
}

#[tokio::test]
async fn test_resume_terminal_replica_rejected() {
    let replicas = ensemble(1);
    let engine = LocalEngine::new(&replicas, fast());
    replicas[0].transition(ReplicaState::Canceled).unwrap();

    let err = engine.resume(&replicas[0]).await.unwrap_err();
    assert!(matches!(err, EngineError::Replica(_)));
    assert_eq!(replicas[0].state(), ReplicaState::Canceled);
}

#[tokio::test]
async fn test_workers_finish_when_queue_drains() {
    let replicas = ensemble(3);
    let engine = LocalEngine::new(&replicas, fast());
    for replica in &replicas {
        engine.schedule_segment(replica).await.unwrap();
    }

    let checkpoints = Arc::new(CountingCheckpoints::default());
    tokio::time::timeout(Duration::from_secs(5), engine.run(checkpoints.clone()))
        .await
        .expect("engine should finish")
        .unwrap();

    let mut ready = checkpoints.ready.lock().clone();
    ready.sort();
    assert_eq!(ready, vec![ReplicaId(0), ReplicaId(1), ReplicaId(2)]);
    assert!(replicas.iter().all(|r| r.state() == ReplicaState::Done));
}

#[tokio::test]
async fn test_failed_work_cancels_ensemble() {
    let replicas = ensemble(3);
    let engine = LocalEngine::new(&replicas, FailingSimulation { victim: ReplicaId(1) });
    for replica in &replicas {
        engine.schedule_segment(replica).await.unwrap();
        engine.schedule_segment(replica).await.unwrap();
    }
    // Park one replica so only cancellation can end its worker.
    replicas[2].suspend().unwrap();

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run(Arc::new(CountingCheckpoints::default())),
    )
    .await
    .expect("engine should stop")
    .unwrap_err();

    match err {
        EngineError::Work { replica, .. } => assert_eq!(replica, ReplicaId(1)),
        other => panic!("Expected Work error, got {:?}", other),
    }
    assert_eq!(replicas[1].state(), ReplicaState::Failed);
    assert_eq!(replicas[2].state(), ReplicaState::Canceled);
}

#[tokio::test]
async fn test_shutdown_cancels_parked_workers() {
    let replicas = ensemble(2);
    let engine = Arc::new(LocalEngine::new(&replicas, fast()));
    for replica in &replicas {
        engine.schedule_segment(replica).await.unwrap();
        replica.suspend().unwrap();
    }

    let runner = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(Arc::new(CountingCheckpoints::default())).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!runner.is_finished());

    engine.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("workers should stop")
        .unwrap()
        .unwrap();

    assert!(replicas.iter().all(|r| r.state() == ReplicaState::Canceled));
    let err = engine.schedule_segment(&replicas[0]).await.unwrap_err();
    assert!(matches!(err, EngineError::ShutDown));
}
