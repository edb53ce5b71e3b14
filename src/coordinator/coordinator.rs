// ABOUTME: Exchange coordinator for replica-exchange ensembles.
// ABOUTME: Serializes waitlist updates under one lock and drives suspend/resume.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::CoordinatorConfig;
use crate::audit::{AuditKind, AuditRecord, AuditSink, DumpLog, Highlight, NoAudit};
use crate::engine::{Checkpoints, WorkflowEngine};
use crate::error::{AuditError, ConfigError, CoordinatorError, ReplicaError};
use crate::replica::{Replica, ReplicaId, ReplicaState};
use crate::selection::{GroupSizePolicy, Selection, SelectionPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    Aborted,
    Terminated,
}

/// Coordinates periodic exchanges between the replicas of an ensemble.
///
/// The coordinator is reactive: it only runs inside the two checkpoint
/// calls made by the workflow engine, and in [`terminate`](Self::terminate).
///
/// # Locking
///
/// - **Waitlist:** every read-modify-write of the waitlist, including the
///   selection policy call, happens under a single async mutex. Concurrent
///   readiness checks are therefore applied in some sequential order.
/// - **Exchange peers:** set on the host under the waitlist lock, taken back
///   in `on_exchange_complete`. No lock is held while peers are resumed.
/// - **Failure:** any error out of a checkpoint is fatal. The coordinator
///   writes an abort record and refuses all further checkpoints.
pub struct ExchangeCoordinator {
    ensemble: Vec<Arc<Replica>>,
    index: HashMap<ReplicaId, usize>,
    cycle_limit: u64,
    policy: Arc<dyn SelectionPolicy>,
    criteria: Value,
    engine: Arc<dyn WorkflowEngine>,
    audit: Arc<dyn AuditSink>,
    started: Instant,
    waitlist: Mutex<Vec<Arc<Replica>>>,
    status: parking_lot::Mutex<Status>,
}

impl ExchangeCoordinator {
    /// Start building a coordinator for `ensemble`, executed by `engine`.
    pub fn builder(
        ensemble: Vec<Arc<Replica>>,
        engine: Arc<dyn WorkflowEngine>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder::new(ensemble, engine)
    }

    /// Builder preconfigured from `config`: group-size policy, cycle limit,
    /// and the dump log and policy artifact paths.
    pub fn from_config(
        config: &CoordinatorConfig,
        ensemble: Vec<Arc<Replica>>,
        engine: Arc<dyn WorkflowEngine>,
    ) -> Result<CoordinatorBuilder, CoordinatorError> {
        config.validate()?;
        if ensemble.len() != config.ensemble_size {
            return Err(ConfigError::Invalid(format!(
                "ensemble has {} replicas, config expects {}",
                ensemble.len(),
                config.ensemble_size
            ))
            .into());
        }

        let mut builder = CoordinatorBuilder::new(ensemble, engine)
            .cycle_limit(config.cycle_limit)
            .policy(GroupSizePolicy::new(config.exchange_size));
        if let Some(path) = &config.dump_path {
            builder = builder.audit(Arc::new(DumpLog::open(path)?));
        }
        if let Some(path) = &config.policy_path {
            builder = builder.policy_path(path.clone());
        }
        Ok(builder)
    }

    /// A replica finished a simulation segment and is eligible to exchange.
    ///
    /// Appends the replica to the waitlist and asks the selection policy for
    /// a decision. Without one, the replica is suspended and stays on the
    /// waitlist. With one, the partition is validated, the waitlist is
    /// replaced by the remaining set, and `replica` hosts an exchange with
    /// the exchange set.
    pub async fn check_exchange_readiness(
        &self,
        replica: &Arc<Replica>,
    ) -> Result<(), CoordinatorError> {
        self.ensure_running()?;
        let replica = self.member(replica.id())?;

        let mut waitlist = self.waitlist.lock().await;
        // Another check may have aborted while this one waited for the lock.
        self.ensure_running()?;
        if waitlist.iter().any(|r| r.id() == replica.id()) {
            return Err(self.abort(CoordinatorError::AlreadyWaiting(replica.id())));
        }

        tracing::debug!(
            replica = %replica.id(),
            cycle = replica.cycle(),
            waiting = waitlist.len(),
            "check exchange"
        );
        waitlist.push(replica.clone());

        let partition = match self.policy.select(&waitlist, &self.criteria) {
            Selection::NotYet => {
                tracing::debug!(replica = %replica.id(), "no exchange yet, suspending");
                self.request(replica, ReplicaState::Suspended).await?;
                self.record(AuditKind::Suspend, Highlight::None, "")
                    .map_err(|err| self.abort(err.into()))?;
                return Ok(());
            }
            Selection::Exchange(partition) => partition,
        };

        if let Err(fault) = partition.validate(&waitlist, replica.id()) {
            return Err(self.abort(CoordinatorError::PartitionInvariantViolation {
                host: replica.id(),
                fault,
            }));
        }

        let peers = partition.exchange_ids();
        *waitlist = partition.remaining;
        replica.set_exchange_peers(peers.clone());

        tracing::debug!(
            host = %replica.id(),
            exchange = ?peers,
            waiting = waitlist.len(),
            "exchange assigned"
        );
        self.record(
            AuditKind::Exchange,
            Highlight::Only(&peers),
            format!(" > {}: {}", replica.id(), format_ids(&peers)),
        )
        .map_err(|err| self.abort(err.into()))?;

        self.engine
            .schedule_exchange(replica, &partition.exchange)
            .await
            .map_err(|err| self.abort(err.into()))
    }

    /// The exchange hosted by `host` finished.
    ///
    /// Every peer whose cycle has not passed the limit gets one more
    /// simulation segment. Every peer other than the host is resumed. Peers
    /// that already failed or were canceled are skipped. Returns the ids of
    /// the resumed peers.
    pub async fn on_exchange_complete(
        &self,
        host: &Arc<Replica>,
    ) -> Result<Vec<ReplicaId>, CoordinatorError> {
        self.ensure_running()?;
        let host = self.member(host.id())?;

        let peers = host.take_exchange_peers();
        if peers.is_empty() {
            return Err(self.abort(CoordinatorError::NoExchangePending(host.id())));
        }

        tracing::debug!(host = %host.id(), "check resume");
        self.record(
            AuditKind::Resume,
            Highlight::Only(&peers),
            format!(" < {}: {}", host.id(), format_ids(&peers)),
        )
        .map_err(|err| self.abort(err.into()))?;

        let mut resumed = Vec::with_capacity(peers.len());
        for id in peers {
            let peer = self.member(id)?;

            if matches!(peer.state(), ReplicaState::Failed | ReplicaState::Canceled) {
                tracing::warn!(
                    replica = %id,
                    state = %peer.state(),
                    "skipping peer that is no longer running"
                );
                continue;
            }

            if peer.cycle() <= self.cycle_limit {
                self.ensure_live(peer, ReplicaState::Scheduling)?;
                self.engine
                    .schedule_segment(peer)
                    .await
                    .map_err(|err| self.abort(err.into()))?;
            } else {
                tracing::debug!(replica = %id, cycle = peer.cycle(), "cycle limit reached");
            }

            // The host never suspended; the engine keeps it running.
            if id != host.id() {
                tracing::debug!(replica = %id, "resume");
                self.request(peer, ReplicaState::Scheduling).await?;
                resumed.push(id);
            }
        }

        Ok(resumed)
    }

    /// Stop the ensemble.
    ///
    /// Marks every replica in the audit log, closes the log, and shuts the
    /// engine down. Later checkpoint calls fail with `Terminated`.
    pub async fn terminate(&self) -> Result<(), CoordinatorError> {
        {
            let mut status = self.status.lock();
            if *status == Status::Terminated {
                return Ok(());
            }
            *status = Status::Terminated;
        }
        tracing::debug!("exchange coordinator terminating");

        self.waitlist.lock().await.clear();
        self.record(AuditKind::Terminate, Highlight::All, "terminate")?;
        self.audit.close()?;
        self.engine.shutdown().await?;
        Ok(())
    }

    /// Ids currently on the waitlist, in arrival order.
    pub(crate) async fn waitlist_ids(&self) -> Vec<ReplicaId> {
        self.waitlist.lock().await.iter().map(|r| r.id()).collect()
    }

    fn ensure_running(&self) -> Result<(), CoordinatorError> {
        match *self.status.lock() {
            Status::Running => Ok(()),
            Status::Aborted => Err(CoordinatorError::Aborted),
            Status::Terminated => Err(CoordinatorError::Terminated),
        }
    }

    fn member(&self, id: ReplicaId) -> Result<&Arc<Replica>, CoordinatorError> {
        match self.index.get(&id) {
            Some(&pos) => Ok(&self.ensemble[pos]),
            None => Err(self.abort(CoordinatorError::UnknownReplica(id))),
        }
    }

    /// Fail if `replica` is terminal and so cannot move to `next`.
    fn ensure_live(&self, replica: &Replica, next: ReplicaState) -> Result<(), CoordinatorError> {
        let from = replica.state();
        if from.is_terminal() {
            let err = ReplicaError::InvalidStateTransition {
                replica: replica.id(),
                from,
                to: next,
            };
            return Err(self.abort(err.into()));
        }
        Ok(())
    }

    /// Ask the engine to suspend or resume `replica`.
    async fn request(
        &self,
        replica: &Arc<Replica>,
        next: ReplicaState,
    ) -> Result<(), CoordinatorError> {
        self.ensure_live(replica, next)?;
        let result = match next {
            ReplicaState::Suspended => self.engine.suspend(replica).await,
            _ => self.engine.resume(replica).await,
        };
        result.map_err(|err| self.abort(err.into()))
    }

    fn record(
        &self,
        kind: AuditKind,
        highlight: Highlight<'_>,
        label: impl Into<String>,
    ) -> Result<(), AuditError> {
        let record = AuditRecord::capture(
            self.started.elapsed(),
            kind,
            &self.ensemble,
            highlight,
            label,
        );
        tracing::trace!(record = %record, "audit");
        self.audit.record(&record)
    }

    /// Poison the coordinator and record the abort before handing `err` back.
    fn abort(&self, err: CoordinatorError) -> CoordinatorError {
        {
            let mut status = self.status.lock();
            if *status != Status::Running {
                return err;
            }
            *status = Status::Aborted;
        }

        tracing::error!(error = %err, "exchange coordinator aborting");
        let label = format!("abort: {}", err);
        if let Err(audit_err) = self.record(AuditKind::Abort, Highlight::None, label) {
            tracing::error!(error = %audit_err, "failed to record abort");
        }
        err
    }
}

#[async_trait]
impl Checkpoints for ExchangeCoordinator {
    async fn ready_for_exchange(&self, replica: &Arc<Replica>) -> Result<(), CoordinatorError> {
        self.check_exchange_readiness(replica).await
    }

    async fn exchange_complete(
        &self,
        host: &Arc<Replica>,
    ) -> Result<Vec<ReplicaId>, CoordinatorError> {
        self.on_exchange_complete(host).await
    }
}

impl std::fmt::Debug for ExchangeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCoordinator")
            .field("ensemble", &self.ensemble.len())
            .field("cycle_limit", &self.cycle_limit)
            .field("policy", &self.policy.name())
            .field("status", &*self.status.lock())
            .finish()
    }
}

fn format_ids(ids: &[ReplicaId]) -> String {
    let ids: Vec<String> = ids.iter().map(ReplicaId::to_string).collect();
    format!("[{}]", ids.join(", "))
}

/// Builder for [`ExchangeCoordinator`].
pub struct CoordinatorBuilder {
    ensemble: Vec<Arc<Replica>>,
    engine: Arc<dyn WorkflowEngine>,
    cycle_limit: u64,
    policy: Arc<dyn SelectionPolicy>,
    criteria: Value,
    audit: Arc<dyn AuditSink>,
    policy_path: Option<PathBuf>,
}

impl CoordinatorBuilder {
    /// Defaults: cycle limit 3, pairwise group-size policy, no audit output.
    pub fn new(ensemble: Vec<Arc<Replica>>, engine: Arc<dyn WorkflowEngine>) -> Self {
        let defaults = CoordinatorConfig::default();
        Self {
            ensemble,
            engine,
            cycle_limit: defaults.cycle_limit,
            policy: Arc::new(GroupSizePolicy::new(defaults.exchange_size)),
            criteria: Value::Null,
            audit: Arc::new(NoAudit),
            policy_path: None,
        }
    }

    /// Replicas whose cycle exceeds `limit` get no further segments.
    pub fn cycle_limit(mut self, limit: u64) -> Self {
        self.cycle_limit = limit;
        self
    }

    /// Set the selection policy.
    pub fn policy(mut self, policy: impl SelectionPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Set the selection policy from an Arc.
    pub fn policy_arc(mut self, policy: Arc<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Criteria value passed to every policy call.
    pub fn criteria(mut self, criteria: Value) -> Self {
        self.criteria = criteria;
        self
    }

    /// Set the audit sink.
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Write the policy description here at startup.
    pub fn policy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_path = Some(path.into());
        self
    }

    /// Start the coordinator.
    ///
    /// Persists the policy description, records the startup event, and
    /// schedules the first simulation segment of every replica.
    pub async fn start(self) -> Result<Arc<ExchangeCoordinator>, CoordinatorError> {
        if self.ensemble.is_empty() {
            return Err(ConfigError::Invalid("ensemble is empty".into()).into());
        }
        let mut index = HashMap::with_capacity(self.ensemble.len());
        for (pos, replica) in self.ensemble.iter().enumerate() {
            if index.insert(replica.id(), pos).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "replica id {} is used twice",
                    replica.id()
                ))
                .into());
            }
        }

        if let Some(path) = &self.policy_path {
            let description = self.policy.describe();
            let json = serde_json::to_string_pretty(&description).map_err(AuditError::from)?;
            std::fs::write(path, json + "\n").map_err(AuditError::from)?;
            tracing::debug!(path = %path.display(), policy = %description.policy, "policy persisted");
        }

        let coordinator = Arc::new(ExchangeCoordinator {
            ensemble: self.ensemble,
            index,
            cycle_limit: self.cycle_limit,
            policy: self.policy,
            criteria: self.criteria,
            engine: self.engine,
            audit: self.audit,
            started: Instant::now(),
            waitlist: Mutex::new(Vec::new()),
            status: parking_lot::Mutex::new(Status::Running),
        });

        coordinator.record(AuditKind::Startup, Highlight::None, "startup")?;
        tracing::info!(
            replicas = coordinator.ensemble.len(),
            cycle_limit = coordinator.cycle_limit,
            policy = coordinator.policy.name(),
            "exchange coordinator started"
        );

        for replica in &coordinator.ensemble {
            coordinator
                .engine
                .schedule_segment(replica)
                .await
                .map_err(|err| coordinator.abort(err.into()))?;
        }

        Ok(coordinator)
    }
}
