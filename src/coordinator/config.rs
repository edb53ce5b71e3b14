// ABOUTME: CoordinatorConfig - ensemble shape, cycle limit, and artifact paths.
// ABOUTME: Loads from JSON with defaults and validates sizes before a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::replica::Replica;

/// Configuration for an exchange run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of replicas in the ensemble.
    pub ensemble_size: usize,

    /// Replicas per exchange for the group-size policy.
    pub exchange_size: usize,

    /// Replicas whose cycle exceeds this get no further segments.
    pub cycle_limit: u64,

    /// Where to append the audit dump log. No log is written if None.
    pub dump_path: Option<PathBuf>,

    /// Where to write the policy description at startup. Skipped if None.
    pub policy_path: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ensemble_size: 4,
            exchange_size: 2,
            cycle_limit: 3,
            dump_path: Some(PathBuf::from("dump.log")),
            policy_path: Some(PathBuf::from("policy.json")),
        }
    }
}

impl CoordinatorConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn ensemble_size(mut self, size: usize) -> Self {
        self.ensemble_size = size;
        self
    }

    pub fn exchange_size(mut self, size: usize) -> Self {
        self.exchange_size = size;
        self
    }

    pub fn cycle_limit(mut self, limit: u64) -> Self {
        self.cycle_limit = limit;
        self
    }

    pub fn dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.dump_path = path;
        self
    }

    pub fn policy_path(mut self, path: Option<PathBuf>) -> Self {
        self.policy_path = path;
        self
    }

    /// Reject configurations that can never form an exchange.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ensemble_size == 0 {
            return Err(ConfigError::Invalid("ensemble_size must be positive".into()));
        }
        if u32::try_from(self.ensemble_size).is_err() {
            return Err(ConfigError::Invalid(format!(
                "ensemble_size {} exceeds the replica id range",
                self.ensemble_size
            )));
        }
        if self.exchange_size == 0 {
            return Err(ConfigError::Invalid("exchange_size must be positive".into()));
        }
        if self.exchange_size > self.ensemble_size {
            return Err(ConfigError::Invalid(format!(
                "exchange_size {} exceeds ensemble_size {}",
                self.exchange_size, self.ensemble_size
            )));
        }
        if self.ensemble_size % self.exchange_size != 0 {
            tracing::warn!(
                ensemble_size = self.ensemble_size,
                exchange_size = self.exchange_size,
                "ensemble does not divide into exchange groups; the last replicas may never exchange"
            );
        }
        Ok(())
    }

    /// Create the ensemble's replicas, numbered from 0.
    ///
    /// Ids stop at `u32::MAX`; `validate` rejects larger ensembles.
    pub fn build_ensemble(&self) -> Vec<Arc<Replica>> {
        (0..=u32::MAX)
            .take(self.ensemble_size)
            .map(|id| Arc::new(Replica::new(id)))
            .collect()
    }
}
