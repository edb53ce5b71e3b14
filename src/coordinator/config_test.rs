// ABOUTME: Tests for CoordinatorConfig defaults, validation, and JSON loading.
// ABOUTME: Uses tempfile for config files on disk.

use std::path::PathBuf;

use super::CoordinatorConfig;
use crate::error::ConfigError;
use crate::replica::{ReplicaId, ReplicaState};

#[test]
fn test_defaults() {
    let config = CoordinatorConfig::default();
    assert_eq!(config.ensemble_size, 4);
    assert_eq!(config.exchange_size, 2);
    assert_eq!(config.cycle_limit, 3);
    assert_eq!(config.dump_path, Some(PathBuf::from("dump.log")));
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_impossible_groups() {
    let config = CoordinatorConfig::default().ensemble_size(0);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let config = CoordinatorConfig::default().exchange_size(0);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let config = CoordinatorConfig::default().ensemble_size(2).exchange_size(3);
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_validate_rejects_ensemble_beyond_id_range() {
    let config = CoordinatorConfig::default().ensemble_size(u32::MAX as usize + 1);
    match config.validate() {
        Err(ConfigError::Invalid(msg)) => assert!(msg.contains("replica id range")),
        other => panic!("Expected Invalid, got {:?}", other),
    }

    let config = CoordinatorConfig::default().ensemble_size(u32::MAX as usize);
    assert!(config.validate().is_ok());
}

#[test]
fn test_uneven_groups_are_allowed() {
    let config = CoordinatorConfig::default().ensemble_size(5).exchange_size(2);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_json_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repex.json");
    std::fs::write(&path, r#"{"ensemble_size": 8, "exchange_size": 4, "dump_path": null}"#)
        .unwrap();

    let config = CoordinatorConfig::from_json_file(&path).unwrap();
    assert_eq!(config.ensemble_size, 8);
    assert_eq!(config.exchange_size, 4);
    assert_eq!(config.cycle_limit, 3);
    assert_eq!(config.dump_path, None);
    assert_eq!(config.policy_path, Some(PathBuf::from("policy.json")));
}

#[test]
fn test_from_json_file_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repex.json");
    std::fs::write(&path, r#"{"ensemble_size": 2, "exchange_size": 3}"#).unwrap();

    let result = CoordinatorConfig::from_json_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_from_json_file_reports_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repex.json");
    std::fs::write(&path, "{ensemble_size: }").unwrap();

    let result = CoordinatorConfig::from_json_file(&path);
    assert!(matches!(result, Err(ConfigError::Json(_))));
}

#[test]
fn test_build_ensemble() {
    let replicas = CoordinatorConfig::default().ensemble_size(3).build_ensemble();
    let ids: Vec<_> = replicas.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![ReplicaId(0), ReplicaId(1), ReplicaId(2)]);
    assert!(replicas.iter().all(|r| r.state() == ReplicaState::Initial));
}
