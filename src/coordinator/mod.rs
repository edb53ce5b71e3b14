// ABOUTME: Coordinator module - waitlist management and exchange orchestration.
// ABOUTME: Contains the exchange coordinator, its builder, and run configuration.

mod config;
mod coordinator;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorBuilder, ExchangeCoordinator};

#[cfg(test)]
mod config_test;
