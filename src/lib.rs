// ABOUTME: Root module for repex - replica-exchange coordination.
// ABOUTME: Re-exports all public types from submodules.

pub mod audit;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod replica;
pub mod selection;
pub mod telemetry;

pub use error::RepexError;
