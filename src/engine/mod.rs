// ABOUTME: Engine module - the execution side of replica exchange.
// ABOUTME: Defines the engine and checkpoint traits plus an in-process tokio engine.

mod local;
mod simulation;
mod traits;

pub use local::LocalEngine;
pub use simulation::{Simulation, SleepSimulation};
pub use traits::{Checkpoints, WorkflowEngine};

#[cfg(test)]
mod local_test;
