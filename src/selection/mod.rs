// ABOUTME: Selection module - pluggable policies deciding which waiting replicas exchange.
// ABOUTME: Includes partition validation and the built-in group-size and property policies.

mod builtin;
mod partition;
mod policy;

pub use builtin::{GroupSizePolicy, NearestPropertyPolicy};
pub use partition::{Partition, PartitionFault};
pub use policy::{PolicyDescription, Selection, SelectionPolicy};

#[cfg(test)]
mod builtin_test;
