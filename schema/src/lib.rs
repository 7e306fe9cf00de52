// Rule Battle Schema - Authored content definitions
// This crate holds the data shapes that content authors write (stat blocks,
// abilities, decision rules). It carries no engine logic so that loaders and
// tools can depend on it without pulling in the simulation.

pub use ability::*;
pub use rule::*;
pub use stats::*;

pub mod ability;
pub mod rule;
pub mod stats;
