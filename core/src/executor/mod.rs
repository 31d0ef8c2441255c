//! Dependency-ordered execution of action call sets.
//!
//! # Architecture
//!
//! ```text
//! Vec<ActionCall>
//!   ↓
//! Registry::validate_sequence() → existence, duplicates, conflicts
//!   ↓
//! Registry::dependency_graph() → DependencyGraph<String> (in-set edges only)
//!   ↓
//! DependencyGraph::parallel_groups() → Vec<Vec<String>> (or Cycle)
//!   ↓
//! Executor::execute_parallel()
//!   for each group: OutputNamespace::enrich → execute_group_parallel → commit
//!   ↓
//! ExecutionResult
//! ```
//!
//! A group only starts once every action of the previous group has finished
//! and its outputs were committed. The first failure (in submission order)
//! of a group ends the run.

mod engine;
mod graph;
mod namespace;
mod scheduler;
pub mod types;

pub use engine::Executor;
pub use graph::{Cycle, DependencyGraph};
pub use namespace::OutputNamespace;
pub use scheduler::execute_group_parallel;
pub use types::{ActionResult, ExecutionResult};
