// src/dag/mod.rs

//! Task composition and scheduling.
//!
//! - [`graph`]: units, task expressions (`then` / `all`) and the named task
//!   table, validated with petgraph.
//! - [`builtin`]: the stock tasks plus config-defined composites.
//! - [`plan`]: flattening a task into a DAG of unit nodes.
//! - [`scheduler`]: per-run node state; what is ready, what is skipped.

pub mod builtin;
pub mod graph;
pub mod plan;
pub mod scheduler;

pub use builtin::{BUILTIN_TASKS, builtin_graph};
pub use graph::{TaskExpr, TaskGraph, Unit};
pub use plan::{ExecutionPlan, NodeId, PlanNode};
pub use scheduler::{NodeState, RunSummary, ScheduledUnit, Scheduler, SchedulerStep};
