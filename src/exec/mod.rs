// src/exec/mod.rs

//! Unit execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime talks to,
//!   and `RealExecutorBackend`, which tests replace with a fake.
//! - [`command`] owns the executor loop: one Tokio task per running unit.
//! - [`units`] maps each [`Unit`](crate::dag::Unit) to the work it does.

pub mod backend;
pub mod command;
pub mod units;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use command::{ExecMessage, spawn_executor};
pub use units::run_unit;
