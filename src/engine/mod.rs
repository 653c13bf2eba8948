// src/engine/mod.rs

//! Orchestration engine for a task run.
//!
//! The pure state machine lives in [`core`]: it consumes [`RuntimeEvent`]s
//! and answers with [`CoreCommand`]s. The async shell in [`runtime`] reads
//! events from a channel and hands ready units to an
//! [`ExecutorBackend`](crate::exec::ExecutorBackend).

use crate::dag::{NodeId, ScheduledUnit};

/// How a unit finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Success,
    Failed(String),
}

/// Events flowing into the runtime.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dispatched unit finished.
    UnitCompleted { node: NodeId, outcome: UnitOutcome },
    /// Graceful shutdown requested (Ctrl-C).
    ShutdownRequested,
}

/// What the IO shell should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    Dispatch(Vec<ScheduledUnit>),
    /// Abort every unit still running.
    CancelAll,
}

/// Result of feeding one event into the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

pub mod core;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use self::runtime::Runtime;
