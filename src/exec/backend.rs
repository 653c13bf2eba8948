// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a backend that records what was scheduled and
//! emits `UnitCompleted` events directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::context::BuildContext;
use crate::dag::ScheduledUnit;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, SitepipeError};

use super::command::{ExecMessage, spawn_executor};

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

pub trait ExecutorBackend: Send {
    /// Dispatch the given units for execution. Each one must eventually
    /// produce a `UnitCompleted` event unless it is cancelled.
    fn spawn_ready_units(&mut self, units: Vec<ScheduledUnit>) -> BackendFuture<'_>;

    /// Abort every unit still running. No completion is reported for them.
    fn cancel_all(&mut self) -> BackendFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// Production backend: forwards units to the loop started by
/// [`spawn_executor`].
pub struct RealExecutorBackend {
    tx: mpsc::Sender<ExecMessage>,
}

impl RealExecutorBackend {
    /// Spawns the background executor loop immediately.
    pub fn new(ctx: BuildContext, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(ctx, runtime_tx);
        Self { tx }
    }

    fn send(&self, msg: ExecMessage) -> BackendFuture<'static> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();
        Box::pin(async move { tx.send(msg).await.map_err(|_| executor_gone()) })
    }
}

fn executor_gone() -> SitepipeError {
    SitepipeError::Other(anyhow::anyhow!("executor loop is no longer running"))
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_units(&mut self, units: Vec<ScheduledUnit>) -> BackendFuture<'_> {
        let tx = self.tx.clone();
        Box::pin(async move {
            for unit in units {
                tx.send(ExecMessage::Run(unit))
                    .await
                    .map_err(|_| executor_gone())?;
            }
            Ok(())
        })
    }

    fn cancel_all(&mut self) -> BackendFuture<'_> {
        self.send(ExecMessage::CancelAll)
    }
}
