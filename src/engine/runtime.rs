// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{RunSummary, ScheduledUnit};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Drives a [`CoreRuntime`] from `RuntimeEvent`s and hands ready units to
/// an `ExecutorBackend`.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run until every node is terminal or shutdown is requested.
    pub async fn run(mut self) -> Result<RunSummary> {
        let start = self.core.start();
        let mut keep_running = start.keep_running;
        for command in start.commands {
            self.execute_command(command).await?;
        }

        while keep_running {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };
            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                self.execute_command(command).await?;
            }
            keep_running = step.keep_running;
        }

        let summary = self.core.summary();
        info!(
            succeeded = summary.succeeded().len(),
            failed = summary.failed().len(),
            skipped = summary.skipped().len(),
            interrupted = self.core.interrupted(),
            "run finished"
        );
        Ok(summary)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch(units) => self.spawn_ready(units).await,
            CoreCommand::CancelAll => {
                info!("cancelling in-flight units");
                self.executor.cancel_all().await
            }
        }
    }

    async fn spawn_ready(&mut self, units: Vec<ScheduledUnit>) -> Result<()> {
        if units.is_empty() {
            return Ok(());
        }
        let names: Vec<_> = units.iter().map(|u| u.unit.name()).collect();
        debug!(?names, "spawning ready units");
        self.executor.spawn_ready_units(units).await
    }
}
