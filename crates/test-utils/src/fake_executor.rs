use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use sitepipe::dag::{ScheduledUnit, Unit};
use sitepipe::engine::{RuntimeEvent, UnitOutcome};
use sitepipe::exec::backend::{BackendFuture, ExecutorBackend};

/// A fake executor that:
/// - records which units were "run", in dispatch order
/// - immediately reports a completion for each one, failing the units it
///   was told to fail
/// - never completes long-lived units (`watching`, `browsersync`), which
///   only end on shutdown
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<Unit>>>,
    failing: HashSet<Unit>,
    cancelled: Arc<Mutex<bool>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<Unit>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
            cancelled: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing(mut self, unit: Unit) -> Self {
        self.failing.insert(unit);
        self
    }

    /// Set once the runtime asks to cancel everything.
    pub fn cancelled_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.cancelled)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_units(&mut self, units: Vec<ScheduledUnit>) -> BackendFuture<'_> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for scheduled in units {
                executed.lock().unwrap().push(scheduled.unit);

                if scheduled.unit.is_long_lived() {
                    continue;
                }
                let outcome = if failing.contains(&scheduled.unit) {
                    UnitOutcome::Failed(format!("{} failed on purpose", scheduled.unit))
                } else {
                    UnitOutcome::Success
                };
                tx.send(RuntimeEvent::UnitCompleted {
                    node: scheduled.node,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn cancel_all(&mut self) -> BackendFuture<'_> {
        let cancelled = Arc::clone(&self.cancelled);
        Box::pin(async move {
            *cancelled.lock().unwrap() = true;
            Ok(())
        })
    }
}
