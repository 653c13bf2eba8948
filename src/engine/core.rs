// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! No channels, no Tokio types and no IO: the core can be driven step by
//! step from unit tests.

use tracing::info;

use crate::dag::{RunSummary, Scheduler};
use crate::engine::{CoreCommand, CoreStep, RuntimeEvent};

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    interrupted: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            interrupted: false,
        }
    }

    /// Kick off the run: dispatch every node without dependencies.
    pub fn start(&mut self) -> CoreStep {
        let step = self.scheduler.start();
        let mut commands = Vec::new();
        if !step.newly_scheduled.is_empty() {
            commands.push(CoreCommand::Dispatch(step.newly_scheduled));
        }
        CoreStep {
            commands,
            keep_running: !self.scheduler.is_finished(),
        }
    }

    /// Handle a single runtime event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::UnitCompleted { node, outcome } => {
                let step = self.scheduler.handle_completion(node, outcome);
                let mut commands = Vec::new();
                if !step.newly_scheduled.is_empty() {
                    commands.push(CoreCommand::Dispatch(step.newly_scheduled));
                }
                if step.run_just_finished {
                    info!("every unit reached a final state");
                }
                CoreStep {
                    commands,
                    keep_running: !self.scheduler.is_finished(),
                }
            }
            RuntimeEvent::ShutdownRequested => {
                self.interrupted = true;
                let running = self.scheduler.cancel_in_flight();
                info!(in_flight = running.len(), "shutdown requested; cancelling run");
                let commands = if running.is_empty() {
                    Vec::new()
                } else {
                    vec![CoreCommand::CancelAll]
                };
                CoreStep {
                    commands,
                    keep_running: false,
                }
            }
        }
    }

    /// Whether the run ended on a shutdown request.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    pub fn summary(&self) -> RunSummary {
        self.scheduler.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::builtin::builtin_graph;
    use crate::dag::graph::{TaskExpr, Unit};
    use crate::dag::plan::ExecutionPlan;
    use crate::engine::UnitOutcome;

    fn core_for(names: &[&str], series: bool) -> CoreRuntime {
        let graph = builtin_graph();
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let expr = graph.entry(&names, series).unwrap();
        let plan = ExecutionPlan::from_expr(&graph, &expr).unwrap();
        CoreRuntime::new(Scheduler::new(plan))
    }

    fn dispatched(step: &CoreStep) -> Vec<Unit> {
        step.commands
            .iter()
            .flat_map(|c| match c {
                CoreCommand::Dispatch(units) => units.iter().map(|u| u.unit).collect(),
                CoreCommand::CancelAll => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn series_of_cli_tasks_runs_in_order() {
        let mut core = core_for(&["cleanDist", "deploy"], true);
        let step = core.start();
        assert_eq!(dispatched(&step), vec![Unit::CleanDist]);
        assert!(step.keep_running);

        let step = core.step(RuntimeEvent::UnitCompleted {
            node: 0,
            outcome: UnitOutcome::Success,
        });
        assert_eq!(dispatched(&step), vec![Unit::Deploy]);

        let step = core.step(RuntimeEvent::UnitCompleted {
            node: 1,
            outcome: UnitOutcome::Success,
        });
        assert!(!step.keep_running);
        assert!(core.summary().is_success());
    }

    #[test]
    fn failure_ends_a_series_run() {
        let mut core = core_for(&["cleanDist", "deploy"], true);
        core.start();
        let step = core.step(RuntimeEvent::UnitCompleted {
            node: 0,
            outcome: UnitOutcome::Failed("denied".into()),
        });
        assert!(step.commands.is_empty());
        assert!(!step.keep_running);
        assert_eq!(core.summary().skipped(), vec![Unit::Deploy]);
    }

    #[test]
    fn shutdown_cancels_long_lived_units() {
        let mut core = core_for(&["watching", "browsersync"], false);
        assert_eq!(dispatched(&core.start()).len(), 2);

        let step = core.step(RuntimeEvent::ShutdownRequested);
        assert_eq!(step.commands, vec![CoreCommand::CancelAll]);
        assert!(!step.keep_running);
        assert!(core.interrupted());
        assert_eq!(core.summary().cancelled().len(), 2);
    }
}
