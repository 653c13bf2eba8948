// src/dag/scheduler.rs

use tracing::{debug, info, warn};

use crate::dag::graph::Unit;
use crate::dag::plan::{ExecutionPlan, NodeId};
use crate::engine::UnitOutcome;

/// Per-node state within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// Waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    Succeeded,
    Failed(String),
    /// Never started because something it depends on failed.
    Skipped,
    /// Pending or running when the run was shut down.
    Cancelled,
}

impl NodeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NodeState::Pending | NodeState::Running)
    }
}

/// A node handed to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledUnit {
    pub node: NodeId,
    pub unit: Unit,
}

/// What one scheduler transition produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    pub newly_scheduled: Vec<ScheduledUnit>,
    pub newly_skipped: Vec<NodeId>,
    pub run_just_finished: bool,
}

/// Final state of every node in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub nodes: Vec<(Unit, NodeState)>,
}

impl RunSummary {
    fn units_where(&self, pred: impl Fn(&NodeState) -> bool) -> Vec<Unit> {
        self.nodes
            .iter()
            .filter(|(_, s)| pred(s))
            .map(|(u, _)| *u)
            .collect()
    }

    pub fn succeeded(&self) -> Vec<Unit> {
        self.units_where(|s| *s == NodeState::Succeeded)
    }

    pub fn failed(&self) -> Vec<Unit> {
        self.units_where(|s| matches!(s, NodeState::Failed(_)))
    }

    pub fn skipped(&self) -> Vec<Unit> {
        self.units_where(|s| *s == NodeState::Skipped)
    }

    pub fn cancelled(&self) -> Vec<Unit> {
        self.units_where(|s| *s == NodeState::Cancelled)
    }

    /// No node failed or was skipped.
    pub fn is_success(&self) -> bool {
        self.failed().is_empty() && self.skipped().is_empty()
    }
}

/// Drives one run of an [`ExecutionPlan`]: decides which nodes are ready,
/// records outcomes and skips the dependents of failed nodes.
#[derive(Debug)]
pub struct Scheduler {
    plan: ExecutionPlan,
    states: Vec<NodeState>,
    started: bool,
}

impl Scheduler {
    pub fn new(plan: ExecutionPlan) -> Self {
        let states = vec![NodeState::Pending; plan.len()];
        Self {
            plan,
            states,
            started: false,
        }
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn state_of(&self, node: NodeId) -> Option<&NodeState> {
        self.states.get(node)
    }

    /// Every node is in a terminal state.
    pub fn is_finished(&self) -> bool {
        self.states.iter().all(NodeState::is_terminal)
    }

    /// Dispatch the roots. Later calls return nothing.
    pub fn start(&mut self) -> SchedulerStep {
        if self.started {
            return SchedulerStep::default();
        }
        self.started = true;
        info!(nodes = self.plan.len(), "scheduler: starting run");

        SchedulerStep {
            newly_scheduled: self.collect_new_ready(),
            newly_skipped: Vec::new(),
            run_just_finished: self.is_finished(),
        }
    }

    pub fn handle_completion(&mut self, node: NodeId, outcome: UnitOutcome) -> SchedulerStep {
        let Some(unit) = self.plan.node(node).map(|n| n.unit) else {
            warn!(node, "completion for unknown node; ignoring");
            return SchedulerStep::default();
        };

        if self.states[node] != NodeState::Running {
            warn!(
                node,
                unit = %unit,
                state = ?self.states[node],
                "completion for a node that is not running; ignoring"
            );
            return SchedulerStep::default();
        }

        let was_finished = self.is_finished();
        let mut step = SchedulerStep::default();

        match outcome {
            UnitOutcome::Success => {
                debug!(node, unit = %unit, "unit succeeded");
                self.states[node] = NodeState::Succeeded;
                step.newly_scheduled = self.collect_new_ready();
            }
            UnitOutcome::Failed(message) => {
                warn!(node, unit = %unit, error = %message, "unit failed; skipping what depends on it");
                self.states[node] = NodeState::Failed(message);
                step.newly_skipped = self.mark_dependents_skipped(node);
            }
        }

        step.run_just_finished = !was_finished && self.is_finished();
        step
    }

    /// Mark every pending or running node as cancelled. Returns the nodes
    /// that were running.
    pub fn cancel_in_flight(&mut self) -> Vec<NodeId> {
        let mut running = Vec::new();
        for (id, state) in self.states.iter_mut().enumerate() {
            match state {
                NodeState::Running => {
                    running.push(id);
                    *state = NodeState::Cancelled;
                }
                NodeState::Pending => *state = NodeState::Cancelled,
                _ => {}
            }
        }
        running
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            nodes: self
                .plan
                .nodes()
                .iter()
                .zip(&self.states)
                .map(|(n, s)| (n.unit, s.clone()))
                .collect(),
        }
    }

    /// Skip every pending node reachable from `failed`.
    fn mark_dependents_skipped(&mut self, failed: NodeId) -> Vec<NodeId> {
        let mut stack: Vec<NodeId> = self.plan.dependents_of(failed).to_vec();
        let mut skipped = Vec::new();

        while let Some(id) = stack.pop() {
            if self.states[id] == NodeState::Pending {
                debug!(node = id, unit = %self.plan.nodes()[id].unit, "skipped after upstream failure");
                self.states[id] = NodeState::Skipped;
                skipped.push(id);
                stack.extend_from_slice(self.plan.dependents_of(id));
            }
        }

        skipped.sort_unstable();
        skipped
    }

    /// Pending nodes whose dependencies all succeeded, now marked running.
    fn collect_new_ready(&mut self) -> Vec<ScheduledUnit> {
        let ready: Vec<NodeId> = self
            .plan
            .nodes()
            .iter()
            .filter(|n| self.states[n.id] == NodeState::Pending)
            .filter(|n| n.deps.iter().all(|&d| self.states[d] == NodeState::Succeeded))
            .map(|n| n.id)
            .collect();

        ready
            .into_iter()
            .map(|id| {
                self.states[id] = NodeState::Running;
                let unit = self.plan.nodes()[id].unit;
                info!(node = id, unit = %unit, "scheduling unit");
                ScheduledUnit { node: id, unit }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::builtin::builtin_graph;
    use crate::dag::graph::TaskExpr;
    use crate::types::PipelineKind;

    fn scheduler_for(name: &str) -> Scheduler {
        let graph = builtin_graph();
        Scheduler::new(ExecutionPlan::from_expr(&graph, &TaskExpr::named(name)).unwrap())
    }

    #[test]
    fn series_runs_one_at_a_time() {
        let mut s = scheduler_for("build");
        let step = s.start();
        assert_eq!(step.newly_scheduled.len(), 1);
        assert_eq!(step.newly_scheduled[0].unit, Unit::CleanDist);

        let step = s.handle_completion(0, UnitOutcome::Success);
        assert_eq!(
            step.newly_scheduled,
            vec![ScheduledUnit {
                node: 1,
                unit: Unit::Pipeline(PipelineKind::Styles)
            }]
        );
    }

    #[test]
    fn failure_in_series_skips_the_rest() {
        let mut s = scheduler_for("build");
        s.start();
        s.handle_completion(0, UnitOutcome::Success);
        let step = s.handle_completion(1, UnitOutcome::Failed("bad scss".into()));

        assert!(step.newly_scheduled.is_empty());
        assert_eq!(step.newly_skipped, vec![2, 3, 4]);
        assert!(step.run_just_finished);

        let summary = s.summary();
        assert!(!summary.is_success());
        assert_eq!(summary.failed(), vec![Unit::Pipeline(PipelineKind::Styles)]);
        assert_eq!(summary.skipped().len(), 3);
    }

    #[test]
    fn parallel_siblings_survive_a_failure() {
        let mut graph = builtin_graph();
        graph.define("assets", TaskExpr::all([
            TaskExpr::named("styles"),
            TaskExpr::named("scripts"),
        ]));
        let mut s =
            Scheduler::new(ExecutionPlan::from_expr(&graph, &TaskExpr::named("assets")).unwrap());

        assert_eq!(s.start().newly_scheduled.len(), 2);
        let step = s.handle_completion(0, UnitOutcome::Failed("boom".into()));
        assert!(step.newly_skipped.is_empty());
        assert!(!step.run_just_finished);

        let step = s.handle_completion(1, UnitOutcome::Success);
        assert!(step.run_just_finished);
        assert_eq!(s.summary().succeeded(), vec![Unit::Pipeline(PipelineKind::Scripts)]);
    }

    #[test]
    fn duplicate_and_stale_completions_are_ignored() {
        let mut s = scheduler_for("styles");
        s.start();
        assert!(s.handle_completion(0, UnitOutcome::Success).run_just_finished);
        assert_eq!(s.handle_completion(0, UnitOutcome::Success), SchedulerStep::default());
        assert_eq!(s.handle_completion(42, UnitOutcome::Success), SchedulerStep::default());
    }

    #[test]
    fn cancel_marks_everything_unfinished() {
        let mut s = scheduler_for("default");
        s.start();
        s.handle_completion(0, UnitOutcome::Success);

        let running = s.cancel_in_flight();
        assert_eq!(running, vec![1, 2, 3]);
        assert!(s.is_finished());
        assert!(s.summary().is_success());
        assert_eq!(s.summary().cancelled().len(), 3);
    }
}
