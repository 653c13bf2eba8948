// src/dag/plan.rs

use crate::dag::graph::{TaskExpr, TaskGraph, Unit};
use crate::errors::{Result, SitepipeError};

/// Index of a node in an [`ExecutionPlan`].
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub id: NodeId,
    pub unit: Unit,
    /// Nodes that must succeed before this one may start.
    pub deps: Vec<NodeId>,
}

/// A task expression flattened into a DAG of unit nodes.
///
/// Every item of a series depends on the exit nodes of the item before it;
/// parallel items share the same dependencies and do not depend on each
/// other. Named references are inlined, so a task used twice yields two
/// nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    nodes: Vec<PlanNode>,
    dependents: Vec<Vec<NodeId>>,
}

impl ExecutionPlan {
    /// Plan `expr`, resolving names against a validated `graph`.
    pub fn from_expr(graph: &TaskGraph, expr: &TaskExpr) -> Result<Self> {
        let mut plan = Self::default();
        let mut stack = Vec::new();
        plan.add(graph, expr, &[], &mut stack)?;
        Ok(plan)
    }

    /// Returns the exit nodes of `expr`: what a following series item must
    /// wait for.
    fn add(
        &mut self,
        graph: &TaskGraph,
        expr: &TaskExpr,
        deps: &[NodeId],
        stack: &mut Vec<String>,
    ) -> Result<Vec<NodeId>> {
        match expr {
            TaskExpr::Unit(unit) => {
                let id = self.nodes.len();
                self.nodes.push(PlanNode {
                    id,
                    unit: *unit,
                    deps: deps.to_vec(),
                });
                self.dependents.push(Vec::new());
                for &dep in deps {
                    self.dependents[dep].push(id);
                }
                Ok(vec![id])
            }
            TaskExpr::Named(name) => {
                if stack.iter().any(|n| n == name) {
                    return Err(SitepipeError::TaskCycle(format!(
                        "{} -> {name}",
                        stack.join(" -> ")
                    )));
                }
                let body = graph
                    .get(name)
                    .ok_or_else(|| SitepipeError::TaskNotFound(name.clone()))?;
                stack.push(name.clone());
                let exits = self.add(graph, body, deps, stack)?;
                stack.pop();
                Ok(exits)
            }
            TaskExpr::Series(items) => {
                let mut current = deps.to_vec();
                for item in items {
                    current = self.add(graph, item, &current, stack)?;
                }
                Ok(current)
            }
            TaskExpr::Parallel(items) => {
                if items.is_empty() {
                    return Ok(deps.to_vec());
                }
                let mut exits = Vec::new();
                for item in items {
                    exits.extend(self.add(graph, item, deps, stack)?);
                }
                Ok(exits)
            }
        }
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&PlanNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dependents_of(&self, id: NodeId) -> &[NodeId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Units in node order, mostly for logging and tests.
    pub fn units(&self) -> Vec<Unit> {
        self.nodes.iter().map(|n| n.unit).collect()
    }
}
