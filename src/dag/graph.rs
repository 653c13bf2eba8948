// src/dag/graph.rs

use std::collections::BTreeMap;
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, SitepipeError};
use crate::types::PipelineKind;

/// Smallest schedulable piece of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit {
    Pipeline(PipelineKind),
    CleanDist,
    Watching,
    DevServer,
    Deploy,
}

impl Unit {
    pub fn name(&self) -> &'static str {
        match self {
            Unit::Pipeline(kind) => kind.as_str(),
            Unit::CleanDist => "cleanDist",
            Unit::Watching => "watching",
            Unit::DevServer => "browsersync",
            Unit::Deploy => "deploy",
        }
    }

    /// Runs until the run is shut down rather than completing.
    pub fn is_long_lived(&self) -> bool {
        matches!(self, Unit::Watching | Unit::DevServer)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A task body: units composed in series and in parallel, possibly
/// referring to other named tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExpr {
    Unit(Unit),
    Named(String),
    Series(Vec<TaskExpr>),
    Parallel(Vec<TaskExpr>),
}

impl TaskExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TaskExpr::Named(name.into())
    }

    pub fn series<I: IntoIterator<Item = TaskExpr>>(items: I) -> Self {
        TaskExpr::Series(items.into_iter().collect())
    }

    pub fn all<I: IntoIterator<Item = TaskExpr>>(items: I) -> Self {
        TaskExpr::Parallel(items.into_iter().collect())
    }

    /// Run `next` after `self`. Chained calls extend one flat series.
    pub fn then(self, next: impl Into<TaskExpr>) -> Self {
        match self {
            TaskExpr::Series(mut items) => {
                items.push(next.into());
                TaskExpr::Series(items)
            }
            other => TaskExpr::Series(vec![other, next.into()]),
        }
    }

    /// Names this expression refers to directly.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TaskExpr::Unit(_) => {}
            TaskExpr::Named(name) => out.push(name),
            TaskExpr::Series(items) | TaskExpr::Parallel(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
        }
    }
}

impl From<Unit> for TaskExpr {
    fn from(unit: Unit) -> Self {
        TaskExpr::Unit(unit)
    }
}

/// Named tasks, the CLI surface.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<String, TaskExpr>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or replace a task.
    pub fn define(&mut self, name: impl Into<String>, expr: impl Into<TaskExpr>) -> &mut Self {
        self.tasks.insert(name.into(), expr.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&TaskExpr> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Check that every reference resolves and that no task reaches itself.
    pub fn validate(&self) -> Result<()> {
        // Edge direction: referencing task -> referenced task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for (name, expr) in &self.tasks {
            graph.add_node(name.as_str());
            for reference in expr.references() {
                if !self.tasks.contains_key(reference) {
                    return Err(SitepipeError::TaskNotFound(format!(
                        "{reference} (referenced by task '{name}')"
                    )));
                }
                graph.add_edge(name.as_str(), reference, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(SitepipeError::TaskCycle(format!(
                "task '{}' depends on itself",
                cycle.node_id()
            ))),
        }
    }

    /// Combine the tasks named on the command line into one expression.
    pub fn entry(&self, names: &[String], series: bool) -> Result<TaskExpr> {
        for name in names {
            if !self.contains(name) {
                return Err(SitepipeError::TaskNotFound(name.clone()));
            }
        }

        let mut items: Vec<TaskExpr> = names.iter().map(TaskExpr::named).collect();
        Ok(match (items.len(), series) {
            (1, _) => items.remove(0),
            (_, true) => TaskExpr::series(items),
            (_, false) => TaskExpr::all(items),
        })
    }

    /// Human-readable tree of every task, as printed by `--tasks`.
    pub fn render_tree(&self) -> String {
        let mut out = String::from("Tasks\n");
        let count = self.tasks.len();
        for (i, (name, expr)) in self.tasks.iter().enumerate() {
            let last = i + 1 == count;
            render_task(&mut out, name, expr, "", last);
        }
        out
    }
}

fn render_task(out: &mut String, name: &str, expr: &TaskExpr, prefix: &str, last: bool) {
    let branch = if last { "└─" } else { "├─" };
    let child_prefix = format!("{prefix}{}", if last { "  " } else { "│ " });

    match expr {
        TaskExpr::Unit(unit) if unit.name() == name => {
            out.push_str(&format!("{prefix}{branch}─ {name}\n"));
        }
        other => {
            out.push_str(&format!("{prefix}{branch}┬ {name}\n"));
            render_expr(out, other, &child_prefix, true);
        }
    }
}

fn render_expr(out: &mut String, expr: &TaskExpr, prefix: &str, last: bool) {
    let branch = if last { "└─" } else { "├─" };
    let child_prefix = format!("{prefix}{}", if last { "  " } else { "│ " });

    match expr {
        TaskExpr::Unit(unit) => out.push_str(&format!("{prefix}{branch}─ {unit}\n")),
        TaskExpr::Named(name) => out.push_str(&format!("{prefix}{branch}─ {name}\n")),
        TaskExpr::Series(items) | TaskExpr::Parallel(items) => {
            let label = if matches!(expr, TaskExpr::Series(_)) {
                "<series>"
            } else {
                "<parallel>"
            };
            out.push_str(&format!("{prefix}{branch}┬ {label}\n"));
            for (i, item) in items.iter().enumerate() {
                render_expr(out, item, &child_prefix, i + 1 == items.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn then_builds_one_flat_series() {
        let expr = TaskExpr::named("a").then(TaskExpr::named("b")).then(Unit::CleanDist);
        assert_eq!(
            expr,
            TaskExpr::Series(vec![
                TaskExpr::named("a"),
                TaskExpr::named("b"),
                TaskExpr::Unit(Unit::CleanDist),
            ])
        );
    }

    #[test]
    fn unknown_reference_is_task_not_found() {
        let mut graph = TaskGraph::new();
        graph.define("a", TaskExpr::named("missing"));
        assert!(matches!(graph.validate(), Err(SitepipeError::TaskNotFound(_))));
    }

    #[test]
    fn cycle_is_rejected() {
        let mut graph = TaskGraph::new();
        graph
            .define("a", TaskExpr::named("b"))
            .define("b", TaskExpr::all([TaskExpr::named("a"), Unit::Deploy.into()]));
        assert!(matches!(graph.validate(), Err(SitepipeError::TaskCycle(_))));
    }

    #[test]
    fn entry_combines_cli_tasks() {
        let mut graph = TaskGraph::new();
        graph.define("a", Unit::CleanDist).define("b", Unit::Deploy);

        let names = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(graph.entry(&names, false).unwrap(), TaskExpr::Parallel(_)));
        assert!(matches!(graph.entry(&names, true).unwrap(), TaskExpr::Series(_)));
        assert_eq!(graph.entry(&names[..1], true).unwrap(), TaskExpr::named("a"));
        assert!(matches!(
            graph.entry(&["nope".to_string()], false),
            Err(SitepipeError::TaskNotFound(_))
        ));
    }
}
