// src/dag/builtin.rs

use tracing::debug;

use crate::config::model::{CompositeTaskConfig, ConfigFile};
use crate::dag::graph::{TaskExpr, TaskGraph, Unit};
use crate::errors::{Result, SitepipeError};
use crate::types::PipelineKind;

/// Task names that always exist and cannot be redefined in config.
pub const BUILTIN_TASKS: &[&str] = &[
    "styles",
    "scripts",
    "images",
    "watching",
    "browsersync",
    "cleanDist",
    "build",
    "default",
    "deploy",
];

/// The stock task set.
///
/// - `build`: cleanDist, styles, scripts, images, then the final copy into
///   `dist`, one after another.
/// - `default`: styles, scripts, browsersync and watching side by side.
pub fn builtin_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();

    graph
        .define("styles", Unit::Pipeline(PipelineKind::Styles))
        .define("scripts", Unit::Pipeline(PipelineKind::Scripts))
        .define("images", Unit::Pipeline(PipelineKind::Images))
        .define("watching", Unit::Watching)
        .define("browsersync", Unit::DevServer)
        .define("cleanDist", Unit::CleanDist)
        .define("deploy", Unit::Deploy)
        .define(
            "build",
            TaskExpr::named("cleanDist")
                .then(TaskExpr::named("styles"))
                .then(TaskExpr::named("scripts"))
                .then(TaskExpr::named("images"))
                .then(Unit::Pipeline(PipelineKind::Assemble)),
        )
        .define(
            "default",
            TaskExpr::all([
                TaskExpr::named("styles"),
                TaskExpr::named("scripts"),
                TaskExpr::named("browsersync"),
                TaskExpr::named("watching"),
            ]),
        );

    graph
}

/// Built-in tasks plus the `[tasks.<name>]` composites from config.
pub fn from_config(cfg: &ConfigFile) -> Result<TaskGraph> {
    let mut graph = builtin_graph();

    for (name, task) in &cfg.tasks {
        let expr = composite_expr(name, task)?;
        debug!(task = %name, "registered custom task");
        graph.define(name.clone(), expr);
    }

    graph.validate()?;
    Ok(graph)
}

fn composite_expr(name: &str, task: &CompositeTaskConfig) -> Result<TaskExpr> {
    let members = |names: &[String]| names.iter().map(TaskExpr::named).collect::<Vec<_>>();
    match (&task.series, &task.parallel) {
        (Some(series), None) => Ok(TaskExpr::series(members(series))),
        (None, Some(parallel)) => Ok(TaskExpr::all(members(parallel))),
        _ => Err(SitepipeError::ConfigError(format!(
            "task '{name}' must set exactly one of `series` or `parallel`"
        ))),
    }
}
