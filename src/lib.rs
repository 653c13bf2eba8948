// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod steps;
pub mod types;
pub mod watch;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::resolve_config;
use crate::context::BuildContext;
use crate::dag::{ExecutionPlan, RunSummary, Scheduler, TaskGraph};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent};
use crate::exec::RealExecutorBackend;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds the task graph and either prints it
/// (`--tasks`) or runs the requested tasks until they finish or Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let (cfg, root) = resolve_config(args.config.as_deref())?;
    let graph = dag::builtin::from_config(&cfg)?;

    if args.list_tasks {
        print!("{}", graph.render_tree());
        return Ok(());
    }

    let ctx = BuildContext::new(root, cfg);
    let names = args.requested_tasks();
    let summary = run_tasks(&ctx, &graph, &names, args.series).await?;

    if !summary.is_success() {
        let failed: Vec<_> = summary.failed().iter().map(|u| u.name()).collect();
        bail!("task(s) failed: {}", failed.join(", "));
    }
    Ok(())
}

/// Plan `names` against `graph` and execute the plan with the real executor.
///
/// Several names run side by side unless `series` is set. Ctrl-C cancels
/// the run; units already finished keep their outcome.
pub async fn run_tasks(
    ctx: &BuildContext,
    graph: &TaskGraph,
    names: &[String],
    series: bool,
) -> Result<RunSummary> {
    let expr = graph.entry(names, series)?;
    let plan = ExecutionPlan::from_expr(graph, &expr)?;
    info!(tasks = ?names, units = ?plan.units(), "starting run");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(ctx.clone(), rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    let ctrl_c = {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        })
    };
    drop(rt_tx);

    let core = CoreRuntime::new(Scheduler::new(plan));
    let summary = Runtime::new(core, rt_rx, executor).run().await;
    ctrl_c.abort();

    Ok(summary?)
}
