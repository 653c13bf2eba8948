// src/exec/units.rs

use anyhow::anyhow;
use tracing::info;

use crate::context::BuildContext;
use crate::dag::Unit;
use crate::errors::Result;
use crate::pipeline::clean::clean_dir;
use crate::pipeline::deploy::deploy;
use crate::server::DevServer;
use crate::types::PipelineKind;
use crate::watch::WatchSession;

/// Do the work behind one unit.
///
/// Pipelines run on the blocking pool. `Watching` and `DevServer` only
/// return on error; the executor aborts them at shutdown.
pub async fn run_unit(ctx: &BuildContext, unit: Unit) -> Result<()> {
    match unit {
        Unit::Pipeline(kind) => run_pipeline(ctx, kind).await,
        Unit::CleanDist => {
            let root = ctx.root().to_path_buf();
            let dist = ctx.config().paths.dist.clone();
            tokio::task::spawn_blocking(move || clean_dir(&root, &dist))
                .await
                .map_err(|e| anyhow!("cleanDist task: {e}"))?
        }
        Unit::Watching => WatchSession::new(ctx)?.run().await,
        Unit::DevServer => {
            let server = DevServer::from_config(&ctx.config().server, ctx.root());
            let mut running = server.start(ctx.reload().clone()).await?;
            info!(url = %format!("http://{}/", running.addr()), "browsersync: serving");
            running.wait().await
        }
        Unit::Deploy => {
            let report = deploy(ctx.root(), &ctx.config().deploy)?;
            info!(
                staged = report.staged.len(),
                published = report.published,
                "deploy finished"
            );
            Ok(())
        }
    }
}

async fn run_pipeline(ctx: &BuildContext, kind: PipelineKind) -> Result<()> {
    let pipeline = ctx.pipeline(kind)?;
    let reload = ctx.reload().clone();

    let report = tokio::task::spawn_blocking(move || pipeline.run(&reload))
        .await
        .map_err(|e| anyhow!("{kind} pipeline task: {e}"))??;

    info!(
        pipeline = %report.kind,
        matched = report.matched,
        files = report.written.len(),
        "pipeline done"
    );
    Ok(())
}
