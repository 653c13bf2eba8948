// src/exec/command.rs

//! Background executor loop.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::context::BuildContext;
use crate::dag::ScheduledUnit;
use crate::engine::{RuntimeEvent, UnitOutcome};
use crate::exec::units::run_unit;

/// Requests sent to the executor loop.
#[derive(Debug, Clone)]
pub enum ExecMessage {
    Run(ScheduledUnit),
    CancelAll,
}

/// Spawn the executor loop and return the sender that feeds it.
///
/// Every unit runs in its own Tokio task and reports a `UnitCompleted`
/// event when it returns. `CancelAll`, or closing the channel, aborts
/// whatever is still running; aborted units report nothing.
pub fn spawn_executor(
    ctx: BuildContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ExecMessage> {
    let (tx, mut rx) = mpsc::channel::<ExecMessage>(32);

    tokio::spawn(async move {
        info!("executor loop started");
        let mut active: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(ExecMessage::Run(scheduled)) => {
                        let ctx = ctx.clone();
                        let rt_tx = runtime_tx.clone();
                        active.spawn(run_and_report(ctx, scheduled, rt_tx));
                    }
                    Some(ExecMessage::CancelAll) => {
                        info!(units = active.len(), "aborting running units");
                        active.abort_all();
                    }
                    None => break,
                },
                Some(joined) = active.join_next(), if !active.is_empty() => {
                    if let Err(err) = joined {
                        if !err.is_cancelled() {
                            error!(error = %err, "unit task ended abnormally");
                        }
                    }
                }
            }
        }

        active.shutdown().await;
        info!("executor loop finished (channel closed)");
    });

    tx
}

async fn run_and_report(
    ctx: BuildContext,
    scheduled: ScheduledUnit,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let ScheduledUnit { node, unit } = scheduled;
    info!(task = %unit, node, "starting unit");

    let result = AssertUnwindSafe(run_unit(&ctx, unit)).catch_unwind().await;
    let outcome = match result {
        Ok(Ok(())) => {
            info!(task = %unit, "unit finished");
            UnitOutcome::Success
        }
        Ok(Err(err)) => {
            error!(task = %unit, error = %err, "unit failed");
            UnitOutcome::Failed(err.to_string())
        }
        Err(_) => {
            error!(task = %unit, "unit panicked");
            UnitOutcome::Failed(format!("{unit} panicked"))
        }
    };

    if runtime_tx
        .send(RuntimeEvent::UnitCompleted { node, outcome })
        .await
        .is_err()
    {
        debug!(task = %unit, "runtime gone; completion dropped");
    }
}
