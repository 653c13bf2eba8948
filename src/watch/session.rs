// src/watch/session.rs

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, trace, warn};

use crate::context::BuildContext;
use crate::errors::{Result, SitepipeError};
use crate::pipeline::{FileMatcher, Pipeline, PipelineReport};
use crate::server::reload::ReloadHandle;
use crate::types::{PipelineKind, TriggerWhileRunningBehaviour};
use crate::watch::hash::{HashCache, compute_hash_for_paths};
use crate::watch::patterns::{WatchAction, WatchRule, build_watch_rules};
use crate::watch::queue::TriggerQueue;
use crate::watch::watcher::{FileWatcher, Subscription};

/// Which rules are running and what is queued behind them.
///
/// Pure state; the async loop in [`WatchSession::run`] feeds it changes and
/// completions and starts whatever it returns.
#[derive(Debug)]
pub struct SessionState {
    running: HashSet<String>,
    queue: TriggerQueue,
}

impl SessionState {
    pub fn new(behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        Self {
            running: HashSet::new(),
            queue: TriggerQueue::new(behaviour, queue_length),
        }
    }

    /// A rule fired. Returns `true` if it should start now; otherwise the
    /// trigger was queued behind the in-flight run.
    pub fn on_change(&mut self, label: &str) -> bool {
        if self.running.contains(label) {
            self.queue.record_trigger(label);
            false
        } else {
            self.running.insert(label.to_string());
            true
        }
    }

    /// A rule's run ended. Returns the labels whose pending re-run can
    /// start now.
    pub fn on_finished(&mut self, label: &str) -> Vec<String> {
        self.running.remove(label);

        let running = &self.running;
        let ready: Vec<String> = self
            .queue
            .labels()
            .filter(|l| !running.contains(*l))
            .map(str::to_string)
            .collect();

        for l in &ready {
            self.queue.take(l);
            self.running.insert(l.clone());
        }
        ready
    }

    pub fn is_running(&self, label: &str) -> bool {
        self.running.contains(label)
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_empty() && self.queue.is_empty()
    }
}

type Job = Result<PipelineReport>;

/// Long-lived watch loop: file changes re-run pipelines or reload browsers.
pub struct WatchSession {
    root: PathBuf,
    rules: Vec<WatchRule>,
    pipelines: HashMap<PipelineKind, Arc<Pipeline>>,
    reload: ReloadHandle,
    state: SessionState,
    hashes: HashCache,
    in_flight: HashMap<Id, String>,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("root", &self.root)
            .field("rules", &self.rules.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl WatchSession {
    pub fn new(ctx: &BuildContext) -> Result<Self> {
        let cfg = ctx.config();
        let rules = build_watch_rules(&cfg.watch)?;

        let mut pipelines = HashMap::new();
        for rule in &rules {
            if let WatchAction::RunPipeline(kind) = rule.action() {
                if !pipelines.contains_key(&kind) {
                    pipelines.insert(kind, Arc::new(ctx.pipeline(kind)?));
                }
            }
        }

        Ok(Self {
            root: ctx.root().to_path_buf(),
            rules,
            pipelines,
            reload: ctx.reload().clone(),
            state: SessionState::new(
                cfg.watch.triggered_while_running_behaviour,
                cfg.watch.queue_length,
            ),
            hashes: HashCache::new(),
            in_flight: HashMap::new(),
        })
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Watch until the surrounding task is aborted.
    pub async fn run(mut self) -> Result<()> {
        let watcher = FileWatcher::start(&self.root)?;
        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<usize>();

        let _subscriptions: Vec<Subscription> = self
            .rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| {
                let tx = change_tx.clone();
                let label = rule.label().to_string();
                watcher.subscribe(rule.matcher().clone(), move |rel| {
                    trace!(rule = %label, path = %rel, "watch rule matched");
                    let _ = tx.send(idx);
                })
            })
            .collect();
        drop(change_tx);

        self.seed_hashes();
        info!(
            rules = self.rules.len(),
            behaviour = ?self.state.queue.behaviour(),
            "watching for changes"
        );

        let mut running: JoinSet<Job> = JoinSet::new();

        loop {
            tokio::select! {
                Some(idx) = change_rx.recv() => self.on_change(idx, &mut running),
                Some(joined) = running.join_next_with_id(), if !running.is_empty() => {
                    self.on_joined(joined, &mut running);
                }
                else => break,
            }
        }

        debug!("watch session ended");
        Ok(())
    }

    fn on_change(&mut self, idx: usize, running: &mut JoinSet<Job>) {
        let Some(rule) = self.rules.get(idx) else {
            return;
        };

        match rule.action() {
            WatchAction::Reload => {
                info!(rule = %rule.label(), "page changed; reloading browsers");
                self.reload.reload();
            }
            WatchAction::RunPipeline(_) => {
                let label = rule.label().to_string();
                if self.state.on_change(&label) {
                    self.launch(vec![label], running);
                } else {
                    debug!(rule = %label, "pipeline still running; trigger queued");
                }
            }
        }
    }

    fn on_joined(
        &mut self,
        joined: std::result::Result<(Id, Job), JoinError>,
        running: &mut JoinSet<Job>,
    ) {
        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(e) => (e.id(), Err(SitepipeError::Other(anyhow::anyhow!(e)))),
        };
        let Some(label) = self.in_flight.remove(&id) else {
            warn!(task = %id, "finished task was not tracked");
            return;
        };

        match result {
            Ok(report) => info!(
                rule = %label,
                files = report.written.len(),
                "re-run finished"
            ),
            Err(e) => error!(rule = %label, error = %e, "re-run failed; waiting for the next change"),
        }

        let next = self.state.on_finished(&label);
        self.launch(next, running);
    }

    fn launch(&mut self, labels: Vec<String>, running: &mut JoinSet<Job>) {
        let mut todo = labels;

        while let Some(label) = todo.pop() {
            let Some(rule) = self.rules.iter().find(|r| r.label() == label) else {
                todo.extend(self.state.on_finished(&label));
                continue;
            };
            let WatchAction::RunPipeline(kind) = rule.action() else {
                todo.extend(self.state.on_finished(&label));
                continue;
            };

            if rule.use_hash() {
                match rule_hash(&self.root, rule) {
                    Ok(hash) if !self.hashes.update(&label, hash.clone()) => {
                        info!(rule = %label, "sources unchanged; skipping re-run");
                        todo.extend(self.state.on_finished(&label));
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => warn!(rule = %label, error = %e, "hashing failed; running anyway"),
                }
            }

            let Some(pipeline) = self.pipelines.get(&kind).cloned() else {
                todo.extend(self.state.on_finished(&label));
                continue;
            };
            let reload = self.reload.clone();

            info!(rule = %label, pipeline = %kind, "change detected; re-running pipeline");
            let handle = running.spawn_blocking(move || {
                catch_unwind(AssertUnwindSafe(|| pipeline.run(&reload))).unwrap_or_else(|_| {
                    Err(SitepipeError::Other(anyhow::anyhow!("pipeline {kind} panicked")))
                })
            });
            self.in_flight.insert(handle.id(), label);
        }
    }

    fn seed_hashes(&mut self) {
        for rule in self.rules.iter().filter(|r| r.use_hash()) {
            match rule_hash(&self.root, rule) {
                Ok(hash) => {
                    self.hashes.update(rule.label(), hash);
                }
                Err(e) => warn!(rule = %rule.label(), error = %e, "initial hash failed"),
            }
        }
    }
}

fn rule_hash(root: &std::path::Path, rule: &WatchRule) -> Result<String> {
    let paths = FileMatcher::new(root, rule.source_patterns())?.matching_paths()?;
    compute_hash_for_paths(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ConfigFile;

    #[test]
    fn second_trigger_waits_for_running_rule() {
        let mut state = SessionState::new(TriggerWhileRunningBehaviour::Queue, 1);
        assert!(state.on_change("styles"));
        assert!(!state.on_change("styles"));
        assert!(!state.on_change("styles"));
        assert!(state.on_change("scripts"));

        assert_eq!(state.on_finished("styles"), vec!["styles".to_string()]);
        assert!(state.on_finished("styles").is_empty());
        assert!(state.on_finished("scripts").is_empty());
        assert!(state.is_idle());
    }

    #[test]
    fn pending_rerun_waits_for_its_own_rule() {
        let mut state = SessionState::new(TriggerWhileRunningBehaviour::Queue, 1);
        assert!(state.on_change("styles"));
        assert!(state.on_change("scripts"));
        assert!(!state.on_change("scripts"));

        // scripts is still busy when styles ends.
        assert!(state.on_finished("styles").is_empty());
        assert!(state.is_running("scripts"));
        assert_eq!(state.on_finished("scripts"), vec!["scripts".to_string()]);
    }

    #[test]
    fn queued_reruns_of_different_rules_all_start() {
        let mut state = SessionState::new(TriggerWhileRunningBehaviour::Queue, 1);
        assert!(state.on_change("styles"));
        assert!(state.on_change("scripts"));
        assert!(!state.on_change("scripts"));
        assert!(!state.on_change("styles"));
        assert!(!state.on_change("styles"));

        let mut started = state.on_finished("styles");
        started.extend(state.on_finished("scripts"));
        started.sort();
        assert_eq!(started, vec!["scripts".to_string(), "styles".to_string()]);

        assert!(state.on_finished("styles").is_empty());
        assert!(state.on_finished("scripts").is_empty());
        assert!(state.is_idle());
    }

    #[test]
    fn cancel_mode_keeps_other_rules_pending() {
        let mut state = SessionState::new(TriggerWhileRunningBehaviour::Cancel, 1);
        assert!(state.on_change("styles"));
        assert!(state.on_change("scripts"));
        assert!(!state.on_change("styles"));
        assert!(!state.on_change("scripts"));

        assert_eq!(state.on_finished("styles"), vec!["styles".to_string()]);
        assert_eq!(state.on_finished("scripts"), vec!["scripts".to_string()]);
        assert!(state.on_finished("styles").is_empty());
        assert!(state.on_finished("scripts").is_empty());
        assert!(state.is_idle());
    }

    #[test]
    fn cancel_mode_collapses_repeated_triggers() {
        let mut state = SessionState::new(TriggerWhileRunningBehaviour::Cancel, 3);
        assert!(state.on_change("styles"));
        for _ in 0..4 {
            assert!(!state.on_change("styles"));
        }
        assert_eq!(state.on_finished("styles"), vec!["styles".to_string()]);
        assert!(state.on_finished("styles").is_empty());
    }

    #[tokio::test]
    async fn aborted_run_releases_its_rule() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = BuildContext::new(dir.path(), ConfigFile::default());
        let mut session = WatchSession::new(&ctx).unwrap();
        let mut running: JoinSet<Job> = JoinSet::new();

        assert!(session.state.on_change("styles"));
        let handle = running.spawn(std::future::pending::<Job>());
        session.in_flight.insert(handle.id(), "styles".to_string());
        handle.abort();

        let joined = running.join_next_with_id().await.unwrap();
        assert!(joined.is_err());
        session.on_joined(joined, &mut running);

        assert!(!session.state.is_running("styles"));
        assert!(session.in_flight.is_empty());
        assert!(session.state.on_change("styles"));
    }

    #[test]
    fn default_session_builds_styles_and_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = BuildContext::new(dir.path(), ConfigFile::default());
        let session = WatchSession::new(&ctx).unwrap();

        assert_eq!(session.rules().len(), 3);
        assert!(session.pipelines.contains_key(&PipelineKind::Styles));
        assert!(session.pipelines.contains_key(&PipelineKind::Scripts));
        assert!(!session.pipelines.contains_key(&PipelineKind::Images));
    }
}
