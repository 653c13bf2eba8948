// src/watch/queue.rs

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::types::TriggerWhileRunningBehaviour;

/// Re-runs requested for rules whose pipeline is still running.
///
/// Pending runs are tracked per rule label, so a trigger for one rule never
/// displaces another rule's pending run.
///
/// - `Queue`: each label keeps up to `max_runs` pending re-runs; further
///   triggers for that label are dropped.
/// - `Cancel`: a trigger replaces whatever that label had pending with a
///   single re-run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    pending: BTreeMap<String, usize>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            pending: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Number of re-runs waiting for `label`.
    pub fn pending(&self, label: &str) -> usize {
        self.pending.get(label).copied().unwrap_or(0)
    }

    /// Record a trigger for `label`.
    pub fn record_trigger(&mut self, label: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let count = self.pending.entry(label.to_string()).or_insert(0);
                if *count < self.max_runs {
                    *count += 1;
                    debug!(rule = %label, pending = *count, "queued re-run");
                } else {
                    warn!(
                        rule = %label,
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping trigger"
                    );
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(rule = %label, "replacing pending re-run with this trigger");
                self.pending.insert(label.to_string(), 1);
            }
        }
    }

    /// Consume one pending re-run of `label`. Returns `false` if none was
    /// waiting.
    pub fn take(&mut self, label: &str) -> bool {
        let Some(count) = self.pending.get_mut(label) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.pending.remove(label);
        }
        true
    }

    /// Labels with at least one pending re-run, in name order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_tracks_labels_independently() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger("scripts");
        q.record_trigger("styles");
        q.record_trigger("styles");

        assert_eq!(q.pending("scripts"), 1);
        assert_eq!(q.pending("styles"), 1);
        assert_eq!(q.labels().collect::<Vec<_>>(), ["scripts", "styles"]);
    }

    #[test]
    fn queue_length_bounds_repeated_triggers() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        for _ in 0..5 {
            q.record_trigger("styles");
        }
        assert!(q.take("styles"));
        assert!(q.take("styles"));
        assert!(!q.take("styles"));
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_replaces_only_the_same_label() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        q.record_trigger("styles");
        q.record_trigger("styles");
        q.record_trigger("scripts");

        assert_eq!(q.pending("styles"), 1);
        assert_eq!(q.pending("scripts"), 1);
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger("images");
        assert!(!q.is_empty());
        assert!(q.take("images"));
    }
}
