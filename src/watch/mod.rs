// src/watch/mod.rs

//! Filesystem watching.
//!
//! - [`patterns`]: compiled watch rules and glob helpers.
//! - [`watcher`]: `notify`-backed watcher with drop-to-unsubscribe
//!   subscriptions.
//! - [`queue`]: what happens to triggers that arrive mid-run.
//! - [`hash`]: blake3 content hashes to skip no-op re-runs.
//! - [`session`]: the `watching` task itself.

pub mod hash;
pub mod patterns;
pub mod queue;
pub mod session;
pub mod watcher;

pub use patterns::{PathMatcher, WatchAction, WatchRule, build_watch_rules};
pub use queue::TriggerQueue;
pub use session::{SessionState, WatchSession};
pub use watcher::{FileWatcher, Subscription, SubscriptionRegistry};
