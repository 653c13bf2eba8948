// src/watch/watcher.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::errors::Result;
use crate::watch::patterns::{PathMatcher, relative_str};

/// Callback run for every changed root-relative path a subscription matches.
pub type ChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

struct Entry {
    matcher: PathMatcher,
    handler: ChangeHandler,
}

/// Set of live subscriptions, keyed by id so iteration order is stable.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.len())
            .finish()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, matcher: PathMatcher, handler: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(
            id,
            Entry {
                matcher,
                handler: Arc::new(handler),
            },
        );
        debug!(id, "watch subscription added");

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every handler whose matcher accepts `rel_path`. Returns how many
    /// ran.
    pub fn dispatch(&self, rel_path: &str) -> usize {
        // Handlers run outside the lock so they may subscribe or drop
        // subscriptions themselves.
        let handlers: Vec<ChangeHandler> = lock(&self.inner)
            .entries
            .values()
            .filter(|e| e.matcher.matches(rel_path))
            .map(|e| Arc::clone(&e.handler))
            .collect();

        for handler in &handlers {
            handler(rel_path);
        }
        handlers.len()
    }

    fn shared(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock(inner: &Mutex<RegistryInner>) -> std::sync::MutexGuard<'_, RegistryInner> {
    // Handlers never run under the lock.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Token returned by `subscribe`; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<RegistryInner>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            lock(&inner).entries.remove(&self.id);
            debug!(id = self.id, "watch subscription removed");
        }
    }
}

/// Recursive watcher over the project root.
///
/// Changes are forwarded from notify's callback thread into an async loop
/// that dispatches them to the matching subscriptions. Dropping the watcher
/// stops watching.
pub struct FileWatcher {
    root: PathBuf,
    registry: SubscriptionRegistry,
    _inner: RecommendedWatcher,
}

impl fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Start watching `root`. Must be called from within a tokio runtime.
    pub fn start(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        // Canonicalize once so we have a stable base path.
        let root = root.canonicalize().unwrap_or(root);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        eprintln!("sitepipe: failed to forward notify event: {err}");
                    }
                }
                Err(err) => eprintln!("sitepipe: file watch error: {err}"),
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!(root = %root.display(), "file watcher started");

        let registry = SubscriptionRegistry::new();
        let loop_registry = registry.shared();
        let loop_root = root.clone();

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if matches!(event.kind, EventKind::Access(_)) {
                    continue;
                }
                trace!(?event, "received notify event");

                for path in &event.paths {
                    match relative_str(&loop_root, path) {
                        Some(rel) => {
                            let fired = loop_registry.dispatch(&rel);
                            if fired > 0 {
                                debug!(path = %rel, subscriptions = fired, "change dispatched");
                            }
                        }
                        None => warn!(path = %path.display(), "change outside watch root ignored"),
                    }
                }
            }
            debug!("watcher event loop finished");
        });

        Ok(Self {
            root,
            registry,
            _inner: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe<F>(&self, matcher: PathMatcher, handler: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.registry.subscribe(matcher, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn matcher(pat: &str) -> PathMatcher {
        PathMatcher::new(&[pat.to_string()], &[]).unwrap()
    }

    #[test]
    fn dispatch_reaches_only_matching_subscriptions() {
        let registry = SubscriptionRegistry::new();
        let scss = Arc::new(AtomicUsize::new(0));
        let html = Arc::new(AtomicUsize::new(0));

        let s1 = {
            let scss = Arc::clone(&scss);
            registry.subscribe(matcher("app/scss/**/*.scss"), move |_| {
                scss.fetch_add(1, Ordering::SeqCst);
            })
        };
        let s2 = {
            let html = Arc::clone(&html);
            registry.subscribe(matcher("app/**/*.html"), move |_| {
                html.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert_eq!(registry.dispatch("app/scss/_vars.scss"), 1);
        assert_eq!(registry.dispatch("app/index.html"), 1);
        assert_eq!(registry.dispatch("README.md"), 0);
        assert_eq!(scss.load(Ordering::SeqCst), 1);
        assert_eq!(html.load(Ordering::SeqCst), 1);

        drop((s1, s2));
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let registry = SubscriptionRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let sub = {
            let hits = Arc::clone(&hits);
            registry.subscribe(matcher("**/*.js"), move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        assert_eq!(registry.len(), 1);

        drop(sub);
        assert!(registry.is_empty());
        assert_eq!(registry.dispatch("app/js/main.js"), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscription_outliving_registry_drops_cleanly() {
        let registry = SubscriptionRegistry::new();
        let sub = registry.subscribe(matcher("**"), |_| {});
        drop(registry);
        drop(sub);
    }
}
