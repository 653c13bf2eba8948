// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::config::model::WatchSection;
use crate::errors::{Result, SitepipeError};
use crate::types::PipelineKind;

/// Compiled watch/exclude glob patterns.
///
/// The patterns are relative to the project root. The watcher passes
/// relative paths (e.g. `"app/scss/_vars.scss"`) into `matches`.
#[derive(Clone)]
pub struct PathMatcher {
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMatcher").finish_non_exhaustive()
    }
}

impl PathMatcher {
    pub fn new(watch: &[String], exclude: &[String]) -> Result<Self> {
        let watch_set = build_globset(watch)?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };
        Ok(Self {
            watch_set,
            exclude_set,
        })
    }

    /// Returns true if the given root-relative path is watched and not
    /// excluded.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// What a watch rule does when one of its files changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// Re-run a pipeline; the pipeline itself notifies the dev server.
    RunPipeline(PipelineKind),
    /// Only ask connected browsers for a full reload.
    Reload,
}

/// A compiled `[[watch.rule]]`.
#[derive(Debug, Clone)]
pub struct WatchRule {
    label: String,
    matcher: PathMatcher,
    watch: Vec<String>,
    exclude: Vec<String>,
    action: WatchAction,
    use_hash: bool,
}

impl WatchRule {
    /// Unique label: the pipeline name, or `reload#<index>`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    pub fn action(&self) -> WatchAction {
        self.action
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    /// Source patterns in `FileMatcher` syntax (excludes as `!pattern`),
    /// used to gather the files a content hash covers.
    pub fn source_patterns(&self) -> Vec<String> {
        self.watch
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|e| format!("!{e}")))
            .collect()
    }
}

/// Compile every configured rule.
///
/// Two rules running the same pipeline share a label, so a change seen by
/// both runs that pipeline once.
pub fn build_watch_rules(cfg: &WatchSection) -> Result<Vec<WatchRule>> {
    let mut rules = Vec::with_capacity(cfg.rules.len());

    for (idx, rule) in cfg.rules.iter().enumerate() {
        let matcher = PathMatcher::new(&rule.watch, &rule.exclude).map_err(|e| {
            SitepipeError::Pattern(format!("watch rule #{idx}: {e}"))
        })?;

        let (label, action) = match rule.run {
            Some(kind) => (kind.as_str().to_string(), WatchAction::RunPipeline(kind)),
            None => (format!("reload#{idx}"), WatchAction::Reload),
        };

        rules.push(WatchRule {
            label,
            matcher,
            watch: rule.watch.clone(),
            exclude: rule.exclude.clone(),
            action,
            use_hash: rule.effective_use_hash(cfg.use_hash),
        });
    }

    Ok(rules)
}

/// Compile a single glob where `*` stays within one path component and
/// `**` crosses directories.
pub(crate) fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| SitepipeError::Pattern(format!("invalid glob pattern {pattern}: {e}")))?;
    Ok(glob.compile_matcher())
}

/// Build a GlobSet from simple string patterns.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| SitepipeError::Pattern(format!("invalid glob pattern {pat}: {e}")))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root`.
pub(crate) fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s)
}
