// src/pipeline/matcher.rs

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::Result;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::watch::patterns::{build_globset, compile_glob, relative_str};

/// Resolves source patterns into an ordered [`FileSet`].
///
/// Patterns are relative to the project root and evaluated in the order
/// given; a file matched by several patterns appears once, at its first
/// position. Patterns starting with `!` exclude files from every positive
/// pattern. Within one glob, files are ordered by path.
///
/// Each file's `relative` path is taken against the glob base: the leading
/// directories of the pattern before any wildcard (`app/images/**/*.*` has
/// base `app/images`), or the explicit base when one is set.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    root: PathBuf,
    patterns: Vec<String>,
    negations: Option<GlobSet>,
    base: Option<PathBuf>,
}

impl FileMatcher {
    pub fn new<I, S>(root: impl Into<PathBuf>, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for pat in patterns {
            let pat: String = pat.into();
            match pat.strip_prefix('!') {
                Some(neg) => negative.push(neg.to_string()),
                None => positive.push(pat),
            }
        }

        let negations = if negative.is_empty() {
            None
        } else {
            Some(build_globset(&negative)?)
        };

        Ok(Self {
            root: root.into(),
            patterns: positive,
            negations,
            base: None,
        })
    }

    /// Keep paths relative to `base` (itself relative to the root) instead of
    /// each pattern's own glob base.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve and read every matching file.
    pub fn resolve(&self) -> Result<FileSet> {
        let mut set = FileSet::new();
        for path in self.matching_paths()? {
            let contents = fs::read(&path)?;
            let relative = self.relative_to_base(&path);
            set.push(SourceFile::new(relative, path, contents));
        }
        Ok(set)
    }

    /// Resolve matching paths without reading them.
    pub fn matching_paths(&self) -> Result<Vec<PathBuf>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut out = Vec::new();

        for pattern in &self.patterns {
            for path in self.expand(pattern)? {
                if self.is_negated(&path) {
                    debug!(path = %path.display(), "excluded by negated pattern");
                    continue;
                }
                if seen.insert(path.clone()) {
                    out.push(path);
                }
            }
        }

        Ok(out)
    }

    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        if !is_glob(pattern) {
            let path = self.root.join(pattern);
            if path.is_file() {
                return Ok(vec![path]);
            }
            warn!(pattern = %pattern, "source file not found; skipping");
            return Ok(Vec::new());
        }

        let matcher = compile_glob(pattern)?;
        let walk_root = self.root.join(glob_base(pattern));
        if !walk_root.is_dir() {
            debug!(pattern = %pattern, "glob base does not exist; nothing matched");
            return Ok(Vec::new());
        }

        let mut matched = Vec::new();
        for entry in WalkDir::new(&walk_root).sort_by_file_name() {
            let entry = entry.map_err(|e| anyhow::anyhow!("walking {}: {e}", walk_root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_str(&self.root, entry.path()) {
                if matcher.is_match(&rel) {
                    matched.push(entry.into_path());
                }
            }
        }
        Ok(matched)
    }

    fn is_negated(&self, path: &Path) -> bool {
        match (&self.negations, relative_str(&self.root, path)) {
            (Some(set), Some(rel)) => set.is_match(rel),
            _ => false,
        }
    }

    fn relative_to_base(&self, path: &Path) -> PathBuf {
        let base = match &self.base {
            Some(base) => self.root.join(base),
            None => self
                .patterns
                .iter()
                .map(|p| self.root.join(glob_base(p)))
                .filter(|b| path.starts_with(b) && b.as_path() != path)
                .max_by_key(|b| b.components().count())
                .unwrap_or_else(|| self.root.clone()),
        };
        path.strip_prefix(&base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default())
    }
}

/// Whether a pattern contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Leading directories of a pattern up to the first component with a
/// wildcard. For a literal path this is its parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let stop = if is_glob(pattern) {
        components.iter().position(|c| is_glob(c)).unwrap_or(components.len())
    } else {
        components.len().saturating_sub(1)
    };
    components[..stop]
        .iter()
        .filter(|c| !c.is_empty() && **c != ".")
        .collect()
}
