// src/pipeline/clean.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};

use tracing::info;

use crate::errors::{Result, SitepipeError};

/// Remove `root/dist` recursively. A missing directory is not an error.
///
/// Refuses paths that would resolve to the project root or outside it.
pub fn clean_dir(root: &Path, dist: &str) -> Result<()> {
    let rel = Path::new(dist);
    let escapes = rel.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    let empty = !rel.components().any(|c| matches!(c, Component::Normal(_)));
    if escapes || empty {
        return Err(SitepipeError::ConfigError(format!(
            "refusing to clean {dist:?}: must be a directory inside the project"
        )));
    }

    let target = root.join(rel);
    match fs::remove_dir_all(&target) {
        Ok(()) => {
            info!(path = %target.display(), "removed distribution directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %target.display(), "distribution directory absent; nothing to clean");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
