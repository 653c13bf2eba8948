// src/pipeline/deploy.rs

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::model::DeploySection;
use crate::errors::Result;
use crate::pipeline::matcher::FileMatcher;

/// What `deploy` gathered, and whether anything left the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub staged: Vec<PathBuf>,
    pub remote_url: Option<String>,
    pub branch: String,
    /// Always false: the publish step is never reached.
    pub published: bool,
}

/// Stage the distribution files for publishing.
///
/// The task stops after staging; no git or network operation is performed.
pub fn deploy(root: &Path, cfg: &DeploySection) -> Result<DeployReport> {
    let matcher = FileMatcher::new(root, cfg.source.iter().cloned())?;
    let staged = matcher.matching_paths()?;

    info!(files = staged.len(), branch = %cfg.branch, "deploy: staged distribution files");
    warn!(
        remote = cfg.remote_url.as_deref().unwrap_or("<unset>"),
        "deploy: publishing is not wired up; nothing was pushed"
    );

    Ok(DeployReport {
        staged,
        remote_url: cfg.remote_url.clone(),
        branch: cfg.branch.clone(),
        published: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ConfigFile;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn stages_dist_and_never_publishes() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist/css")).unwrap();
        fs::write(dir.path().join("dist/index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("dist/css/style.min.css"), "a{}").unwrap();

        let cfg = DeploySection {
            remote_url: Some("https://example.invalid/site/".to_string()),
            ..ConfigFile::default().deploy
        };
        let report = deploy(dir.path(), &cfg).unwrap();

        assert_eq!(report.staged.len(), 2);
        assert!(!report.published);
        assert!(!dir.path().join(".git").exists());
    }
}
