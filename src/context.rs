// src/context.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::pipeline::{Pipeline, build_pipeline};
use crate::server::reload::ReloadHandle;
use crate::types::PipelineKind;

/// Everything a unit needs to run: the project root, the validated config
/// and the reload channel shared with the dev server.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root: PathBuf,
    config: Arc<ConfigFile>,
    reload: ReloadHandle,
}

impl BuildContext {
    pub fn new(root: impl Into<PathBuf>, config: ConfigFile) -> Self {
        Self {
            root: root.into(),
            config: Arc::new(config),
            reload: ReloadHandle::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn reload(&self) -> &ReloadHandle {
        &self.reload
    }

    pub fn pipeline(&self, kind: PipelineKind) -> Result<Pipeline> {
        build_pipeline(kind, &self.config, &self.root)
    }
}
