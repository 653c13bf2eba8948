// src/pipeline/mod.rs

//! File pipelines.
//!
//! A [`Pipeline`] resolves its sources with a [`FileMatcher`], runs the
//! files through an ordered list of [`TransformStep`]s and writes the result
//! under its destination directory. Nothing is written unless every step
//! succeeded.

pub mod builtin;
pub mod clean;
pub mod deploy;
pub mod fileset;
pub mod matcher;
pub mod write;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use crate::errors::Result;
use crate::server::reload::ReloadHandle;
use crate::steps::TransformStep;
use crate::types::PipelineKind;

pub use builtin::build_pipeline;
pub use fileset::{FileSet, SourceFile};
pub use matcher::FileMatcher;

/// What to tell connected browsers after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    None,
    /// Send the written file names for in-place injection.
    Inject,
    Full,
}

/// Outcome of a single pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub kind: PipelineKind,
    /// Number of source files matched.
    pub matched: usize,
    /// Absolute paths of the files written.
    pub written: Vec<PathBuf>,
}

pub struct Pipeline {
    kind: PipelineKind,
    source: FileMatcher,
    steps: Vec<Box<dyn TransformStep>>,
    dest: PathBuf,
    reload: ReloadMode,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("steps", &steps)
            .field("dest", &self.dest)
            .field("reload", &self.reload)
            .finish()
    }
}

impl Pipeline {
    pub fn new(kind: PipelineKind, source: FileMatcher, dest: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            source,
            steps: Vec::new(),
            dest: dest.into(),
            reload: ReloadMode::None,
        }
    }

    /// Append a step; steps run in the order they are added.
    pub fn step(mut self, step: impl TransformStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_reload(mut self, mode: ReloadMode) -> Self {
        self.reload = mode;
        self
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline once.
    pub fn run(&self, reload: &ReloadHandle) -> Result<PipelineReport> {
        let span = info_span!("pipeline", pipeline = %self.kind);
        let _guard = span.enter();

        let mut files = self.source.resolve()?;
        let matched = files.len();
        debug!(files = matched, "sources resolved");

        if files.is_empty() {
            info!("no source files matched; nothing written");
            return Ok(PipelineReport {
                kind: self.kind,
                matched,
                written: Vec::new(),
            });
        }

        for step in &self.steps {
            files = step.transform(files)?;
            debug!(step = step.name(), files = files.len(), "step finished");
        }

        let written = write::write_all(&self.dest, &files)?;
        info!(files = written.len(), dest = %self.dest.display(), "pipeline finished");

        if !written.is_empty() {
            match self.reload {
                ReloadMode::None => {}
                ReloadMode::Full => {
                    reload.reload();
                }
                ReloadMode::Inject => {
                    reload.inject(files.iter().filter_map(|f| f.file_name().map(str::to_string)));
                }
            }
        }

        Ok(PipelineReport {
            kind: self.kind,
            matched,
            written,
        })
    }
}
