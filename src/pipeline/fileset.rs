// src/pipeline/fileset.rs

use std::path::{Path, PathBuf};

/// One file flowing through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the glob base; this is where the file lands under
    /// the destination directory.
    pub relative: PathBuf,
    /// Where the contents came from. Used for error messages and for
    /// resolving imports next to the original file.
    pub origin: PathBuf,
    pub contents: Vec<u8>,
}

impl SourceFile {
    pub fn new(relative: impl Into<PathBuf>, origin: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            relative: relative.into(),
            origin: origin.into(),
            contents,
        }
    }

    /// A file produced by a step rather than read from disk.
    pub fn generated(relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        let relative = relative.into();
        Self {
            origin: relative.clone(),
            relative,
            contents,
        }
    }

    /// Lower-cased extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.relative.file_name().and_then(|n| n.to_str())
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }
}

/// Ordered, ephemeral set of files produced by a matcher and rewritten by
/// each transform step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn into_vec(self) -> Vec<SourceFile> {
        self.files
    }

    /// Relative paths in order, mostly for logging and tests.
    pub fn relative_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.relative.clone()).collect()
    }
}

impl From<Vec<SourceFile>> for FileSet {
    fn from(files: Vec<SourceFile>) -> Self {
        Self { files }
    }
}

impl FromIterator<SourceFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = SourceFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FileSet {
    type Item = SourceFile;
    type IntoIter = std::vec::IntoIter<SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}
