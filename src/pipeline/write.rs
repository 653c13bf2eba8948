// src/pipeline/write.rs

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;
use tracing::trace;

use crate::errors::Result;
use crate::pipeline::fileset::FileSet;

/// Write every file under `dest`, keeping its relative path.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// reader never sees a half-written output. Returns the written paths in
/// set order.
pub fn write_all(dest: &Path, files: &FileSet) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());

    for file in files.iter() {
        let target = dest.join(&file.relative);
        write_atomic(&target, &file.contents)?;
        trace!(path = %target.display(), bytes = file.contents.len(), "wrote file");
        written.push(target);
    }

    Ok(written)
}

/// Replace `target` with `contents` via a temporary file in the same
/// directory.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target)
        .map_err(|e| e.error)
        .with_context(|| format!("moving output into place at {}", target.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fileset::SourceFile;
    use tempfile::tempdir;

    #[test]
    fn writes_nested_relative_paths() {
        let dir = tempdir().unwrap();
        let files = FileSet::from(vec![
            SourceFile::generated("index.html", b"<html></html>".to_vec()),
            SourceFile::generated("css/style.min.css", b"a{}".to_vec()),
        ]);

        let written = write_all(dir.path(), &files).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(dir.path().join("css/style.min.css")).unwrap(), b"a{}");
    }

    #[test]
    fn overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.txt");
        write_atomic(&target, b"one").unwrap();
        write_atomic(&target, b"two").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"two");
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
