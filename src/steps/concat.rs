// src/steps/concat.rs

use crate::errors::ProcessingError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::steps::TransformStep;

/// Join every input, in order, into a single output file.
///
/// An empty input produces no output file at all.
#[derive(Debug, Clone)]
pub struct Concat {
    file_name: String,
}

impl Concat {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl TransformStep for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn transform(&self, files: FileSet) -> Result<FileSet, ProcessingError> {
        if files.is_empty() {
            return Ok(FileSet::new());
        }

        let mut joined: Vec<u8> = Vec::new();
        for (idx, file) in files.into_iter().enumerate() {
            if idx > 0 {
                joined.push(b'\n');
            }
            joined.extend_from_slice(&file.contents);
        }

        Ok(FileSet::from(vec![SourceFile::generated(
            self.file_name.as_str(),
            joined,
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_in_input_order() {
        let files = FileSet::from(vec![
            SourceFile::generated("lib.js", b"var lib = 1;".to_vec()),
            SourceFile::generated("main.js", b"lib();".to_vec()),
        ]);
        let out = Concat::new("main.min.js").transform(files).unwrap();
        assert_eq!(out.len(), 1);
        let file = &out.files()[0];
        assert_eq!(file.file_name(), Some("main.min.js"));
        assert_eq!(file.contents, b"var lib = 1;\nlib();".to_vec());
    }

    #[test]
    fn empty_input_has_no_output() {
        let out = Concat::new("style.min.css").transform(FileSet::new()).unwrap();
        assert!(out.is_empty());
    }
}
