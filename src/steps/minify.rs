// src/steps/minify.rs

use crate::errors::ProcessingError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::steps::{TransformStep, utf8_contents};

/// Minify JavaScript with `minifier`.
#[derive(Debug, Clone, Default)]
pub struct MinifyJs;

impl TransformStep for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn transform(&self, files: FileSet) -> Result<FileSet, ProcessingError> {
        files
            .into_iter()
            .map(|file| {
                let source = utf8_contents(self.name(), &file)?;
                let minified = minifier::js::minify(&source).to_string();
                Ok(SourceFile::new(file.relative, file.origin, minified.into_bytes()))
            })
            .collect::<Result<Vec<_>, ProcessingError>>()
            .map(FileSet::from)
    }
}
