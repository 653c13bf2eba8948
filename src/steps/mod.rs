// src/steps/mod.rs

//! Transform steps.
//!
//! Each step wraps one external library behind the same contract: take a
//! [`FileSet`], return a transformed one or a [`ProcessingError`]. Steps do
//! no IO; writing is the pipeline's terminal step.
//!
//! | Step | Library |
//! |---|---|
//! | [`ScssCompile`] | `grass` |
//! | [`Concat`] | - |
//! | [`Autoprefix`] | `lightningcss` |
//! | [`MinifyJs`] | `minifier` |
//! | [`OptimizeImages`] | `image`, `oxipng`, `rayon` |

pub mod concat;
pub mod images;
pub mod minify;
pub mod prefix;
pub mod scss;

pub use concat::Concat;
pub use images::OptimizeImages;
pub use minify::MinifyJs;
pub use prefix::Autoprefix;
pub use scss::ScssCompile;

use crate::errors::ProcessingError;
use crate::pipeline::fileset::{FileSet, SourceFile};

pub trait TransformStep: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    fn transform(&self, files: FileSet) -> Result<FileSet, ProcessingError>;
}

/// Decode a file as UTF-8 text or fail the step.
pub(crate) fn utf8_contents(step: &str, file: &SourceFile) -> Result<String, ProcessingError> {
    String::from_utf8(file.contents.clone())
        .map_err(|e| ProcessingError::new(step, file.origin(), format!("not valid UTF-8: {e}")))
}
