// src/steps/scss.rs

use grass::{Options, OutputStyle};
use tracing::debug;

use crate::errors::ProcessingError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::steps::{TransformStep, utf8_contents};

/// Compile SCSS to CSS with `grass`.
///
/// Partials (`_name.scss`) are only reachable through `@use`/`@import` and
/// produce no output of their own. Imports resolve relative to the
/// directory of the file being compiled.
#[derive(Debug, Clone)]
pub struct ScssCompile {
    style: OutputStyle,
}

impl ScssCompile {
    pub fn new(compressed: bool) -> Self {
        let style = if compressed {
            OutputStyle::Compressed
        } else {
            OutputStyle::Expanded
        };
        Self { style }
    }
}

impl Default for ScssCompile {
    fn default() -> Self {
        Self::new(false)
    }
}

fn is_partial(file: &SourceFile) -> bool {
    file.file_name().is_some_and(|n| n.starts_with('_'))
}

impl TransformStep for ScssCompile {
    fn name(&self) -> &'static str {
        "scss"
    }

    fn transform(&self, files: FileSet) -> Result<FileSet, ProcessingError> {
        let mut out = FileSet::new();

        for file in files {
            if is_partial(&file) {
                debug!(file = %file.relative.display(), "skipping partial");
                continue;
            }

            let source = utf8_contents(self.name(), &file)?;
            let mut options = Options::default().style(self.style);
            if let Some(dir) = file.origin().parent() {
                options = options.load_path(dir);
            }

            let css = grass::from_string(source, &options)
                .map_err(|e| ProcessingError::new(self.name(), file.origin(), e))?;

            out.push(SourceFile::new(
                file.relative.with_extension("css"),
                file.origin.clone(),
                css.into_bytes(),
            ));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scss(name: &str, src: &str) -> SourceFile {
        SourceFile::generated(name, src.as_bytes().to_vec())
    }

    #[test]
    fn compiles_nested_rules() {
        let files = FileSet::from(vec![scss(
            "style.scss",
            "$c: #333;\n.nav { a { color: $c; } }\n",
        )]);
        let out = ScssCompile::default().transform(files).unwrap();
        let css = String::from_utf8(out.files()[0].contents.clone()).unwrap();
        assert!(css.contains(".nav a"));
        assert!(css.contains("color: #333"));
        assert_eq!(out.files()[0].file_name(), Some("style.css"));
    }

    #[test]
    fn partials_are_not_emitted() {
        let files = FileSet::from(vec![scss("_vars.scss", "$x: 1px;")]);
        assert!(ScssCompile::default().transform(files).unwrap().is_empty());
    }

    #[test]
    fn syntax_error_names_the_file() {
        let files = FileSet::from(vec![scss("broken.scss", ".a { color: red;")]);
        let err = ScssCompile::default().transform(files).unwrap_err();
        assert_eq!(err.step, "scss");
        assert!(err.file.ends_with("broken.scss"));
    }
}
