// src/steps/prefix.rs

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::errors::{ProcessingError, Result, SitepipeError};
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::steps::{TransformStep, utf8_contents};

/// Add vendor prefixes for a browserslist target with `lightningcss`.
///
/// The stylesheet is re-printed, optionally minified. Prefixes that the
/// targets no longer need are removed.
#[derive(Debug, Clone)]
pub struct Autoprefix {
    targets: Targets,
    minify: bool,
}

impl Autoprefix {
    /// Resolve the browserslist queries once, up front.
    pub fn new(browsers: &[String], minify: bool) -> Result<Self> {
        let resolved = Browsers::from_browserslist(browsers.iter().map(String::as_str))
            .map_err(|e| {
                SitepipeError::ConfigError(format!("invalid browserslist query {browsers:?}: {e}"))
            })?;
        let targets = resolved.map(Targets::from).unwrap_or_default();
        Ok(Self { targets, minify })
    }

    fn process(&self, file: &SourceFile) -> std::result::Result<String, ProcessingError> {
        let code = utf8_contents(self.name(), file)?;
        let fail = |msg: String| ProcessingError::new("autoprefix", file.origin(), msg);

        let parser_options = ParserOptions {
            filename: file.origin().display().to_string(),
            ..ParserOptions::default()
        };
        let mut sheet =
            StyleSheet::parse(&code, parser_options).map_err(|e| fail(e.to_string()))?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| fail(e.to_string()))?;

        let printed = sheet
            .to_css(PrinterOptions {
                minify: self.minify,
                targets: self.targets.clone(),
                ..PrinterOptions::default()
            })
            .map_err(|e| fail(e.to_string()))?;

        Ok(printed.code)
    }
}

impl TransformStep for Autoprefix {
    fn name(&self) -> &'static str {
        "autoprefix"
    }

    fn transform(&self, files: FileSet) -> std::result::Result<FileSet, ProcessingError> {
        files
            .into_iter()
            .map(|file| {
                let css = self.process(&file)?;
                Ok(SourceFile::new(file.relative, file.origin, css.into_bytes()))
            })
            .collect::<std::result::Result<Vec<_>, ProcessingError>>()
            .map(FileSet::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(browsers: &[&str], css: &str) -> String {
        let browsers: Vec<String> = browsers.iter().map(|s| s.to_string()).collect();
        let step = Autoprefix::new(&browsers, false).unwrap();
        let files = FileSet::from(vec![SourceFile::generated(
            "style.min.css",
            css.as_bytes().to_vec(),
        )]);
        let out = step.transform(files).unwrap();
        String::from_utf8(out.files()[0].contents.clone()).unwrap()
    }

    #[test]
    fn old_targets_get_prefixes() {
        let css = prefix(&["safari 8"], ".a { user-select: none; }");
        assert!(css.contains("-webkit-user-select"));
    }

    #[test]
    fn same_input_same_output() {
        let src = ".grid { display: flex; transition: all 1s; }";
        assert_eq!(
            prefix(&["last 10 versions"], src),
            prefix(&["last 10 versions"], src)
        );
    }

    #[test]
    fn unknown_query_is_a_config_error() {
        let err = Autoprefix::new(&["not a real query ???".to_string()], false).unwrap_err();
        assert!(matches!(err, SitepipeError::ConfigError(_)));
    }
}
