// src/pipeline/builtin.rs

use std::path::Path;

use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::pipeline::matcher::FileMatcher;
use crate::pipeline::{Pipeline, ReloadMode};
use crate::steps::{Autoprefix, Concat, MinifyJs, OptimizeImages, ScssCompile};
use crate::types::PipelineKind;

/// Build one of the stock pipelines from config, rooted at `root`.
///
/// | kind | steps | reload |
/// |---|---|---|
/// | styles | scss, concat, autoprefix | inject |
/// | scripts | concat, minify | inject |
/// | images | optimise | - |
/// | assemble | copy, paths kept relative to `base` | - |
pub fn build_pipeline(kind: PipelineKind, cfg: &ConfigFile, root: &Path) -> Result<Pipeline> {
    let pipeline = match kind {
        PipelineKind::Styles => {
            let s = &cfg.styles;
            let source = FileMatcher::new(root, s.source.iter().cloned())?;
            Pipeline::new(kind, source, root.join(&s.dest))
                .step(ScssCompile::new(false))
                .step(Concat::new(&s.output))
                .step(Autoprefix::new(&s.browsers, s.minify)?)
                .with_reload(ReloadMode::Inject)
        }
        PipelineKind::Scripts => {
            let s = &cfg.scripts;
            let source = FileMatcher::new(root, s.source.iter().cloned())?;
            Pipeline::new(kind, source, root.join(&s.dest))
                .step(Concat::new(&s.output))
                .step(MinifyJs)
                .with_reload(ReloadMode::Inject)
        }
        PipelineKind::Images => {
            let s = &cfg.images;
            let source = FileMatcher::new(root, s.source.iter().cloned())?;
            Pipeline::new(kind, source, root.join(&s.dest))
                .step(OptimizeImages::new(s.jpeg_quality, s.png_level))
        }
        PipelineKind::Assemble => {
            let s = &cfg.assemble;
            let source = FileMatcher::new(root, s.source.iter().cloned())?.with_base(&s.base);
            Pipeline::new(kind, source, root.join(&s.dest))
        }
    };

    Ok(pipeline)
}
