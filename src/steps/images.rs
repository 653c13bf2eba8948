// src/steps/images.rs

use std::io::Cursor;
use std::sync::LazyLock;

use image::codecs::gif::{GifDecoder, GifEncoder};
use image::codecs::jpeg::JpegEncoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::errors::ProcessingError;
use crate::pipeline::fileset::{FileSet, SourceFile};
use crate::steps::TransformStep;

static SVG_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static SVG_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata\b.*?</metadata>").expect("valid regex"));
static SVG_LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">[ \t\r]*\n\s*<").expect("valid regex"));

/// Per-format image optimisation.
///
/// | Format | Treatment |
/// |---|---|
/// | JPEG | re-encoded at `jpeg_quality` |
/// | PNG | oxipng at `png_level` |
/// | GIF | single-frame images re-encoded; animations pass through |
/// | SVG | comments, `<metadata>` and line breaks between tags removed |
///
/// Files are processed in parallel on the rayon pool. Other formats pass
/// through untouched, and an optimised result that is not smaller than its
/// input is discarded in favour of the original bytes.
#[derive(Debug, Clone)]
pub struct OptimizeImages {
    jpeg_quality: u8,
    png: oxipng::Options,
}

impl OptimizeImages {
    pub fn new(jpeg_quality: u8, png_level: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            png: oxipng::Options::from_preset(png_level.min(6)),
        }
    }

    fn optimize(&self, file: &SourceFile) -> Result<Option<Vec<u8>>, ProcessingError> {
        let fail = |msg: String| ProcessingError::new("optimize-images", file.origin(), msg);

        match file.extension().as_deref() {
            Some("jpg" | "jpeg") => {
                let img = image::load_from_memory_with_format(&file.contents, ImageFormat::Jpeg)
                    .map_err(|e| fail(format!("decoding JPEG: {e}")))?;
                let img = match img {
                    DynamicImage::ImageLuma8(_) => img,
                    other => DynamicImage::ImageRgb8(other.to_rgb8()),
                };
                let mut out = Cursor::new(Vec::new());
                let encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality);
                img.write_with_encoder(encoder)
                    .map_err(|e| fail(format!("encoding JPEG: {e}")))?;
                Ok(Some(out.into_inner()))
            }
            Some("png") => oxipng::optimize_from_memory(&file.contents, &self.png)
                .map(Some)
                .map_err(|e| fail(format!("optimising PNG: {e}"))),
            Some("gif") => {
                let decoder = GifDecoder::new(Cursor::new(file.contents.as_slice()))
                    .map_err(|e| fail(format!("decoding GIF: {e}")))?;
                let frames = decoder
                    .into_frames()
                    .collect_frames()
                    .map_err(|e| fail(format!("decoding GIF: {e}")))?;
                if frames.len() != 1 {
                    return Ok(None);
                }

                let mut out = Vec::new();
                {
                    let mut encoder = GifEncoder::new_with_speed(&mut out, 10);
                    encoder
                        .encode_frames(frames)
                        .map_err(|e| fail(format!("encoding GIF: {e}")))?;
                }
                Ok(Some(out))
            }
            Some("svg") => {
                let text = String::from_utf8(file.contents.clone())
                    .map_err(|e| fail(format!("SVG is not valid UTF-8: {e}")))?;
                Ok(Some(minify_svg(&text).into_bytes()))
            }
            _ => Ok(None),
        }
    }
}

/// Text-level SVG cleanup. Whitespace is only removed where it contains a
/// line break, so spacing between inline `<tspan>`s on one line survives.
fn minify_svg(svg: &str) -> String {
    let svg = SVG_COMMENT.replace_all(svg, "");
    let svg = SVG_METADATA.replace_all(&svg, "");
    SVG_LINE_BREAK.replace_all(&svg, "><").trim().to_string()
}

impl TransformStep for OptimizeImages {
    fn name(&self) -> &'static str {
        "optimize-images"
    }

    fn transform(&self, files: FileSet) -> Result<FileSet, ProcessingError> {
        let optimized: Vec<SourceFile> = files
            .into_vec()
            .into_par_iter()
            .map(|file| {
                let before = file.contents.len();
                match self.optimize(&file)? {
                    Some(bytes) if bytes.len() < before => {
                        debug!(
                            path = %file.relative.display(),
                            before,
                            after = bytes.len(),
                            "image optimised"
                        );
                        Ok(SourceFile::new(file.relative, file.origin, bytes))
                    }
                    _ => Ok(file),
                }
            })
            .collect::<Result<_, ProcessingError>>()?;

        Ok(FileSet::from(optimized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, Frame, ImageEncoder, RgbImage, RgbaImage};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    fn encode_jpeg(quality: u8) -> Vec<u8> {
        let img = gradient(64, 48);
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality)
            .write_image(img.as_raw(), 64, 48, ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    fn encode_png() -> Vec<u8> {
        let img = gradient(32, 32);
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(img.as_raw(), 32, 32, ExtendedColorType::Rgb8)
            .unwrap();
        buf
    }

    #[test]
    fn jpeg_is_reencoded_and_never_grows() {
        let original = encode_jpeg(100);
        let files = FileSet::from(vec![SourceFile::generated("photo.jpg", original.clone())]);
        let out = OptimizeImages::new(40, 2).transform(files).unwrap();

        let bytes = &out.files()[0].contents;
        assert!(bytes.len() <= original.len());
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn png_stays_decodable() {
        let original = encode_png();
        let files = FileSet::from(vec![SourceFile::generated("icons/dot.png", original.clone())]);
        let out = OptimizeImages::new(75, 2).transform(files).unwrap();

        let file = &out.files()[0];
        assert_eq!(file.relative, std::path::PathBuf::from("icons/dot.png"));
        assert!(file.contents.len() <= original.len());
        let decoded = image::load_from_memory(&file.contents).unwrap();
        assert_eq!(decoded.width(), 32);
    }

    fn encode_gif(frames: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut buf, 30);
            for i in 0..frames {
                let img = RgbaImage::from_fn(24, 24, |x, _| {
                    image::Rgba([if x < 12 { 255 } else { 0 }, (i * 60) as u8, 0, 255])
                });
                encoder.encode_frame(Frame::new(img)).unwrap();
            }
        }
        buf
    }

    #[test]
    fn static_gif_stays_decodable() {
        let original = encode_gif(1);
        let files = FileSet::from(vec![SourceFile::generated("spinner.gif", original.clone())]);
        let out = OptimizeImages::new(75, 5).transform(files).unwrap();

        let bytes = &out.files()[0].contents;
        assert!(bytes.len() <= original.len());
        let decoded = image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 24));
    }

    #[test]
    fn animated_gif_passes_through() {
        let original = encode_gif(3);
        let files = FileSet::from(vec![SourceFile::generated("anim.gif", original.clone())]);
        let out = OptimizeImages::new(75, 5).transform(files).unwrap();
        assert_eq!(out.files()[0].contents, original);
    }

    #[test]
    fn svg_loses_comments_and_metadata() {
        let svg = concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\">\n",
            "  <!-- exported by an editor -->\n",
            "  <metadata><rdf:RDF/></metadata>\n",
            "  <text><tspan>a</tspan> <tspan>b</tspan></text>\n",
            "</svg>\n",
        );
        let files = FileSet::from(vec![SourceFile::generated("logo.svg", svg.as_bytes().to_vec())]);
        let out = OptimizeImages::new(75, 5).transform(files).unwrap();

        let text = String::from_utf8(out.files()[0].contents.clone()).unwrap();
        assert_eq!(
            text,
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><text><tspan>a</tspan> <tspan>b</tspan></text></svg>"
        );
    }

    #[test]
    fn other_formats_pass_through() {
        let webp = b"RIFF\x00\x00\x00\x00WEBP".to_vec();
        let files = FileSet::from(vec![SourceFile::generated("photo.webp", webp.clone())]);
        let out = OptimizeImages::new(75, 5).transform(files).unwrap();
        assert_eq!(out.files()[0].contents, webp);
    }

    #[test]
    fn corrupt_jpeg_is_a_processing_error() {
        let files = FileSet::from(vec![SourceFile::generated("broken.jpg", b"not a jpeg".to_vec())]);
        let err = OptimizeImages::new(75, 5).transform(files).unwrap_err();
        assert_eq!(err.step, "optimize-images");
        assert!(err.message.contains("JPEG"));
    }
}
