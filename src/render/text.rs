use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

use crate::error::{FaceReportError, Result};

const BUNDLED_NAME: &str = "DejaVuSans.ttf";
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/font/DejaVuSans.ttf");

static BUNDLED: LazyLock<std::result::Result<Typeface, String>> = LazyLock::new(|| {
    FontArc::try_from_slice(BUNDLED_FONT)
        .map(|font| Typeface { font, source: None })
        .map_err(|e| e.to_string())
});

/// A loaded font used for every label the renderers draw.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface")
            .field("source", &self.source)
            .finish()
    }
}

impl Typeface {
    /// DejaVu Sans, compiled into the binary. Parsed on first use.
    pub fn bundled() -> Result<&'static Typeface> {
        BUNDLED.as_ref().map_err(|reason| FaceReportError::Font {
            path: PathBuf::from(BUNDLED_NAME),
            reason: reason.clone(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let font_error = |reason: String| FaceReportError::Font {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| font_error(e.to_string()))?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| font_error(e.to_string()))?;
        Ok(Self {
            font,
            source: Some(path.to_path_buf()),
        })
    }

    /// File the font came from; `None` for the bundled one.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn ascent(&self, scale: f32) -> f32 {
        self.font.as_scaled(PxScale::from(scale)).ascent()
    }
}

/// One line of text anchored at its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: i32,
    pub baseline: i32,
}

impl TextLine {
    pub fn new(text: impl Into<String>, x: i32, baseline: i32) -> Self {
        Self {
            text: text.into(),
            x,
            baseline,
        }
    }
}

/// Draw lines onto the canvas. Glyphs falling outside are clipped by the
/// canvas.
pub fn draw_lines(
    canvas: &mut RgbImage,
    lines: &[TextLine],
    typeface: &Typeface,
    scale: f32,
    color: Rgb<u8>,
) {
    let ascent = typeface.ascent(scale).round() as i32;
    for line in lines {
        draw_text_mut(
            canvas,
            color,
            line.x,
            line.baseline - ascent,
            PxScale::from(scale),
            &typeface.font,
            &line.text,
        );
    }
}
