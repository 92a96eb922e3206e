use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::config::PanelConfig;
use crate::error::{FaceReportError, Result};
use crate::models::{DetectionResult, ensure_readable};

use super::text::{TextLine, Typeface, draw_lines};

pub const PANEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const SEPARATOR: Rgb<u8> = Rgb([200, 200, 200]);
pub const PANEL_TEXT: Rgb<u8> = Rgb([0, 0, 0]);

const NOT_AVAILABLE: &str = "N/A";

/// Canvas size and text placement of a composite, computed before any pixel
/// is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLayout {
    pub width: u32,
    pub height: u32,
    pub separator_x: u32,
    pub lines: Vec<TextLine>,
}

impl PanelLayout {
    pub fn new(
        frame_width: u32,
        frame_height: u32,
        face: &DetectionResult,
        config: &PanelConfig,
    ) -> Self {
        let x = (frame_width + config.text_inset) as i32;
        let pitch = config.line_pitch as f32;
        let mut y = config.first_baseline as f32;
        let mut lines = Vec::new();
        let mut push = |text: String, advance: f32, y: &mut f32| {
            lines.push(TextLine::new(text, x, *y as i32));
            *y += pitch * advance;
        };

        push("Basic Information".to_string(), 1.0, &mut y);
        if config.show_age {
            let age = face
                .age()
                .map(|a| a.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            push(format!("Age: {}", age), 1.0, &mut y);
        }
        push(
            format!("Gender: {}", face.dominant_gender().unwrap_or(NOT_AVAILABLE)),
            1.0,
            &mut y,
        );
        if config.show_race {
            push(
                format!("Race: {}", face.dominant_race().unwrap_or(NOT_AVAILABLE)),
                1.0,
                &mut y,
            );
        }
        push(
            format!("Emotion: {}", face.dominant_emotion().unwrap_or(NOT_AVAILABLE)),
            1.5,
            &mut y,
        );

        push("Emotion Probabilities".to_string(), 1.0, &mut y);
        for (label, percent) in face.emotion().iter() {
            push(format!("{}: {:.2}%", label, percent), 1.0, &mut y);
        }

        Self {
            width: frame_width + config.width,
            height: frame_height.max(config.min_height),
            separator_x: frame_width,
            lines,
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Side-by-side report: the boxed frame on the left, the first face's
/// summary and emotion scores on the right. Text running past the bottom is
/// cut off by the canvas.
pub fn compose(
    boxed: &RgbImage,
    faces: &[DetectionResult],
    config: &PanelConfig,
    typeface: &Typeface,
) -> Result<RgbImage> {
    ensure_readable(boxed)?;
    let face = faces.first().ok_or(FaceReportError::NoFaceDetected)?;
    let layout = PanelLayout::new(boxed.width(), boxed.height(), face, config);

    let mut canvas = RgbImage::from_pixel(layout.width, layout.height, PANEL_BACKGROUND);
    image::imageops::replace(&mut canvas, boxed, 0, 0);
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(layout.separator_x as i32, 0).of_size(1, layout.height),
        SEPARATOR,
    );
    draw_lines(&mut canvas, &layout.lines, typeface, config.font_scale, PANEL_TEXT);
    Ok(canvas)
}
