use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::error::Result;
use crate::models::{Region, ensure_readable};

use super::ACCENT;

/// Outline width of face boxes.
pub const BOX_THICKNESS: u32 = 2;

/// Stroke `thickness` rings along the inside of the region's boundary.
pub(crate) fn outline(canvas: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    for t in 0..thickness {
        let w = region.w.saturating_sub(2 * t);
        let h = region.h.saturating_sub(2 * t);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Copy of `frame` with the face boxed in red. Without a region the copy is
/// returned untouched.
pub fn draw(frame: &RgbImage, region: Option<&Region>) -> Result<RgbImage> {
    ensure_readable(frame)?;
    let mut boxed = frame.clone();
    if let Some(region) = region {
        region.validate_within(frame.width(), frame.height())?;
        outline(&mut boxed, region, ACCENT, BOX_THICKNESS);
    }
    Ok(boxed)
}
