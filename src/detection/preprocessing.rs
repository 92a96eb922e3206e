use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::error::Result;
use crate::models::Region;

/// Convert a frame to grayscale for detection
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::DynamicImage::ImageRgb8(img.clone()).to_luma8()
}

/// Scale to `width` keeping the aspect ratio; the height is truncated.
pub fn resize_to_width(img: &RgbImage, width: u32) -> RgbImage {
    if width == 0 || img.width() == width {
        return img.clone();
    }
    let ratio = width as f64 / img.width() as f64;
    let height = ((img.height() as f64 * ratio) as u32).max(1);
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Cut the face out of the grayscale frame and scale it to a `side`×`side`
/// patch for the classifier.
pub fn extract_roi(gray: &GrayImage, region: &Region, side: u32) -> Result<GrayImage> {
    region.validate_within(gray.width(), gray.height())?;
    let face = imageops::crop_imm(gray, region.x, region.y, region.w, region.h).to_image();
    Ok(imageops::resize(&face, side, side, FilterType::Triangle))
}
