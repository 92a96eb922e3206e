use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use image::{DynamicImage, RgbImage};
use tracing::{debug, warn};

use crate::error::FaceReportError;

/// Why a sprite was not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteSkip {
    /// The sprite has no alpha channel.
    MissingAlpha,
    /// The placement does not fit inside the frame.
    OutOfBounds,
}

impl fmt::Display for SpriteSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpriteSkip::MissingAlpha => f.write_str("sprite has no alpha channel"),
            SpriteSkip::OutOfBounds => f.write_str("sprite placement leaves the frame"),
        }
    }
}

/// Result of a blend: always a fresh frame, plus the reason if the sprite
/// was left out.
#[derive(Debug, Clone)]
pub struct Blend {
    pub image: RgbImage,
    pub skipped: Option<SpriteSkip>,
}

fn mix(sprite: u8, frame: u8, alpha: f32) -> u8 {
    (sprite as f32 * alpha + frame as f32 * (1.0 - alpha))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Alpha-composite `sprite` over `frame` with its top-left corner at
/// `anchor`. Placements that do not fit entirely are skipped, never clipped.
pub fn blend(frame: &RgbImage, sprite: &DynamicImage, anchor: (u32, u32)) -> Blend {
    let mut out = frame.clone();

    if !sprite.color().has_alpha() {
        return Blend {
            image: out,
            skipped: Some(SpriteSkip::MissingAlpha),
        };
    }

    let (ax, ay) = anchor;
    let fits = ax as u64 + sprite.width() as u64 <= frame.width() as u64
        && ay as u64 + sprite.height() as u64 <= frame.height() as u64;
    if !fits {
        return Blend {
            image: out,
            skipped: Some(SpriteSkip::OutOfBounds),
        };
    }

    let rgba = sprite.to_rgba8();
    for (sx, sy, s) in rgba.enumerate_pixels() {
        let alpha = s[3] as f32 / 255.0;
        let px = out.get_pixel_mut(ax + sx, ay + sy);
        for c in 0..3 {
            px[c] = mix(s[c], px[c], alpha);
        }
    }

    Blend {
        image: out,
        skipped: None,
    }
}

/// Emoji sprites keyed by class label, loaded once and reused.
#[derive(Debug, Default, Clone)]
pub struct SpriteSet {
    sprites: HashMap<String, DynamicImage>,
}

impl SpriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{dir}/{label}.png` for every label. Missing or unreadable files
    /// only produce a warning.
    pub fn load(dir: &Path, labels: &[&str]) -> Self {
        let mut set = Self::new();
        for label in labels {
            let path = dir.join(format!("{}.png", label));
            match image::open(&path) {
                Ok(img) => {
                    debug!("loaded sprite {}", path.display());
                    set.insert(*label, img);
                }
                Err(e) => {
                    let err = FaceReportError::SpriteUnavailable {
                        label: label.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{}", err);
                }
            }
        }
        set
    }

    pub fn insert(&mut self, label: impl Into<String>, sprite: DynamicImage) {
        self.sprites.insert(label.into(), sprite);
    }

    pub fn get(&self, label: &str) -> Option<&DynamicImage> {
        self.sprites.get(label)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
