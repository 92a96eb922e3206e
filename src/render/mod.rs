//! Pure renderers: every function takes buffers by reference and returns a
//! newly allocated image.

pub mod bbox;
pub mod chart;
pub mod panel;
pub mod sprite;
pub mod text;

use image::Rgb;

/// Annotation color for face boxes, bars and labels.
pub const ACCENT: Rgb<u8> = Rgb([255, 0, 0]);

pub use chart::{BarGeometry, bar_layout};
pub use panel::PanelLayout;
pub use sprite::{Blend, SpriteSet, SpriteSkip};
pub use text::{TextLine, Typeface};
