use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Layout of the info-panel composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Width of the text column appended to the right of the frame.
    pub width: u32,
    pub min_height: u32,
    /// Distance from the separator to the text column.
    pub text_inset: u32,
    pub first_baseline: u32,
    pub line_pitch: u32,
    pub font_scale: f32,
    pub show_age: bool,
    pub show_race: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 400,
            min_height: 400,
            text_inset: 20,
            first_baseline: 40,
            line_pitch: 30,
            font_scale: 24.0,
            show_age: false,
            show_race: false,
        }
    }
}

/// Probability bar chart canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    /// Blank rows at the top of every band.
    pub band_margin: u32,
    pub label_inset: u32,
    pub font_scale: f32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 250,
            band_margin: 5,
            label_inset: 10,
            font_scale: 14.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub panel: PanelConfig,
    pub chart: ChartConfig,
}

impl RenderConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn with_age(mut self, show: bool) -> Self {
        self.panel.show_age = show;
        self
    }

    pub fn with_race(mut self, show: bool) -> Self {
        self.panel.show_race = show;
        self
    }
}

/// Settings of the detect-then-classify emotion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Frames are resized to this width before detection; `None` keeps them as is.
    pub frame_width: Option<u32>,
    /// Side of the square grayscale patch handed to the classifier.
    pub roi_side: u32,
    /// Vertical gap between the face box and the sprite below it.
    pub sprite_gap: u32,
    /// Distance of the label baseline above the face box.
    pub label_offset: u32,
    pub label_scale: f32,
    pub results_dir: PathBuf,
    pub sprite_dir: Option<PathBuf>,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            frame_width: Some(500),
            roi_side: 64,
            sprite_gap: 10,
            label_offset: 10,
            label_scale: 18.0,
            results_dir: PathBuf::from("results"),
            sprite_dir: None,
        }
    }
}

impl EmotionConfig {
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_sprite_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sprite_dir = Some(dir.into());
        self
    }

    pub fn with_frame_width(mut self, width: Option<u32>) -> Self {
        self.frame_width = width;
        self
    }
}
