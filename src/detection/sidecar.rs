//! Collaborators backed by precomputed analyzer output stored next to the
//! image, so the renderers can run without a model in-process.

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{GrayImage, RgbImage};
use serde::Deserialize;

use super::{EmotionClassifier, FaceAttributeClassifier, FaceDetector};
use crate::error::FaceReportError;
use crate::models::{DetectionResult, Region};

fn read_sidecar(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn malformed(path: &Path, err: serde_json::Error) -> anyhow::Error {
    FaceReportError::malformed(format!("{}: {}", path.display(), err)).into()
}

/// Reads face-attribute results from `{stem}.json` (or an explicit file).
/// The document is either one face object or a list of them.
#[derive(Debug, Clone, Default)]
pub struct JsonAttributeClassifier {
    explicit: Option<PathBuf>,
}

impl JsonAttributeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
        }
    }

    pub fn sidecar_for(&self, image_path: &Path) -> PathBuf {
        self.explicit
            .clone()
            .unwrap_or_else(|| image_path.with_extension("json"))
    }

    pub fn parse(raw: &str) -> serde_json::Result<Vec<DetectionResult>> {
        if raw.trim_start().starts_with('[') {
            serde_json::from_str(raw)
        } else {
            serde_json::from_str::<DetectionResult>(raw).map(|face| vec![face])
        }
    }
}

impl FaceAttributeClassifier for JsonAttributeClassifier {
    fn analyze(&self, path: &Path, _image: &RgbImage) -> anyhow::Result<Vec<DetectionResult>> {
        let sidecar = self.sidecar_for(path);
        let raw = read_sidecar(&sidecar)?;
        Self::parse(&raw).map_err(|e| malformed(&sidecar, e))
    }

    fn name(&self) -> &str {
        "json-sidecar"
    }
}

#[derive(Debug, Deserialize)]
struct FaceFile {
    #[serde(default)]
    faces: Vec<[u32; 4]>,
    #[serde(default)]
    preds: Vec<f32>,
}

/// Reads `{stem}.faces.json`: `{"faces": [[x, y, w, h], ...], "preds": [...]}`.
/// Rectangles refer to the frame after the pipeline's resize.
#[derive(Debug, Clone, Default)]
pub struct JsonEmotionSidecar;

impl JsonEmotionSidecar {
    pub fn sidecar_for(image_path: &Path) -> PathBuf {
        image_path.with_extension("faces.json")
    }

    fn load(image_path: &Path) -> anyhow::Result<FaceFile> {
        let sidecar = Self::sidecar_for(image_path);
        let raw = read_sidecar(&sidecar)?;
        serde_json::from_str(&raw).map_err(|e| malformed(&sidecar, e))
    }
}

impl FaceDetector for JsonEmotionSidecar {
    fn detect(&self, path: &Path, _gray: &GrayImage) -> anyhow::Result<Vec<Region>> {
        Ok(Self::load(path)?
            .faces
            .into_iter()
            .map(|[x, y, w, h]| Region::new(x, y, w, h))
            .collect())
    }

    fn name(&self) -> &str {
        "json-faces"
    }
}

impl EmotionClassifier for JsonEmotionSidecar {
    fn classify(&self, path: &Path, _roi: &GrayImage) -> anyhow::Result<Vec<f32>> {
        Ok(Self::load(path)?.preds)
    }

    fn name(&self) -> &str {
        "json-preds"
    }
}
