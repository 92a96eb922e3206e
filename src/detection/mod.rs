pub mod preprocessing;
pub mod sidecar;

use std::path::Path;

use image::{GrayImage, RgbImage};

use crate::models::{DetectionResult, Region};

/// Class order of the 7-way emotion classifier.
pub const EMOTION_LABELS: [&str; 7] = [
    "angry",
    "disgust",
    "scared",
    "happy",
    "sad",
    "surprised",
    "neutral",
];

/// Face-attribute analysis service (age, gender, race, emotion).
///
/// Implementations are constructed once and injected into
/// [`crate::AnalysisPipeline`]; tests substitute mocks.
pub trait FaceAttributeClassifier: Send + Sync {
    /// Analyze the image at `path` (already decoded into `image`). Faces come
    /// back in the service's order; the first one is the subject.
    fn analyze(&self, path: &Path, image: &RgbImage) -> anyhow::Result<Vec<DetectionResult>>;

    fn name(&self) -> &str;
}

/// Face detector of the emotion pipeline. Rectangles refer to `gray`.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, path: &Path, gray: &GrayImage) -> anyhow::Result<Vec<Region>>;

    fn name(&self) -> &str;
}

/// 7-way emotion classifier. Returns one score in `[0, 1]` per entry of
/// [`EMOTION_LABELS`], in that order.
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, path: &Path, roi: &GrayImage) -> anyhow::Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// The largest rectangle by area. Equal areas keep the detector's order.
pub fn select_primary_face(faces: &[Region]) -> Option<Region> {
    let mut best: Option<&Region> = None;
    for face in faces {
        if best.is_none_or(|b| face.area() > b.area()) {
            best = Some(face);
        }
    }
    best.copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_largest_area() {
        let faces = [
            Region::new(0, 0, 10, 10),
            Region::new(50, 50, 30, 20),
            Region::new(5, 5, 20, 20),
        ];
        assert_eq!(select_primary_face(&faces), Some(Region::new(50, 50, 30, 20)));
    }

    #[test]
    fn ties_keep_detector_order() {
        let faces = [Region::new(100, 0, 10, 20), Region::new(0, 0, 20, 10)];
        assert_eq!(select_primary_face(&faces), Some(faces[0]));
        assert_eq!(select_primary_face(&[]), None);
    }

    #[test]
    fn ranking_ignores_position() {
        // Far-away small boxes must not outrank near large ones.
        let faces = [Region::new(400, 400, 5, 5), Region::new(0, 0, 40, 40)];
        assert_eq!(select_primary_face(&faces), Some(faces[1]));
    }
}
