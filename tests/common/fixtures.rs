use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::mpsc::Receiver;

use facereport::{
    ClassProbabilities, DetectionResult, EmotionClassifier, FaceAttributeClassifier, FaceDetector,
    Region,
};
use image::{GrayImage, ImageBuffer, Rgb, RgbImage};

/// Writes a `width`x`height` gradient PNG named `name` into `dir`.
pub fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128u8])
    });
    let path = dir.join(name);
    img.save(&path).expect("Failed to save test image");
    path
}

/// Face with emotions `{"happy": 87.5, "sad": 12.5}`.
pub fn happy_face(region: Region) -> DetectionResult {
    let emotion = ClassProbabilities::from_pairs([("happy", 87.5), ("sad", 12.5)]).unwrap();
    let gender = ClassProbabilities::from_pairs([("Woman", 99.0), ("Man", 1.0)]).unwrap();
    DetectionResult::new(region, emotion, Some("happy".to_string()))
        .unwrap()
        .with_gender(Some("Woman".to_string()), gender)
        .unwrap()
        .with_age(27)
}

/// Names of the files in `dir`, sorted.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Returns the same faces for every image.
pub struct FixedClassifier(pub Vec<DetectionResult>);

impl FaceAttributeClassifier for FixedClassifier {
    fn analyze(&self, _path: &Path, _image: &RgbImage) -> anyhow::Result<Vec<DetectionResult>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Blocks until the test sends a signal, then returns its faces.
pub struct GatedClassifier {
    pub gate: Mutex<Receiver<()>>,
    pub faces: Vec<DetectionResult>,
}

impl FaceAttributeClassifier for GatedClassifier {
    fn analyze(&self, _path: &Path, _image: &RgbImage) -> anyhow::Result<Vec<DetectionResult>> {
        self.gate.lock().unwrap().recv()?;
        Ok(self.faces.clone())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Always fails like an unavailable model would.
pub struct BrokenClassifier;

impl FaceAttributeClassifier for BrokenClassifier {
    fn analyze(&self, _path: &Path, _image: &RgbImage) -> anyhow::Result<Vec<DetectionResult>> {
        anyhow::bail!("model weights not loaded")
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Reports fixed rectangles.
pub struct FixedDetector(pub Vec<Region>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _path: &Path, _gray: &GrayImage) -> anyhow::Result<Vec<Region>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Reports fixed scores and remembers the ROI size it was given.
pub struct FixedScores {
    pub scores: Vec<f32>,
    pub seen: Mutex<Option<(u32, u32)>>,
}

impl FixedScores {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            seen: Mutex::new(None),
        }
    }
}

impl EmotionClassifier for FixedScores {
    fn classify(&self, _path: &Path, roi: &GrayImage) -> anyhow::Result<Vec<f32>> {
        *self.seen.lock().unwrap() = Some(roi.dimensions());
        Ok(self.scores.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Lets a test keep a handle on a [`FixedScores`] owned by a pipeline.
pub struct SharedScores(pub Arc<FixedScores>);

impl EmotionClassifier for SharedScores {
    fn classify(&self, path: &Path, roi: &GrayImage) -> anyhow::Result<Vec<f32>> {
        self.0.classify(path, roi)
    }

    fn name(&self) -> &str {
        "shared"
    }
}

/// Scores with "happy" on top, in label order.
pub fn happy_scores() -> Vec<f32> {
    vec![0.05, 0.01, 0.02, 0.80, 0.07, 0.03, 0.02]
}
