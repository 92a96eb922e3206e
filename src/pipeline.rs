use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::config::{EmotionConfig, RenderConfig};
use crate::detection::preprocessing::{extract_roi, resize_to_width, to_grayscale};
use crate::detection::{
    EMOTION_LABELS, EmotionClassifier, FaceAttributeClassifier, FaceDetector, select_primary_face,
};
use crate::error::{FaceReportError, Result};
use crate::models::{ClassProbabilities, DetectionResult, Region, SourceImage};
use crate::output::{self, ArtifactBatch};
use crate::render::text::{TextLine, Typeface, draw_lines};
use crate::render::{ACCENT, SpriteSet, SpriteSkip, bbox, chart, panel, sprite};
use crate::report;
use crate::worker::CancelFlag;

pub const REDBOX_TAG: &str = "redbox";
pub const ANALYZED_TAG: &str = "analyzed";
pub const RESULT_TAG: &str = "result";
pub const PROBABILITIES_TAG: &str = "probabilities";
const RESULTS_EXT: &str = "jpg";
const NO_FACE_TEXT: &str = "No face detected";

/// Rendered, not yet written, output of the attribute pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisArtifacts {
    pub faces: Vec<DetectionResult>,
    pub boxed: RgbImage,
    pub composite: RgbImage,
}

/// What a completed attribute analysis produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub face: DetectionResult,
    pub face_count: usize,
    pub summary_text: String,
    pub emotion_text: String,
    pub redbox_path: PathBuf,
    pub analyzed_path: PathBuf,
}

/// Classify, box the subject face, compose the info panel, write both images.
pub struct AnalysisPipeline {
    classifier: Box<dyn FaceAttributeClassifier>,
    config: RenderConfig,
    typeface: Option<Typeface>,
}

impl AnalysisPipeline {
    pub fn new(classifier: impl FaceAttributeClassifier + 'static) -> Self {
        Self {
            classifier: Box::new(classifier),
            config: RenderConfig::default(),
            typeface: None,
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the bundled font.
    pub fn with_typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = Some(typeface);
        self
    }

    fn typeface(&self) -> Result<&Typeface> {
        match &self.typeface {
            Some(face) => Ok(face),
            None => Typeface::bundled(),
        }
    }

    pub fn classify(&self, source: &SourceImage) -> Result<Vec<DetectionResult>> {
        debug!("running classifier '{}'", self.classifier.name());
        let faces = self
            .classifier
            .analyze(&source.path, &source.pixels)
            .map_err(FaceReportError::from_collaborator)?;
        debug!("classifier reported {} face(s)", faces.len());
        Ok(faces)
    }

    /// Render both artifacts in memory. The first face is the subject.
    pub fn render(
        &self,
        source: &SourceImage,
        faces: Vec<DetectionResult>,
    ) -> Result<AnalysisArtifacts> {
        let subject = faces.first().ok_or(FaceReportError::NoFaceDetected)?;
        let boxed = bbox::draw(&source.pixels, Some(subject.region()))?;
        let composite = panel::compose(&boxed, &faces, &self.config.panel, self.typeface()?)?;
        Ok(AnalysisArtifacts {
            faces,
            boxed,
            composite,
        })
    }

    pub fn run(&self, path: &Path) -> Result<AnalysisReport> {
        self.run_cancellable(path, &CancelFlag::new())
    }

    /// Like [`run`](Self::run), but nothing reaches its final path once
    /// `cancel` is raised.
    pub fn run_cancellable(&self, path: &Path, cancel: &CancelFlag) -> Result<AnalysisReport> {
        cancel.check()?;
        info!("analyzing {}", path.display());
        let source = SourceImage::open(path)?;
        let faces = self.classify(&source)?;
        cancel.check()?;

        let artifacts = self.render(&source, faces)?;
        let redbox_path = output::resolve(path, REDBOX_TAG);
        let analyzed_path = output::resolve(path, ANALYZED_TAG);

        let mut batch = ArtifactBatch::new();
        batch.stage(&artifacts.boxed, &redbox_path)?;
        batch.stage(&artifacts.composite, &analyzed_path)?;
        cancel.check()?;
        batch.commit()?;
        info!("analysis saved to {}", analyzed_path.display());

        let face_count = artifacts.faces.len();
        let face = artifacts
            .faces
            .into_iter()
            .next()
            .ok_or(FaceReportError::NoFaceDetected)?;
        Ok(AnalysisReport {
            summary_text: report::summary_text(&face),
            emotion_text: report::emotion_text(&face),
            face,
            face_count,
            redbox_path,
            analyzed_path,
        })
    }
}

/// How the emoji step went for a classified face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteStatus {
    Drawn,
    /// No sprite is loaded for the label.
    Missing,
    Skipped(SpriteSkip),
}

/// Classification of the primary face in a frame.
#[derive(Debug, Clone)]
pub struct EmotionVerdict {
    pub region: Region,
    pub label: String,
    pub probabilities: ClassProbabilities,
    pub sprite: SpriteStatus,
}

/// Rendered, not yet written, output of the emotion pipeline.
#[derive(Debug, Clone)]
pub struct EmotionFrame {
    pub frame: RgbImage,
    pub chart: RgbImage,
    pub verdict: Option<EmotionVerdict>,
}

#[derive(Debug, Clone)]
pub struct EmotionReport {
    pub result_path: PathBuf,
    pub probabilities_path: PathBuf,
    pub verdict: Option<EmotionVerdict>,
}

/// Detect faces, classify the largest one into seven emotions, and render the
/// annotated frame plus the probability chart.
pub struct EmotionPipeline {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn EmotionClassifier>,
    sprites: SpriteSet,
    config: EmotionConfig,
    render: RenderConfig,
    typeface: Option<Typeface>,
}

impl EmotionPipeline {
    pub fn new(
        detector: impl FaceDetector + 'static,
        classifier: impl EmotionClassifier + 'static,
    ) -> Self {
        Self {
            detector: Box::new(detector),
            classifier: Box::new(classifier),
            sprites: SpriteSet::new(),
            config: EmotionConfig::default(),
            render: RenderConfig::default(),
            typeface: None,
        }
    }

    /// Also loads the sprites from `config.sprite_dir` when one is set.
    pub fn with_config(mut self, config: EmotionConfig) -> Self {
        if let Some(dir) = &config.sprite_dir {
            self.sprites = SpriteSet::load(dir, &EMOTION_LABELS);
        }
        self.config = config;
        self
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn with_sprites(mut self, sprites: SpriteSet) -> Self {
        self.sprites = sprites;
        self
    }

    /// Replace the bundled font.
    pub fn with_typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = Some(typeface);
        self
    }

    fn typeface(&self) -> Result<&Typeface> {
        match &self.typeface {
            Some(face) => Ok(face),
            None => Typeface::bundled(),
        }
    }

    fn draw_label(&self, frame: &mut RgbImage, text: &str, x: i32, baseline: i32) -> Result<()> {
        draw_lines(
            frame,
            &[TextLine::new(text, x, baseline)],
            self.typeface()?,
            self.config.label_scale,
            ACCENT,
        );
        Ok(())
    }

    pub fn render(&self, source: &SourceImage) -> Result<EmotionFrame> {
        let frame = match self.config.frame_width {
            Some(width) => resize_to_width(&source.pixels, width),
            None => source.pixels.clone(),
        };
        let gray = to_grayscale(&frame);

        let faces = self
            .detector
            .detect(&source.path, &gray)
            .map_err(FaceReportError::from_collaborator)?;
        debug!("detector '{}' found {} face(s)", self.detector.name(), faces.len());

        let Some(region) = select_primary_face(&faces) else {
            let mut annotated = frame;
            self.draw_label(&mut annotated, NO_FACE_TEXT, 20, 60)?;
            let empty = ClassProbabilities::new();
            let chart = chart::render(&empty, &self.render.chart, self.typeface()?);
            return Ok(EmotionFrame {
                frame: annotated,
                chart,
                verdict: None,
            });
        };

        let roi = extract_roi(&gray, &region, self.config.roi_side)?;
        let scores = self
            .classifier
            .classify(&source.path, &roi)
            .map_err(FaceReportError::from_collaborator)?;
        let probabilities = ClassProbabilities::from_fractions(&EMOTION_LABELS, &scores)?;
        let label = probabilities
            .dominant()
            .ok_or_else(|| FaceReportError::malformed("classifier returned no scores"))?
            .to_string();
        debug!("primary face at ({}, {}) classified as {}", region.x, region.y, label);

        let chart = chart::render(&probabilities, &self.render.chart, self.typeface()?);

        let mut labelled = frame;
        self.draw_label(
            &mut labelled,
            &label,
            region.x as i32,
            region.y as i32 - self.config.label_offset as i32,
        )?;
        let mut annotated = bbox::draw(&labelled, Some(&region))?;

        let sprite_status = match self.sprites.get(&label) {
            None => SpriteStatus::Missing,
            Some(emoji) => {
                let anchor = (
                    region.x,
                    region
                        .y
                        .saturating_add(region.h)
                        .saturating_add(self.config.sprite_gap),
                );
                let blended = sprite::blend(&annotated, emoji, anchor);
                annotated = blended.image;
                match blended.skipped {
                    Some(skip) => {
                        warn!("sprite for '{}' not drawn: {}", label, skip);
                        SpriteStatus::Skipped(skip)
                    }
                    None => SpriteStatus::Drawn,
                }
            }
        };

        Ok(EmotionFrame {
            frame: annotated,
            chart,
            verdict: Some(EmotionVerdict {
                region,
                label,
                probabilities,
                sprite: sprite_status,
            }),
        })
    }

    pub fn run(&self, path: &Path) -> Result<EmotionReport> {
        self.run_cancellable(path, &CancelFlag::new())
    }

    pub fn run_cancellable(&self, path: &Path, cancel: &CancelFlag) -> Result<EmotionReport> {
        cancel.check()?;
        info!("processing {}", path.display());
        let source = SourceImage::open(path)?;
        let rendered = self.render(&source)?;
        cancel.check()?;

        let dir = &self.config.results_dir;
        std::fs::create_dir_all(dir).map_err(|source| FaceReportError::OutputWrite {
            path: dir.clone(),
            source,
        })?;
        let result_path = output::resolve_in(dir, path, RESULT_TAG, RESULTS_EXT);
        let probabilities_path = output::resolve_in(dir, path, PROBABILITIES_TAG, RESULTS_EXT);

        let mut batch = ArtifactBatch::new();
        batch.stage(&rendered.frame, &result_path)?;
        batch.stage(&rendered.chart, &probabilities_path)?;
        cancel.check()?;
        batch.commit()?;
        info!("saved {}", result_path.display());

        Ok(EmotionReport {
            result_path,
            probabilities_path,
            verdict: rendered.verdict,
        })
    }
}
