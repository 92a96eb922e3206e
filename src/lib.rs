pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod worker;

pub use config::{ChartConfig, EmotionConfig, PanelConfig, RenderConfig};
pub use detection::{
    EMOTION_LABELS, EmotionClassifier, FaceAttributeClassifier, FaceDetector, select_primary_face,
};
pub use error::{ErrorCategory, FaceReportError, Result};
pub use models::{ClassProbabilities, DetectionResult, Region, SourceImage};
pub use pipeline::{
    AnalysisPipeline, AnalysisReport, EmotionFrame, EmotionPipeline, EmotionReport,
    EmotionVerdict, SpriteStatus,
};
pub use render::{SpriteSet, Typeface};
pub use worker::{CancelFlag, WorkerTask, spawn_analysis, spawn_emotion};
