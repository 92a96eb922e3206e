use std::path::PathBuf;

use thiserror::Error;

/// Failures of the rendering core and the pipelines built on it.
#[derive(Debug, Error)]
pub enum FaceReportError {
    #[error("failed to read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image buffer is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("no face detected")]
    NoFaceDetected,

    #[error("malformed detection result: {0}")]
    MalformedDetection(String),

    #[error("sprite for '{label}' unavailable: {reason}")]
    SpriteUnavailable { label: String, reason: String },

    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load font {}: {reason}", path.display())]
    Font { path: PathBuf, reason: String },

    #[error("face classifier failed: {0:#}")]
    Classifier(#[source] anyhow::Error),

    #[error("analysis was cancelled")]
    Cancelled,

    #[error("worker task failed: {0}")]
    Worker(String),
}

/// What the user should be told, since the remediation differs per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ImageUnreadable,
    NoFace,
    Internal,
}

impl ErrorCategory {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCategory::ImageUnreadable => "could not read your image",
            ErrorCategory::NoFace => "could not detect a face",
            ErrorCategory::Internal => "internal rendering error",
        }
    }
}

impl FaceReportError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        FaceReportError::MalformedDetection(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            FaceReportError::ImageRead { .. } | FaceReportError::EmptyImage { .. } => {
                ErrorCategory::ImageUnreadable
            }
            FaceReportError::NoFaceDetected => ErrorCategory::NoFace,
            _ => ErrorCategory::Internal,
        }
    }

    /// Non-fatal failures let the rest of a render chain continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            FaceReportError::NoFaceDetected | FaceReportError::SpriteUnavailable { .. }
        )
    }

    /// Collaborators report through `anyhow`; keep our own variants intact when
    /// they come back wrapped.
    pub(crate) fn from_collaborator(err: anyhow::Error) -> Self {
        match err.downcast::<FaceReportError>() {
            Ok(inner) => inner,
            Err(other) => FaceReportError::Classifier(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FaceReportError>;
