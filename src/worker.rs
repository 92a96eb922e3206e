//! Background execution of a pipeline run, for callers that must stay
//! responsive while a request is processed.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{FaceReportError, Result};
use crate::pipeline::{AnalysisPipeline, AnalysisReport, EmotionPipeline, EmotionReport};

/// Shared cancellation request, checked by pipelines between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FaceReportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A job running on tokio's blocking pool. Its outcome is delivered exactly
/// once: awaiting [`WorkerTask::outcome`] consumes the task.
///
/// Must be created inside a tokio runtime.
pub struct WorkerTask<T> {
    cancel: CancelFlag,
    outcome: oneshot::Receiver<Result<T>>,
}

impl<T: Send + 'static> WorkerTask<T> {
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce(&CancelFlag) -> Result<T> + Send + 'static,
    {
        let cancel = CancelFlag::new();
        let flag = cancel.clone();
        let (tx, rx) = oneshot::channel();
        tokio::task::spawn_blocking(move || {
            let outcome = job(&flag);
            if tx.send(outcome).is_err() {
                debug!("worker outcome dropped: nobody is waiting");
            }
        });
        Self {
            cancel,
            outcome: rx,
        }
    }

    /// Ask the job to stop. A job cancelled before it commits leaves no
    /// artifacts and reports [`FaceReportError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn outcome(self) -> Result<T> {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => Err(FaceReportError::Worker(
                "worker stopped without reporting an outcome".to_string(),
            )),
        }
    }
}

pub fn spawn_analysis(
    pipeline: Arc<AnalysisPipeline>,
    path: PathBuf,
) -> WorkerTask<AnalysisReport> {
    WorkerTask::spawn(move |cancel| pipeline.run_cancellable(&path, cancel))
}

pub fn spawn_emotion(pipeline: Arc<EmotionPipeline>, path: PathBuf) -> WorkerTask<EmotionReport> {
    WorkerTask::spawn(move |cancel| pipeline.run_cancellable(&path, cancel))
}
