use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, warn};

use facereport::detection::sidecar::{JsonAttributeClassifier, JsonEmotionSidecar};
use facereport::{
    AnalysisPipeline, EmotionConfig, EmotionPipeline, FaceReportError, RenderConfig, Typeface,
    WorkerTask, spawn_analysis, spawn_emotion,
};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

#[derive(Parser)]
#[command(name = "facereport")]
#[command(about = "Render face analysis results into annotated report images")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TrueType/OpenType font for labels (DejaVu Sans is bundled)
    #[arg(long, value_name = "FILE", global = true)]
    font: Option<PathBuf>,

    /// JSON file overriding the render layout
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Append failure diagnostics to this file
    #[arg(long, value_name = "FILE", global = true)]
    error_log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Box the face and compose the info panel report
    Analyze {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Analyzer output for the image (defaults to IMAGE with a .json extension)
        #[arg(long, value_name = "FILE")]
        detections: Option<PathBuf>,

        /// Show the age line in the info panel
        #[arg(long)]
        show_age: bool,

        /// Show the race line in the info panel
        #[arg(long)]
        show_race: bool,
    },
    /// Classify the largest face into seven emotions and chart the scores
    Emotion {
        /// Image file or directory of images
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Where results are written
        #[arg(long, value_name = "DIR", default_value = "results")]
        results: PathBuf,

        /// Directory with {emotion}.png RGBA sprites
        #[arg(long, value_name = "DIR")]
        emojis: Option<PathBuf>,

        /// Keep frames at their original size instead of resizing to 500px width
        #[arg(long)]
        no_resize: bool,
    },
}

/// `--font` if given, otherwise the bundled font.
fn load_typeface(path: Option<&Path>) -> anyhow::Result<Typeface> {
    let face = match path {
        Some(path) => Typeface::load(path)?,
        None => Typeface::bundled()?.clone(),
    };
    match face.source() {
        Some(file) => debug!("using font {}", file.display()),
        None => debug!("using bundled font"),
    }
    Ok(face)
}

fn append_error_log(path: &Path, message: &str) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening error log {}", path.display()))?;
    writeln!(file, "\n--- {} ---", now.format(&Rfc3339)?)?;
    writeln!(file, "{}", message)?;
    writeln!(file, "---------------------------------")?;
    Ok(())
}

fn report_failure(err: &FaceReportError, input: &Path, error_log: Option<&Path>) {
    error!("{}: {}", input.display(), err);
    eprintln!("{}: {}", input.display(), err.category().user_message());
    if let Some(log) = error_log {
        if let Err(e) = append_error_log(log, &format!("{}: {:?}", input.display(), err)) {
            warn!("could not write error log: {:#}", e);
        }
    }
}

/// Wait for the worker, cancelling it on Ctrl-C.
async fn await_worker<T: Send + 'static>(task: WorkerTask<T>) -> facereport::Result<T> {
    let cancel = task.cancel_flag();
    let outcome = task.outcome();
    tokio::pin!(outcome);
    tokio::select! {
        result = &mut outcome => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, cancelling");
            cancel.cancel();
            outcome.await
        }
    }
}

fn collect_images(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)
        .with_context(|| format!("reading directory {}", input.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .init();

    let render_config = match &args.config {
        Some(path) => RenderConfig::from_json_file(path)?,
        None => RenderConfig::default(),
    };
    let typeface = load_typeface(args.font.as_deref())?;
    let error_log = args.error_log.as_deref();

    match args.command {
        Command::Analyze {
            image_path,
            detections,
            show_age,
            show_race,
        } => {
            let classifier = match detections {
                Some(path) => JsonAttributeClassifier::with_path(path),
                None => JsonAttributeClassifier::new(),
            };
            let pipeline = AnalysisPipeline::new(classifier)
                .with_config(render_config.with_age(show_age).with_race(show_race))
                .with_typeface(typeface);

            let task = spawn_analysis(Arc::new(pipeline), image_path.clone());
            match await_worker(task).await {
                Ok(report) => {
                    println!("{}\n", report.summary_text);
                    println!("{}\n", report.emotion_text);
                    println!("Boxed image:    {}", report.redbox_path.display());
                    println!("Analysis saved: {}", report.analyzed_path.display());
                    Ok(())
                }
                Err(e) => {
                    report_failure(&e, &image_path, error_log);
                    Err(e.into())
                }
            }
        }
        Command::Emotion {
            input,
            results,
            emojis,
            no_resize,
        } => {
            let mut config = EmotionConfig::default()
                .with_results_dir(results)
                .with_frame_width(if no_resize { None } else { Some(500) });
            if let Some(dir) = emojis {
                config = config.with_sprite_dir(dir);
            }
            let pipeline = Arc::new(
                EmotionPipeline::new(JsonEmotionSidecar, JsonEmotionSidecar)
                    .with_config(config)
                    .with_render_config(render_config)
                    .with_typeface(typeface),
            );

            let images = collect_images(&input)?;
            if images.is_empty() {
                anyhow::bail!("no images found in {}", input.display());
            }
            info!("found {} image(s)", images.len());

            let mut failures = 0usize;
            for image_path in images {
                let task = spawn_emotion(pipeline.clone(), image_path.clone());
                match await_worker(task).await {
                    Ok(report) => {
                        let label = report
                            .verdict
                            .as_ref()
                            .map(|v| v.label.as_str())
                            .unwrap_or("no face");
                        println!(
                            "{}: {} -> {}",
                            image_path.display(),
                            label,
                            report.result_path.display()
                        );
                    }
                    Err(FaceReportError::Cancelled) => {
                        warn!("cancelled");
                        break;
                    }
                    Err(e) => {
                        failures += 1;
                        report_failure(&e, &image_path, error_log);
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} image(s) failed", failures);
            }
            Ok(())
        }
    }
}
