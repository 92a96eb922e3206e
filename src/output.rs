use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::error::{FaceReportError, Result};

/// Split the last path segment into stem and extension (extension includes
/// the dot). Leading dots belong to the stem.
fn split_name(input: &Path) -> (OsString, OsString) {
    let stem = input.file_stem().map(OsString::from).unwrap_or_default();
    let ext = match input.extension() {
        Some(ext) => {
            let mut dotted = OsString::from(".");
            dotted.push(ext);
            dotted
        }
        None => OsString::new(),
    };
    (stem, ext)
}

/// `{stem}_{tag}{ext}` next to the input. An existing file at the result is
/// overwritten by callers; no versioning happens here.
pub fn resolve(input: &Path, tag: &str) -> PathBuf {
    let (mut name, ext) = split_name(input);
    name.push("_");
    name.push(tag);
    name.push(ext);
    input.with_file_name(name)
}

/// `{dir}/{stem}_{tag}.{ext}`, used for artifacts collected in a results directory.
pub fn resolve_in(dir: &Path, input: &Path, tag: &str, ext: &str) -> PathBuf {
    let (mut name, _) = split_name(input);
    name.push("_");
    name.push(tag);
    name.push(".");
    name.push(ext);
    dir.join(name)
}

fn encode_error(err: image::ImageError) -> io::Error {
    match err {
        image::ImageError::IoError(e) => e,
        other => io::Error::other(other),
    }
}

struct Staged {
    temp: PathBuf,
    target: PathBuf,
}

/// Artifacts of one pipeline run. Images are encoded into hidden temporary
/// files first and only moved to their final names on `commit`; dropping an
/// uncommitted batch removes the temporaries.
#[derive(Default)]
pub struct ArtifactBatch {
    staged: Vec<Staged>,
}

impl ArtifactBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, image: &RgbImage, target: &Path) -> Result<()> {
        let write_err = |source| FaceReportError::OutputWrite {
            path: target.to_path_buf(),
            source,
        };

        let format = ImageFormat::from_path(target).map_err(|e| write_err(encode_error(e)))?;
        let mut temp_name = OsString::from(".");
        temp_name.push(target.file_name().unwrap_or_default());
        temp_name.push(".partial");
        let temp = target.with_file_name(temp_name);

        // Register before writing so a failed encode still gets cleaned up.
        self.staged.push(Staged {
            temp: temp.clone(),
            target: target.to_path_buf(),
        });
        image
            .save_with_format(&temp, format)
            .map_err(|e| write_err(encode_error(e)))?;
        debug!("staged {}", target.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Move every staged artifact into place. Artifacts already moved stay
    /// valid if a later one fails.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.staged.len());
        while !self.staged.is_empty() {
            let item = self.staged.remove(0);
            if let Err(source) = std::fs::rename(&item.temp, &item.target) {
                let _ = std::fs::remove_file(&item.temp);
                return Err(FaceReportError::OutputWrite {
                    path: item.target,
                    source,
                });
            }
            written.push(item.target);
        }
        Ok(written)
    }
}

impl Drop for ArtifactBatch {
    fn drop(&mut self) {
        for item in &self.staged {
            let _ = std::fs::remove_file(&item.temp);
        }
    }
}
