use std::fmt;
use std::path::PathBuf;

use image::RgbImage;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{FaceReportError, Result};

/// Face rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.w as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.h as u64
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && (x as u64) < self.right() && y >= self.y && (y as u64) < self.bottom()
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.w > 0 && self.h > 0 && self.right() <= width as u64 && self.bottom() <= height as u64
    }

    /// Reject rectangles that would put annotations outside the frame.
    pub fn validate_within(&self, width: u32, height: u32) -> Result<()> {
        if self.fits_within(width, height) {
            Ok(())
        } else {
            Err(FaceReportError::malformed(format!(
                "region {}x{} at ({}, {}) does not fit a {}x{} frame",
                self.w, self.h, self.x, self.y, width, height
            )))
        }
    }
}

/// Ordered label -> percentage mapping. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassProbabilities {
    entries: Vec<(String, f64)>,
}

impl ClassProbabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut probs = Self::new();
        for (label, value) in pairs {
            probs.push(label, value)?;
        }
        Ok(probs)
    }

    /// Build from classifier fractions in `[0, 1]`, one per label.
    pub fn from_fractions(labels: &[&str], fractions: &[f32]) -> Result<Self> {
        if labels.len() != fractions.len() {
            return Err(FaceReportError::malformed(format!(
                "expected {} class scores, got {}",
                labels.len(),
                fractions.len()
            )));
        }
        Self::from_pairs(
            labels
                .iter()
                .zip(fractions)
                .map(|(label, p)| (*label, *p as f64 * 100.0)),
        )
    }

    /// Append a class. Values are normalized to a plain percentage here and
    /// nowhere else.
    pub fn push(&mut self, label: impl Into<String>, value: f64) -> Result<()> {
        let label = label.into();
        if !value.is_finite() {
            return Err(FaceReportError::malformed(format!(
                "probability for '{}' is not a finite number",
                label
            )));
        }
        if self.contains(&label) {
            return Err(FaceReportError::malformed(format!(
                "duplicate class label '{}'",
                label
            )));
        }
        self.entries.push((label, value.clamp(0.0, 100.0)));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(label, p)| (label.as_str(), *p))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, p)| *p)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// Label with the highest value; ties go to the first inserted.
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<&(String, f64)> = None;
        for entry in &self.entries {
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(label, _)| label.as_str())
    }
}

/// Upstream analyzers wrap numbers in various ways; accept the plain and the
/// stringly-typed forms.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawProbability {
    Number(f64),
    Text(String),
}

impl RawProbability {
    fn to_plain(&self) -> std::result::Result<f64, String> {
        match self {
            RawProbability::Number(v) => Ok(*v),
            RawProbability::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", s)),
        }
    }
}

impl<'de> Deserialize<'de> for ClassProbabilities {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ProbabilityVisitor;

        impl<'de> Visitor<'de> for ProbabilityVisitor {
            type Value = ClassProbabilities;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of class label to percentage")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut probs = ClassProbabilities::new();
                while let Some((label, raw)) = map.next_entry::<String, RawProbability>()? {
                    let value = raw.to_plain().map_err(de::Error::custom)?;
                    probs.push(label, value).map_err(de::Error::custom)?;
                }
                Ok(probs)
            }
        }

        deserializer.deserialize_map(ProbabilityVisitor)
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, p) in &self.entries {
            map.serialize_entry(label, p)?;
        }
        map.end()
    }
}

/// Analyzer output for one face, in the shape face-attribute services emit.
#[derive(Deserialize)]
struct RawDetection {
    region: Option<Region>,
    #[serde(default)]
    age: Option<f64>,
    #[serde(default)]
    dominant_gender: Option<String>,
    #[serde(default)]
    gender: ClassProbabilities,
    #[serde(default)]
    dominant_race: Option<String>,
    #[serde(default)]
    race: ClassProbabilities,
    #[serde(default)]
    dominant_emotion: Option<String>,
    #[serde(default)]
    emotion: ClassProbabilities,
}

/// One analyzed face. Immutable once built; construction validates every
/// cross-field rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDetection")]
pub struct DetectionResult {
    region: Region,
    age: Option<u32>,
    dominant_gender: Option<String>,
    gender: ClassProbabilities,
    dominant_race: Option<String>,
    race: ClassProbabilities,
    dominant_emotion: Option<String>,
    emotion: ClassProbabilities,
}

impl TryFrom<RawDetection> for DetectionResult {
    type Error = FaceReportError;

    fn try_from(raw: RawDetection) -> Result<Self> {
        let region = raw
            .region
            .ok_or_else(|| FaceReportError::malformed("missing face region"))?;
        let mut result = DetectionResult::new(region, raw.emotion, raw.dominant_emotion)?;
        if let Some(age) = raw.age {
            if !age.is_finite() || age < 0.0 {
                return Err(FaceReportError::malformed(format!("invalid age {}", age)));
            }
            result = result.with_age(age.round() as u32);
        }
        result = result.with_gender(raw.dominant_gender, raw.gender)?;
        result = result.with_race(raw.dominant_race, raw.race)?;
        Ok(result)
    }
}

fn check_dominant(
    axis: &str,
    dominant: Option<String>,
    probs: &ClassProbabilities,
) -> Result<Option<String>> {
    match dominant {
        Some(label) if !probs.is_empty() && !probs.contains(&label) => {
            Err(FaceReportError::malformed(format!(
                "dominant {} '{}' is not one of the reported classes",
                axis, label
            )))
        }
        other => Ok(other),
    }
}

impl DetectionResult {
    /// Region plus emotion scores. A missing dominant emotion is derived from
    /// the scores; one that is not the top-scoring class is rejected.
    pub fn new(
        region: Region,
        emotion: ClassProbabilities,
        dominant_emotion: Option<String>,
    ) -> Result<Self> {
        if region.w == 0 || region.h == 0 {
            return Err(FaceReportError::malformed("face region has zero size"));
        }
        let dominant_emotion = check_dominant("emotion", dominant_emotion, &emotion)?;
        let dominant_emotion = match (emotion.dominant(), dominant_emotion) {
            (None, reported) => reported,
            (Some(top), None) => Some(top.to_string()),
            (Some(top), Some(reported)) => {
                let top_value = emotion.get(top).unwrap_or_default();
                if emotion.get(&reported).unwrap_or_default() < top_value {
                    return Err(FaceReportError::malformed(format!(
                        "dominant emotion '{}' is not the highest scoring class '{}'",
                        reported, top
                    )));
                }
                Some(top.to_string())
            }
        };

        Ok(Self {
            region,
            age: None,
            dominant_gender: None,
            gender: ClassProbabilities::new(),
            dominant_race: None,
            race: ClassProbabilities::new(),
            dominant_emotion,
            emotion,
        })
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_gender(
        mut self,
        dominant: Option<String>,
        probs: ClassProbabilities,
    ) -> Result<Self> {
        self.dominant_gender = check_dominant("gender", dominant, &probs)?;
        self.gender = probs;
        Ok(self)
    }

    pub fn with_race(
        mut self,
        dominant: Option<String>,
        probs: ClassProbabilities,
    ) -> Result<Self> {
        self.dominant_race = check_dominant("race", dominant, &probs)?;
        self.race = probs;
        Ok(self)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn dominant_gender(&self) -> Option<&str> {
        self.dominant_gender.as_deref()
    }

    pub fn gender(&self) -> &ClassProbabilities {
        &self.gender
    }

    pub fn dominant_race(&self) -> Option<&str> {
        self.dominant_race.as_deref()
    }

    pub fn race(&self) -> &ClassProbabilities {
        &self.race
    }

    pub fn dominant_emotion(&self) -> Option<&str> {
        self.dominant_emotion.as_deref()
    }

    pub fn emotion(&self) -> &ClassProbabilities {
        &self.emotion
    }
}

/// A decoded source frame together with where it came from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub pixels: RgbImage,
}

impl SourceImage {
    /// Decode an image from disk. Zero-sized images are treated as unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let decoded = image::ImageReader::open(&path)
            .map_err(|e| FaceReportError::ImageRead {
                path: path.clone(),
                source: image::ImageError::IoError(e),
            })?
            .with_guessed_format()
            .map_err(|e| FaceReportError::ImageRead {
                path: path.clone(),
                source: image::ImageError::IoError(e),
            })?
            .decode()
            .map_err(|source| FaceReportError::ImageRead {
                path: path.clone(),
                source,
            })?;
        let pixels = decoded.to_rgb8();
        ensure_readable(&pixels)?;
        Ok(Self { path, pixels })
    }
}

pub(crate) fn ensure_readable<P: image::Pixel>(
    img: &image::ImageBuffer<P, Vec<P::Subpixel>>,
) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(FaceReportError::EmptyImage {
            width: img.width(),
            height: img.height(),
        });
    }
    Ok(())
}
