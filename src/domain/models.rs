use crate::domain::constants::{CORE_IMAGE_KEYS, DEBUG_IMAGE_PREFIX};
use crate::domain::errors::{ImageSlot, ValidationError};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Self-reported gender sent with each analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Nonbinary,
    #[value(alias = "prefer_not_to_say")]
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Nonbinary => "nonbinary",
            Gender::PreferNotToSay => "prefer_not_to_say",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// A user-selected photograph. The bytes are shared, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
    pub file_name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl ImageBlob {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Position expressed as fractions of an image's rendered width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// False for NaN components as well as anything outside [0, 1].
    pub fn within_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// Form state before both images have been chosen.
#[derive(Debug, Clone, Default)]
pub struct InputDraft {
    pub front: Option<ImageBlob>,
    pub side: Option<ImageBlob>,
    pub gender: Gender,
}

impl InputDraft {
    pub fn to_input(&self) -> Result<AnalysisInput, ValidationError> {
        let front = self
            .front
            .clone()
            .ok_or(ValidationError::MissingImage(ImageSlot::Front))?;
        let side = self
            .side
            .clone()
            .ok_or(ValidationError::MissingImage(ImageSlot::Side))?;
        if front.is_empty() {
            return Err(ValidationError::EmptyImage(ImageSlot::Front));
        }
        if side.is_empty() {
            return Err(ValidationError::EmptyImage(ImageSlot::Side));
        }
        Ok(AnalysisInput {
            front,
            side,
            gender: self.gender,
            override_point: None,
        })
    }
}

/// Everything one request to the analysis service carries.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInput {
    pub front: ImageBlob,
    pub side: ImageBlob,
    pub gender: Gender,
    pub override_point: Option<NormalizedPoint>,
}

impl AnalysisInput {
    pub fn with_override(&self, point: NormalizedPoint) -> Self {
        Self {
            override_point: Some(point),
            ..self.clone()
        }
    }

    pub fn without_override(&self) -> Self {
        Self {
            override_point: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub label: String,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub pixel: Option<Point2D>,
    #[serde(default)]
    pub normalized: Option<Point3D>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: String,
    pub label: String,
    pub image: String,
    #[serde(default)]
    pub points: Vec<String>,
    pub value: Option<f64>,
    pub unit: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    pub id: String,
    pub numerator: String,
    pub denominator: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Response of the analysis service.
///
/// `annotated_images` is open-ended: besides the core variants the service may add any number
/// of debug renderings, so it is kept as a map rather than a fixed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ok: bool,
    pub all_landmarks_count: u32,
    pub gender: Option<String>,
    pub mandatory_landmarks: Vec<Landmark>,
    pub measurements: Vec<Measurement>,
    pub ratios: Vec<Ratio>,
    pub annotated_images: BTreeMap<String, String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl AnalysisResult {
    pub fn missing_core_images(&self) -> Vec<&'static str> {
        CORE_IMAGE_KEYS
            .iter()
            .copied()
            .filter(|k| !self.annotated_images.contains_key(*k))
            .collect()
    }

    /// Debug-only renderings with a non-empty reference, in key order.
    pub fn debug_images(&self) -> impl Iterator<Item = (&str, &str)> {
        self.annotated_images
            .iter()
            .filter(|(k, v)| k.starts_with(DEBUG_IMAGE_PREFIX) && !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn missing_landmarks(&self) -> Vec<&str> {
        self.mandatory_landmarks
            .iter()
            .filter(|l| l.pixel.is_none())
            .map(|l| l.label.as_str())
            .collect()
    }
}

#[derive(Serialize)]
pub struct ResultReport<'a> {
    pub state: &'static str,
    pub offers_override: bool,
    pub debug_images: Vec<&'a str>,
    pub missing_landmarks: Vec<&'a str>,
    pub result: &'a AnalysisResult,
}

#[derive(Serialize)]
pub struct NormalizeReport {
    pub x: f64,
    pub y: f64,
    pub within_image: bool,
}

#[derive(Serialize)]
pub struct GateReport {
    pub offers_override: bool,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthReport {
    pub api_url: String,
    pub ok: bool,
}

#[derive(Serialize)]
pub struct SessionEvent {
    pub event: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offers_override: Option<bool>,
}
