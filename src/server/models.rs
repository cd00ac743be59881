use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::DiffOutcome;
use crate::instructions::{InstructionKind, Preset, StudioTab};
use crate::media::MediaKind;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct DiffRequest {
    pub(crate) original: Option<String>,
    pub(crate) corrected: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DiffResponse {
    pub(crate) outcome: DiffOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) markers: Option<String>,
    pub(crate) annotated: String,
    pub(crate) changed: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtractRequest {
    pub(crate) text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FitRequest {
    pub(crate) natural_width: f64,
    pub(crate) natural_height: f64,
    pub(crate) container_width: f64,
    pub(crate) container_height: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WheelRequest {
    pub(crate) scale: f64,
    pub(crate) delta_y: f64,
    #[serde(default)]
    pub(crate) media: Option<MediaKind>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScaleResponse {
    pub(crate) scale: f64,
    pub(crate) zoom_percent: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectRequest {
    pub(crate) natural_width: u32,
    pub(crate) natural_height: u32,
    pub(crate) boxes: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct InstructionsResponse {
    pub(crate) media: MediaKind,
    pub(crate) kind: InstructionKind,
    pub(crate) instruction: String,
    pub(crate) presets: Vec<Preset>,
    pub(crate) tabs: Vec<StudioTab>,
    pub(crate) auto_tabs: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
