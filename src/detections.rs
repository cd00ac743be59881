use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::viewport::{DetectionBox, NormalizedBBox};

#[derive(Debug, Deserialize)]
struct RawDetection {
    bbox: RawBBox,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBBox {
    x0: Value,
    y0: Value,
    x1: Value,
    y1: Value,
}

pub fn load_detections(path: &Path) -> Result<Vec<DetectionBox>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read detections: {}", path.display()))?;
    parse_detections(&content)
        .with_context(|| format!("failed to parse detections: {}", path.display()))
}

/// Parses the OCR collaborator's box list. Coordinates may arrive as numbers
/// or as numeric strings.
pub fn parse_detections(content: &str) -> Result<Vec<DetectionBox>> {
    let raw: Vec<RawDetection> =
        serde_json::from_str(content).with_context(|| "detections must be a JSON array")?;
    convert(raw)
}

/// Same as [`parse_detections`] for a list already decoded from a request body.
pub fn detections_from_value(value: Value) -> Result<Vec<DetectionBox>> {
    let raw: Vec<RawDetection> =
        serde_json::from_value(value).with_context(|| "detections must be a JSON array")?;
    convert(raw)
}

fn convert(raw: Vec<RawDetection>) -> Result<Vec<DetectionBox>> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let bbox = NormalizedBBox {
                x0: coordinate(&item.bbox.x0, idx, "x0")?,
                y0: coordinate(&item.bbox.y0, idx, "y0")?,
                x1: coordinate(&item.bbox.x1, idx, "x1")?,
                y1: coordinate(&item.bbox.y1, idx, "y1")?,
            };
            Ok(DetectionBox {
                bbox,
                text: item.text.unwrap_or_default(),
            })
        })
        .collect()
}

fn coordinate(value: &Value, idx: usize, name: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|value| value.is_finite())
        .ok_or_else(|| anyhow!("detection {} has invalid {} coordinate: {}", idx, name, value))
}
