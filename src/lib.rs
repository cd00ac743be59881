use std::path::PathBuf;

pub mod detections;
pub mod diff;
pub mod export;
pub mod extract;
pub mod instructions;
pub mod logging;
pub mod media;
pub mod overlay;
mod paths;
pub mod server;
pub mod settings;
#[cfg(test)]
mod test_util;
mod text;
pub mod viewport;

pub use diff::{DiffOutcome, DiffToken};
pub use extract::{ExtractedPayload, extract_json};
pub use media::MediaKind;
pub use settings::Settings;
pub use viewport::{
    BoxPlacement, DetectionBox, NaturalSize, NormalizedBBox, Offset, OverlayBox, ViewportState,
};

/// Where exported documents land when no output path is given.
pub fn default_export_dir() -> PathBuf {
    paths::export_dir()
}
