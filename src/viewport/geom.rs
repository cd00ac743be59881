use super::{BoxPlacement, NormalizedBBox};

/// Units on each axis of the normalized OCR coordinate space.
pub const NORMALIZED_EXTENT: f64 = 1000.0;

pub const MIN_FONT_SIZE_PX: f64 = 10.0;
const FONT_HEIGHT_RATIO: f64 = 0.65;
const FIT_MARGIN: f64 = 0.9;

pub fn project_box(bbox: &NormalizedBBox) -> BoxPlacement {
    BoxPlacement {
        left_pct: to_percent(bbox.x0),
        top_pct: to_percent(bbox.y0),
        width_pct: to_percent(bbox.x1 - bbox.x0),
        height_pct: to_percent(bbox.y1 - bbox.y0),
    }
}

/// The 0.65 factor is an empirical fit-to-box ratio; the 10px floor is a contract.
pub fn estimate_font_size(height_pct: f64, natural_height: f64) -> f64 {
    let pixel_height = height_pct / 100.0 * natural_height;
    (pixel_height * FONT_HEIGHT_RATIO).max(MIN_FONT_SIZE_PX)
}

pub fn fit_to_container(
    natural_w: f64,
    natural_h: f64,
    container_w: f64,
    container_h: f64,
) -> f64 {
    let fit = (container_w / natural_w).min(container_h / natural_h) * FIT_MARGIN;
    // NaN (0/0) fails the comparison and falls back too.
    if fit > 0.0 && fit.is_finite() {
        fit
    } else {
        1.0
    }
}

fn to_percent(value: f64) -> f64 {
    value / NORMALIZED_EXTENT * 100.0
}
