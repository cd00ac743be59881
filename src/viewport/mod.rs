//! Pan/zoom transform for the media viewer and placement of OCR boxes on top of it.
//!
//! Boxes are never stored pre-transformed. The overlay layer is a child of the
//! same transformed container as the image and is sized to the natural pixel
//! dimensions, so percentages from [`project_box`] stay correct under any
//! scale or offset.

mod geom;

use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

pub use geom::{MIN_FONT_SIZE_PX, NORMALIZED_EXTENT, estimate_font_size, fit_to_container, project_box};

pub const MIN_SCALE: f64 = 0.05;
pub const MAX_BUTTON_SCALE: f64 = 5.0;
const WHEEL_STEP_RATIO: f64 = 0.1;
const BUTTON_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl NormalizedBBox {
    pub fn has_area(&self) -> bool {
        self.x1 - self.x0 > 0.0 && self.y1 - self.y0 > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub bbox: NormalizedBBox,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// Pointer position relative to the offset at the moment a drag started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragAnchor {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxPlacement {
    pub left_pct: f64,
    pub top_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBox {
    pub text: String,
    pub placement: BoxPlacement,
    pub font_size: f64,
}

pub fn zoom_for_wheel(delta_y: f64, current_scale: f64) -> f64 {
    let step = WHEEL_STEP_RATIO * current_scale;
    if delta_y < 0.0 {
        current_scale + step
    } else {
        (current_scale - step).max(MIN_SCALE)
    }
}

pub fn drag_anchor(pointer_x: f64, pointer_y: f64, current: Offset) -> DragAnchor {
    DragAnchor {
        x: pointer_x - current.x,
        y: pointer_y - current.y,
    }
}

pub fn drag_offset(pointer_x: f64, pointer_y: f64, anchor: DragAnchor) -> Offset {
    Offset {
        x: pointer_x - anchor.x,
        y: pointer_y - anchor.y,
    }
}

/// Places every renderable box; zero-area boxes are skipped, order is kept.
pub fn layout_overlay(boxes: &[DetectionBox], natural: NaturalSize) -> Vec<OverlayBox> {
    boxes
        .iter()
        .filter(|item| item.bbox.has_area())
        .map(|item| {
            let placement = project_box(&item.bbox);
            OverlayBox {
                text: item.text.clone(),
                placement,
                font_size: estimate_font_size(placement.height_pct, natural.height as f64),
            }
        })
        .collect()
}

/// Presentation state for the item currently shown in the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportState {
    pub scale: f64,
    pub offset: Offset,
    pub natural_size: Option<NaturalSize>,
    pub media: MediaKind,
    #[serde(skip)]
    drag: Option<DragAnchor>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Offset::default(),
            natural_size: None,
            media: MediaKind::Image,
            drag: None,
        }
    }
}

impl ViewportState {
    pub fn new(media: MediaKind) -> Self {
        Self {
            media,
            ..Self::default()
        }
    }

    pub fn reset(&mut self, media: MediaKind) {
        *self = Self::new(media);
    }

    /// Records the intrinsic size and fits the image when the container is laid out.
    pub fn media_loaded(&mut self, natural: NaturalSize, container: Option<(f64, f64)>) {
        self.natural_size = Some(natural);
        if let Some((container_w, container_h)) = container {
            if natural.width > 0 && natural.height > 0 {
                self.scale = fit_to_container(
                    natural.width as f64,
                    natural.height as f64,
                    container_w,
                    container_h,
                );
            }
        }
    }

    pub fn wheel(&mut self, delta_y: f64) {
        if !self.media.is_image() {
            return;
        }
        self.scale = zoom_for_wheel(delta_y, self.scale);
    }

    /// Toolbar zoom; the buttons are only offered for images.
    pub fn zoom_in(&mut self) {
        if !self.media.is_image() {
            return;
        }
        self.scale = (self.scale + BUTTON_STEP).min(MAX_BUTTON_SCALE);
    }

    pub fn zoom_out(&mut self) {
        if !self.media.is_image() {
            return;
        }
        self.scale = (self.scale - BUTTON_STEP).max(MIN_SCALE);
    }

    /// Returns false when dragging is not available for the current media.
    pub fn begin_drag(&mut self, pointer_x: f64, pointer_y: f64) -> bool {
        if !self.media.is_image() {
            return false;
        }
        self.drag = Some(drag_anchor(pointer_x, pointer_y, self.offset));
        true
    }

    pub fn drag_to(&mut self, pointer_x: f64, pointer_y: f64) {
        if let Some(anchor) = self.drag {
            self.offset = drag_offset(pointer_x, pointer_y, anchor);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn zoom_percent(&self) -> i64 {
        (self.scale * 100.0).round() as i64
    }

    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.offset.x, self.offset.y, self.scale
        )
    }

    /// `None` until the media reports its natural size.
    pub fn overlay(&self, boxes: &[DetectionBox]) -> Option<Vec<OverlayBox>> {
        self.natural_size
            .map(|natural| layout_overlay(boxes, natural))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(x0: f64, y0: f64, x1: f64, y1: f64, text: &str) -> DetectionBox {
        DetectionBox {
            bbox: NormalizedBBox { x0, y0, x1, y1 },
            text: text.to_string(),
        }
    }

    #[test]
    fn wheel_up_strictly_increases_scale() {
        let mut scale = 1.0;
        for _ in 0..20 {
            let next = zoom_for_wheel(-120.0, scale);
            assert!(next > scale);
            scale = next;
        }
    }

    #[test]
    fn wheel_down_decreases_but_respects_floor() {
        let mut scale = 1.0;
        for _ in 0..200 {
            let next = zoom_for_wheel(120.0, scale);
            assert!(next >= MIN_SCALE);
            if scale > MIN_SCALE {
                assert!(next < scale);
            }
            scale = next;
        }
        assert_eq!(scale, MIN_SCALE);
    }

    #[test]
    fn wheel_step_is_proportional_to_scale() {
        assert!((zoom_for_wheel(-1.0, 2.0) - 2.2).abs() < 1e-9);
        assert!((zoom_for_wheel(1.0, 2.0) - 1.8).abs() < 1e-9);
    }

    #[test]
    fn drag_moves_offset_by_pointer_delta() {
        let anchor = drag_anchor(100.0, 50.0, Offset { x: 10.0, y: -5.0 });
        assert_eq!(anchor, DragAnchor { x: 90.0, y: 55.0 });
        let offset = drag_offset(130.0, 40.0, anchor);
        assert_eq!(offset, Offset { x: 40.0, y: -15.0 });
    }

    #[test]
    fn zero_area_boxes_are_skipped() {
        let boxes = vec![
            detection(0.0, 0.0, 100.0, 100.0, "kept"),
            detection(200.0, 200.0, 200.0, 300.0, "no width"),
            detection(300.0, 300.0, 350.0, 250.0, "inverted"),
            detection(500.0, 500.0, 600.0, 510.0, "also kept"),
        ];
        let natural = NaturalSize { width: 800, height: 1000 };
        let overlay = layout_overlay(&boxes, natural);
        let texts: Vec<&str> = overlay.iter().map(|item| item.text.as_str()).collect();
        assert_eq!(texts, vec!["kept", "also kept"]);
        assert!((overlay[0].font_size - 65.0).abs() < 1e-9);
        assert_eq!(overlay[1].font_size, MIN_FONT_SIZE_PX);
    }

    #[test]
    fn overlay_waits_for_natural_size() {
        let mut state = ViewportState::default();
        let boxes = vec![detection(0.0, 0.0, 10.0, 10.0, "x")];
        assert!(state.overlay(&boxes).is_none());
        state.media_loaded(NaturalSize { width: 100, height: 100 }, None);
        assert_eq!(state.overlay(&boxes).map(|items| items.len()), Some(1));
        assert_eq!(state.scale, 1.0);
    }

    #[test]
    fn media_load_fits_into_container() {
        let mut state = ViewportState::default();
        state.media_loaded(
            NaturalSize { width: 1000, height: 500 },
            Some((500.0, 500.0)),
        );
        assert!((state.scale - 0.45).abs() < 1e-9);
    }

    #[test]
    fn non_image_media_ignores_gestures() {
        let mut state = ViewportState::new(MediaKind::Video);
        state.wheel(-100.0);
        assert_eq!(state.scale, 1.0);
        assert!(!state.begin_drag(10.0, 10.0));
        state.drag_to(50.0, 50.0);
        assert_eq!(state.offset, Offset::default());
        state.zoom_in();
        assert_eq!(state.scale, 1.0);
        state.zoom_out();
        assert_eq!(state.scale, 1.0);
    }

    #[test]
    fn audio_keeps_scale_on_toolbar_zoom() {
        let mut state = ViewportState::new(MediaKind::Audio);
        state.zoom_out();
        state.zoom_out();
        assert_eq!(state.scale, 1.0);
        assert_eq!(state.zoom_percent(), 100);
    }

    #[test]
    fn drag_session_updates_offset_until_released() {
        let mut state = ViewportState::default();
        assert!(state.begin_drag(10.0, 20.0));
        state.drag_to(30.0, 25.0);
        assert_eq!(state.offset, Offset { x: 20.0, y: 5.0 });
        state.end_drag();
        state.drag_to(100.0, 100.0);
        assert_eq!(state.offset, Offset { x: 20.0, y: 5.0 });
        assert!(!state.is_dragging());
    }

    #[test]
    fn buttons_clamp_scale() {
        let mut state = ViewportState::default();
        for _ in 0..100 {
            state.zoom_in();
        }
        assert_eq!(state.scale, MAX_BUTTON_SCALE);
        for _ in 0..100 {
            state.zoom_out();
        }
        assert_eq!(state.scale, MIN_SCALE);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = ViewportState::default();
        state.media_loaded(NaturalSize { width: 10, height: 10 }, Some((100.0, 100.0)));
        state.begin_drag(0.0, 0.0);
        state.drag_to(5.0, 5.0);
        state.reset(MediaKind::Audio);
        assert_eq!(state, ViewportState::new(MediaKind::Audio));
        assert_eq!(state.css_transform(), "translate(0px, 0px) scale(1)");
        assert_eq!(state.zoom_percent(), 100);
    }
}
