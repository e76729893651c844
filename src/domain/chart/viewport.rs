use serde::{Deserialize, Serialize};

use super::value_objects::{PanOffset, PlotRect};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_STEP: f64 = 0.25;

/// Pixel size and paddings of the plot, as produced by the layout resolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotLayout {
    pub width: f64,
    pub height: f64,
    pub left_pad: f64,
    pub right_pad: f64,
    pub top_pad: f64,
    pub bottom_pad: f64,
}

impl PlotLayout {
    pub fn plot_rect(&self) -> PlotRect {
        PlotRect {
            left: self.left_pad,
            top: self.top_pad,
            right: self.width - self.right_pad,
            bottom: self.height - self.bottom_pad,
        }
    }

    pub fn plot_width(&self) -> f64 {
        (self.width - self.left_pad - self.right_pad).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.height - self.top_pad - self.bottom_pad).max(0.0)
    }

    /// Horizontal center of the plot area, the default zoom anchor
    pub fn center_x(&self) -> f64 {
        self.left_pad + self.plot_width() / 2.0
    }
}

impl Default for PlotLayout {
    fn default() -> Self {
        Self { width: 800.0, height: 400.0, left_pad: 40.0, right_pad: 40.0, top_pad: 40.0, bottom_pad: 40.0 }
    }
}

/// Value Object - pixel geometry the domain is projected onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub layout: PlotLayout,
    pub zoom: f64,
    pub pan_offset: PanOffset,
}

impl Viewport {
    pub fn new(layout: PlotLayout) -> Self {
        Self { layout, zoom: 1.0, pan_offset: PanOffset::default() }
    }

    pub fn plot_rect(&self) -> PlotRect {
        self.layout.plot_rect()
    }

    /// Apply the zoom/pan affine transform to a pre-zoom x
    pub fn transform_x(&self, x: f64) -> f64 {
        x * self.zoom + self.pan_offset.x
    }

    pub fn inverse_transform_x(&self, x: f64) -> f64 {
        (x - self.pan_offset.x) / self.zoom
    }
}

/// Owns zoom factor and pan offset.
///
/// Zooming around an anchor pixel `cx` rescales the pan as
/// `pan' = (pan - cx) * (z_new / z_old) + cx`, so the content under `cx` stays put.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomController {
    zoom: f64,
    pan_offset: PanOffset,
    step: f64,
}

impl Default for ZoomController {
    fn default() -> Self {
        Self::new(ZOOM_STEP)
    }
}

impl ZoomController {
    pub fn new(step: f64) -> Self {
        let step = if step.is_finite() && step > 0.0 { step } else { ZOOM_STEP };
        Self { zoom: 1.0, pan_offset: PanOffset::default(), step }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan_offset(&self) -> PanOffset {
        self.pan_offset
    }

    pub fn zoom_in(&mut self, anchor_x: f64) -> bool {
        self.set_zoom(self.zoom + self.step, anchor_x)
    }

    pub fn zoom_out(&mut self, anchor_x: f64) -> bool {
        self.set_zoom(self.zoom - self.step, anchor_x)
    }

    /// Set zoom (clamped to `0.5..=4.0`) keeping `anchor_x` visually fixed.
    /// Returns whether the zoom changed.
    pub fn set_zoom(&mut self, zoom: f64, anchor_x: f64) -> bool {
        if !zoom.is_finite() || !anchor_x.is_finite() {
            return false;
        }
        let new_zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let old_zoom = self.zoom;
        if new_zoom == old_zoom {
            return false;
        }

        self.pan_offset.x = (self.pan_offset.x - anchor_x) * (new_zoom / old_zoom) + anchor_x;
        self.zoom = new_zoom;
        true
    }

    /// Drag pan, composed into the same `x * zoom + pan` transform
    pub fn pan_by(&mut self, dx: f64) {
        if dx.is_finite() {
            self.pan_offset.x += dx;
        }
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_offset = PanOffset::default();
    }

    pub fn viewport(&self, layout: PlotLayout) -> Viewport {
        Viewport { layout, zoom: self.zoom, pan_offset: self.pan_offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_steps_are_clamped() {
        let mut zoom = ZoomController::default();
        for _ in 0..20 {
            zoom.zoom_in(400.0);
        }
        assert_eq!(zoom.zoom(), MAX_ZOOM);
        assert!(!zoom.zoom_in(400.0));
        for _ in 0..20 {
            zoom.zoom_out(400.0);
        }
        assert_eq!(zoom.zoom(), MIN_ZOOM);
    }

    #[test]
    fn anchor_stays_fixed() {
        let mut zoom = ZoomController::default();
        zoom.pan_by(-30.0);
        let layout = PlotLayout::default();
        let anchor = layout.center_x();

        let before = zoom.viewport(layout);
        let content_x = before.inverse_transform_x(anchor);
        zoom.zoom_in(anchor);
        let after = zoom.viewport(layout);

        assert!((after.transform_x(content_x) - anchor).abs() < 1e-9);
    }

    #[test]
    fn reset_restores_identity() {
        let mut zoom = ZoomController::default();
        zoom.zoom_in(10.0);
        zoom.pan_by(55.0);
        zoom.reset();
        assert_eq!(zoom.zoom(), 1.0);
        assert_eq!(zoom.pan_offset(), PanOffset::default());
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut zoom = ZoomController::default();
        assert!(!zoom.set_zoom(f64::NAN, 0.0));
        zoom.pan_by(f64::INFINITY);
        assert_eq!(zoom.pan_offset().x, 0.0);
    }
}
