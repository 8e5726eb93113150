// src/view/overlay.rs
//! Marker overlay kept in lockstep with the global pan/zoom
//!
//! Markers are never repositioned individually. The whole overlay layer sits
//! on the map origin and is scaled by the global zoom, so panning is a single
//! layer move. Each marker carries the inverse scale to keep a constant
//! on-screen size, which only needs touching when the zoom changes.

use crate::map::markers::Marker;
use crate::view::viewport::ViewportState;

/// Transform applied to the overlay layer and, inversely, to its markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTransform {
    pub left: f64,
    pub top: f64,
    /// Layer scale in percent
    pub layer_scale: f64,
    /// Per-marker scale factor cancelling the layer scale
    pub marker_scale: f64,
}

impl OverlayTransform {
    pub fn from_viewport(viewport: &ViewportState) -> Self {
        Self {
            left: viewport.origin_x,
            top: viewport.origin_y,
            layer_scale: viewport.zoom,
            marker_scale: 100.0 / viewport.zoom,
        }
    }

    /// Where the marker's anchor lands on screen
    pub fn marker_screen_position(&self, marker: &Marker) -> (f64, f64) {
        (
            self.left + marker.x * self.layer_scale / 100.0,
            self.top + marker.y * self.layer_scale / 100.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayUpdate {
    pub transform: OverlayTransform,
    /// Zoom changed since the last sync: marker inverse scales need updating
    pub rescale_markers: bool,
}

/// Remembers the zoom the markers were last scaled for
#[derive(Debug, Clone, Default)]
pub struct OverlaySync {
    last_zoom: Option<f64>,
}

impl OverlaySync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, viewport: &ViewportState) -> OverlayUpdate {
        let rescale_markers = self.last_zoom != Some(viewport.zoom);
        self.last_zoom = Some(viewport.zoom);
        OverlayUpdate {
            transform: OverlayTransform::from_viewport(viewport),
            rescale_markers,
        }
    }

    /// Force the next sync to rescale, e.g. after markers were rebuilt
    pub fn invalidate(&mut self) {
        self.last_zoom = None;
    }
}
