// src/view/viewport.rs
//! Pan/zoom state of the rendering surface

use crate::error::{MapError, Result};
use crate::map::tileset::{check_zoom_level, Tileset};

/// Everything culling and level-of-detail selection need to know about the
/// view: renderer size, where the shared map origin currently sits on screen,
/// and the global zoom in percent (100 = markers at native size).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub width: f64,
    pub height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub zoom: f64,
}

fn check_size(width: f64, height: f64) -> Result<()> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(MapError::InvalidGeometry(format!(
            "viewport must be positive, got {}x{}",
            width, height
        )))
    }
}

impl ViewportState {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        check_size(width, height)?;
        Ok(Self {
            width,
            height,
            origin_x: 0.0,
            origin_y: 0.0,
            zoom: 100.0,
        })
    }

    pub fn with_origin(mut self, origin_x: f64, origin_y: f64) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Result<Self> {
        self.set_zoom(zoom)?;
        Ok(self)
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        check_zoom_level(zoom)?;
        self.zoom = zoom;
        Ok(())
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        check_size(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.origin_x += dx;
        self.origin_y += dy;
    }

    /// Multiply the zoom by `factor`, keeping the map point under
    /// `(screen_x, screen_y)` fixed on screen.
    pub fn zoom_at(&mut self, factor: f64, screen_x: f64, screen_y: f64) -> Result<()> {
        let zoom = self.zoom * factor;
        check_zoom_level(zoom)?;

        // Scaling pivot is the origin: shift it so the pivot point stays put
        let pos_x = screen_x - self.origin_x;
        let pos_y = screen_y - self.origin_y;
        self.origin_x += pos_x * (1.0 - factor);
        self.origin_y += pos_y * (1.0 - factor);
        self.zoom = zoom;
        Ok(())
    }

    /// Put the map origin in the middle of the viewport
    pub fn recenter(&mut self) {
        self.origin_x = self.width / 2.0;
        self.origin_y = self.height / 2.0;
    }

    /// Show `tileset` at its native scale, centered in the viewport
    pub fn center_on(&mut self, tileset: &Tileset) {
        let extents = tileset.extents();
        self.zoom = tileset.zoom_level();
        self.origin_x = 0.5
            * (self.width - tileset.tile_width() as f64 * (extents.east as f64 - extents.west as f64));
        self.origin_y = 0.5
            * (self.height - tileset.tile_height() as f64 * (extents.south as f64 - extents.north as f64));
    }

    /// Screen point to global map coordinates (pixels at 100% zoom)
    pub fn screen_to_map(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        (
            (screen_x - self.origin_x) * 100.0 / self.zoom,
            (screen_y - self.origin_y) * 100.0 / self.zoom,
        )
    }

    pub fn map_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.origin_x + x * self.zoom / 100.0,
            self.origin_y + y * self.zoom / 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::grid::{Extents, TileGrid};

    #[test]
    fn test_rejects_empty_viewport() {
        assert!(ViewportState::new(0.0, 10.0).is_err());
        let mut view = ViewportState::new(10.0, 10.0).unwrap();
        assert!(view.resize(10.0, -1.0).is_err());
        assert!(view.set_zoom(0.0).is_err());
        assert_eq!(view.zoom, 100.0);
    }

    #[test]
    fn test_zoom_at_keeps_pivot_fixed() {
        let mut view = ViewportState::new(800.0, 600.0).unwrap().with_origin(100.0, 50.0);
        let before = view.screen_to_map(400.0, 300.0);
        view.zoom_at(1.25, 400.0, 300.0).unwrap();
        let after = view.screen_to_map(400.0, 300.0);
        assert_eq!(view.zoom, 125.0);
        assert!((before.0 - after.0).abs() < 1e-9);
        assert!((before.1 - after.1).abs() < 1e-9);
    }

    #[test]
    fn test_pan_moves_origin() {
        let mut view = ViewportState::new(800.0, 600.0).unwrap();
        view.pan(10.0, -5.0);
        view.pan(2.0, 2.0);
        assert_eq!((view.origin_x, view.origin_y), (12.0, -3.0));
    }

    #[test]
    fn test_center_on_tileset() {
        let grid = TileGrid::with_extents(Extents::new(1, 1, 1, 3).unwrap());
        let tileset = Tileset::new(25.0).unwrap().with_grid(grid).with_tile_size(100, 200).unwrap();
        let mut view = ViewportState::new(1000.0, 800.0).unwrap();
        view.center_on(&tileset);
        assert_eq!(view.zoom, 25.0);
        assert_eq!(view.origin_x, 0.5 * (1000.0 - 100.0 * 2.0));
        assert_eq!(view.origin_y, 400.0);
    }

    #[test]
    fn test_screen_map_conversion() {
        let view = ViewportState::new(800.0, 600.0)
            .unwrap()
            .with_origin(20.0, 40.0)
            .with_zoom(50.0)
            .unwrap();
        assert_eq!(view.map_to_screen(100.0, 200.0), (70.0, 140.0));
        assert_eq!(view.screen_to_map(70.0, 140.0), (100.0, 200.0));
    }
}
