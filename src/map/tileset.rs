// src/map/tileset.rs
//! One full-coverage tile grid at a fixed zoom reference

use super::grid::{CellAddress, Direction, Extents, TileGrid};
use super::tile::Tile;
use crate::error::{MapError, Result};
use crate::view::viewport::ViewportState;

pub const DEFAULT_ZOOM_LEVEL: f64 = 100.0;
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// A grid of tiles covering the whole map for one zoom level.
///
/// Tile sizes and offsets are expressed in pixels at 100% display scale of
/// this tileset. Its display scale under a global zoom is
/// `global_zoom / zoom_level`, which is how detailed tilesets are projected
/// onto the shared map origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    grid: TileGrid,
    zoom_level: f64,
    tile_width: u32,
    tile_height: u32,
    offset_x: f64,
    offset_y: f64,
    index: usize,
    z_order: usize,
}

pub(crate) fn check_zoom_level(zoom_level: f64) -> Result<()> {
    if zoom_level.is_finite() && zoom_level > 0.0 {
        Ok(())
    } else {
        Err(MapError::InvalidGeometry(format!(
            "zoom level must be positive, got {}",
            zoom_level
        )))
    }
}

fn check_tile_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(MapError::InvalidGeometry(format!(
            "tile size must be positive, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn check_offset(x: f64, y: f64) -> Result<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(MapError::InvalidGeometry(format!("offset must be finite, got ({}, {})", x, y)))
    }
}

/// Whole tiles in a tile-unit coordinate. Values within float noise of a
/// boundary snap to it, so a cell's own corner maps back to that cell.
/// Non-finite and absurdly large values have no cell.
fn cell_index(tiles: f64) -> Option<i64> {
    const SNAP: f64 = 1e-9;
    const LIMIT: f64 = (1u64 << 52) as f64;
    if !tiles.is_finite() || tiles.abs() > LIMIT {
        return None;
    }
    let nearest = tiles.round();
    let index = if (tiles - nearest).abs() < SNAP * nearest.abs().max(1.0) {
        nearest
    } else {
        tiles.floor()
    };
    Some(index as i64)
}

impl Default for Tileset {
    fn default() -> Self {
        Self {
            grid: TileGrid::new(),
            zoom_level: DEFAULT_ZOOM_LEVEL,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            offset_x: 0.0,
            offset_y: 0.0,
            index: 0,
            z_order: 0,
        }
    }
}

impl Tileset {
    /// Empty 1x1 tileset with default tile geometry
    pub fn new(zoom_level: f64) -> Result<Self> {
        check_zoom_level(zoom_level)?;
        Ok(Self { zoom_level, ..Self::default() })
    }

    pub fn with_grid(mut self, grid: TileGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Result<Self> {
        self.set_tile_size(width, height)?;
        Ok(self)
    }

    pub fn with_offset(mut self, x: f64, y: f64) -> Result<Self> {
        self.set_offset(x, y)?;
        Ok(self)
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn extents(&self) -> Extents {
        self.grid.extents()
    }

    pub fn num_rows(&self) -> usize {
        self.grid.num_rows()
    }

    pub fn num_cols(&self) -> usize {
        self.grid.num_cols()
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Permanent position in the map's tileset list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Rank by ascending zoom level
    pub fn z_order(&self) -> usize {
        self.z_order
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_z_order(&mut self, z_order: usize) {
        self.z_order = z_order;
    }

    /// Changing the zoom level reorders tilesets, so this goes through
    /// [`MapData::set_tileset_zoom_level`](super::MapData::set_tileset_zoom_level).
    pub(crate) fn set_zoom_level(&mut self, zoom_level: f64) -> Result<()> {
        check_zoom_level(zoom_level)?;
        self.zoom_level = zoom_level;
        Ok(())
    }

    pub fn set_tile_size(&mut self, width: u32, height: u32) -> Result<()> {
        check_tile_size(width, height)?;
        self.tile_width = width;
        self.tile_height = height;
        Ok(())
    }

    pub fn set_offset(&mut self, x: f64, y: f64) -> Result<()> {
        check_offset(x, y)?;
        self.offset_x = x;
        self.offset_y = y;
        Ok(())
    }

    pub fn display_scale(&self, global_zoom: f64) -> f64 {
        global_zoom / self.zoom_level
    }

    /// On-screen tile size under the given global zoom
    pub fn scaled_tile_size(&self, global_zoom: f64) -> (f64, f64) {
        let scale = self.display_scale(global_zoom);
        (self.tile_width as f64 * scale, self.tile_height as f64 * scale)
    }

    // Grid operations

    pub fn tile_at(&self, row: usize, col: usize) -> Result<&Tile> {
        self.grid.tile_at(row, col)
    }

    pub fn set_tile(&mut self, row: usize, col: usize, tile: Tile) -> Result<Tile> {
        self.grid.set_tile(row, col, tile)
    }

    pub fn remove_tile(&mut self, row: usize, col: usize) -> Result<Tile> {
        self.grid.set_tile(row, col, Tile::Absent)
    }

    pub fn expand(&mut self, dir: Direction, amount: usize) -> Result<()> {
        self.grid.expand(dir, amount)
    }

    pub fn trim(&mut self) -> Extents {
        self.grid.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    // Coordinates

    /// Top-left corner of a cell, in this tileset's own 100%-scale pixels
    /// relative to the shared map origin.
    pub fn pixel_of(&self, row: usize, col: usize) -> Result<(f64, f64)> {
        let addr = self.grid.check(row as i64, col as i64)?;
        let (rel_row, rel_col) = self.grid.relative(addr);
        Ok((
            self.offset_x + rel_col as f64 * self.tile_width as f64,
            self.offset_y + rel_row as f64 * self.tile_height as f64,
        ))
    }

    /// Top-left corner of a cell in global map units (pixels at 100% global
    /// zoom), the same space markers live in.
    pub fn map_position_of(&self, row: usize, col: usize) -> Result<(f64, f64)> {
        let (x, y) = self.pixel_of(row, col)?;
        let factor = DEFAULT_ZOOM_LEVEL / self.zoom_level;
        Ok((x * factor, y * factor))
    }

    /// Screen position of the unclipped grid's top-left corner
    pub fn full_grid_position(&self, viewport: &ViewportState) -> (f64, f64) {
        let scale = self.display_scale(viewport.zoom);
        let (tile_w, tile_h) = self.scaled_tile_size(viewport.zoom);
        let extents = self.extents();
        (
            viewport.origin_x + self.offset_x * scale - tile_w * extents.west as f64,
            viewport.origin_y + self.offset_y * scale - tile_h * extents.north as f64,
        )
    }

    /// Screen position of a cell's top-left corner
    pub fn screen_of(&self, viewport: &ViewportState, row: usize, col: usize) -> Result<(f64, f64)> {
        let (x, y) = self.pixel_of(row, col)?;
        let scale = self.display_scale(viewport.zoom);
        Ok((viewport.origin_x + x * scale, viewport.origin_y + y * scale))
    }

    /// Cell under a screen point. Points outside the grid are an
    /// `InvalidAddress` error carrying the unclamped row/col; non-finite
    /// points report `i64::MIN` for the axis that has no cell.
    pub fn cell_at(&self, viewport: &ViewportState, screen_x: f64, screen_y: f64) -> Result<CellAddress> {
        let scale = self.display_scale(viewport.zoom);
        let local_x = (screen_x - viewport.origin_x) / scale - self.offset_x;
        let local_y = (screen_y - viewport.origin_y) / scale - self.offset_y;
        let rel_col = cell_index(local_x / self.tile_width as f64);
        let rel_row = cell_index(local_y / self.tile_height as f64);

        match (rel_row, rel_col) {
            (Some(rel_row), Some(rel_col)) => self.grid.absolute(rel_row, rel_col),
            _ => Err(MapError::InvalidAddress {
                row: rel_row.map_or(i64::MIN, |r| r.saturating_add(self.extents().north as i64)),
                col: rel_col.map_or(i64::MIN, |c| c.saturating_add(self.extents().west as i64)),
                num_rows: self.num_rows(),
                num_cols: self.num_cols(),
            }),
        }
    }

    /// Image file name of a cell, origin-relative so it survives growth
    pub fn tile_image_name(&self, row: usize, col: usize) -> Result<String> {
        let addr = self.grid.check(row as i64, col as i64)?;
        let (rel_row, rel_col) = self.grid.relative(addr);
        Ok(format!("{}_{}.webp", rel_row, rel_col))
    }
}
