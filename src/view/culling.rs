// src/view/culling.rs
//! Viewport culling: which part of a grid must exist on screen
//!
//! Grids can be far larger than the screen, so only the sub-rectangle of
//! cells that can intersect the viewport is ever materialized. Pan and zoom
//! updates that land on the same rectangle only move/scale it.

use crate::map::grid::CellAddress;
use crate::map::tileset::Tileset;
use crate::view::viewport::ViewportState;

/// Rectangle of grid cells plus the screen position of its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderArea {
    pub first_row: usize,
    pub num_rows: usize,
    pub first_col: usize,
    pub num_cols: usize,
    pub screen_x: f64,
    pub screen_y: f64,
}

impl RenderArea {
    /// Same cells, regardless of where they sit on screen
    pub fn same_cells(&self, other: &RenderArea) -> bool {
        self.first_row == other.first_row
            && self.num_rows == other.num_rows
            && self.first_col == other.first_col
            && self.num_cols == other.num_cols
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        addr.row >= self.first_row
            && addr.row < self.first_row + self.num_rows
            && addr.col >= self.first_col
            && addr.col < self.first_col + self.num_cols
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.num_cols == 0
    }

    pub fn cell_count(&self) -> usize {
        self.num_rows * self.num_cols
    }

    /// Row-major iteration over the covered cells
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> {
        let (first_row, first_col, num_cols) = (self.first_row, self.first_col, self.num_cols);
        (first_row..first_row + self.num_rows)
            .flat_map(move |row| (first_col..first_col + num_cols).map(move |col| CellAddress::new(row, col)))
    }
}

/// First visible index, visible count and on-screen start along one axis
fn visible_span(full_pos: f64, scaled_tile: f64, viewport_size: f64, total: usize) -> (usize, usize, f64) {
    let skipped = if full_pos < 0.0 {
        (-full_pos / scaled_tile).floor()
    } else {
        0.0
    };
    // Float-to-int casts saturate, the min keeps grids scrolled past the
    // screen's leading edge inside bounds
    let first = (skipped as usize).min(total);
    let screen_pos = full_pos + first as f64 * scaled_tile;

    let wanted = ((viewport_size - screen_pos) / scaled_tile).ceil();
    let wanted = if wanted > 0.0 { wanted as usize } else { 0 };
    (first, wanted.min(total - first), screen_pos)
}

/// Minimal rectangle of `tileset` cells that can intersect the viewport.
pub fn compute_render_area(tileset: &Tileset, viewport: &ViewportState) -> RenderArea {
    let (full_x, full_y) = tileset.full_grid_position(viewport);
    let (tile_w, tile_h) = tileset.scaled_tile_size(viewport.zoom);

    let (first_col, num_cols, screen_x) = visible_span(full_x, tile_w, viewport.width, tileset.num_cols());
    let (first_row, num_rows, screen_y) = visible_span(full_y, tile_h, viewport.height, tileset.num_rows());

    RenderArea {
        first_row,
        num_rows,
        first_col,
        num_cols,
        screen_x,
        screen_y,
    }
}

/// What the renderer has to do to show a freshly computed area
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderUpdate {
    /// Cell bounds changed: release the old rectangle and build this one
    Rebuild(RenderArea),
    /// Same cells: only move/scale the existing rectangle
    Reposition(RenderArea),
}

impl RenderUpdate {
    pub fn area(&self) -> &RenderArea {
        match self {
            RenderUpdate::Rebuild(area) | RenderUpdate::Reposition(area) => area,
        }
    }

    pub fn is_rebuild(&self) -> bool {
        matches!(self, RenderUpdate::Rebuild(_))
    }
}

/// Compare against the materialized rectangle, if any. `force` rebuilds
/// regardless, for edits that change cell content or indexing.
pub fn plan_update(materialized: Option<&RenderArea>, next: RenderArea, force: bool) -> RenderUpdate {
    match materialized {
        Some(current) if !force && current.same_cells(&next) => RenderUpdate::Reposition(next),
        _ => RenderUpdate::Rebuild(next),
    }
}
