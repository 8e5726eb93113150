// src/display/mod.rs
//! Rendering collaborators: the renderer and tile image resolution
//!
//! The engine computes what must be on screen; implementations of these
//! traits own whatever presentation objects that takes.

pub mod terminal;

use crate::map::{CellAddress, MarkerIcon, Tileset};
use crate::view::culling::RenderArea;
use crate::view::overlay::OverlayTransform;
use std::path::PathBuf;

/// What a materialized cell shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    Image(String),
    /// No tile yet: an upload slot while editing
    Empty,
}

/// A rectangle of cells to build, row-major `cells`
#[derive(Debug, Clone, PartialEq)]
pub struct Materialize {
    pub tileset: usize,
    pub area: RenderArea,
    pub tile_width: u32,
    pub tile_height: u32,
    pub cells: Vec<CellContent>,
}

/// Screen placement of a materialized rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub scale: f64,
    pub z_order: usize,
    pub current: bool,
}

/// Trait for renderer implementations
pub trait TileRenderer {
    /// Build a new rectangle for a tileset. Any previous one has already
    /// been released.
    fn materialize(&mut self, request: Materialize);

    /// Move/scale an existing rectangle without rebuilding it
    fn place(&mut self, tileset: usize, placement: &Placement);

    /// Drop every rendering resource held for a tileset
    fn release(&mut self, tileset: usize);

    /// Redraw one cell inside the materialized rectangle
    fn refresh_cell(&mut self, tileset: usize, addr: CellAddress, content: CellContent);

    /// Move/scale the marker layer. `rescale_markers` is set when the
    /// per-marker inverse scale changed.
    fn apply_overlay(&mut self, transform: &OverlayTransform, rescale_markers: bool);

    /// Show/hide an icon's layer, (re)building its markers if needed
    fn sync_layer(&mut self, icon: &MarkerIcon, visible: bool);

    /// Drop an icon's layer; layers after it shift down by one
    fn remove_layer(&mut self, icon: usize);
}

/// Maps a cell to a displayable image reference
pub trait ImageResolver {
    fn tile_image(&self, tileset: &Tileset, addr: CellAddress) -> Option<String>;
}

/// Tile images laid out as `<root>/<map>/<tileset index>/<row>_<col>.webp`
#[derive(Debug, Clone)]
pub struct DirectoryImages {
    root: PathBuf,
    map_name: String,
}

impl DirectoryImages {
    pub fn new(root: impl Into<PathBuf>, map_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            map_name: map_name.into(),
        }
    }
}

impl ImageResolver for DirectoryImages {
    fn tile_image(&self, tileset: &Tileset, addr: CellAddress) -> Option<String> {
        let tile = tileset.tile_at(addr.row, addr.col).ok()?;
        if !tile.is_present() {
            return None;
        }
        // Uploaded-but-unsaved tiles show their local image
        if let Some(src) = tile.local_src() {
            return Some(src.to_string());
        }
        let name = tileset.tile_image_name(addr.row, addr.col).ok()?;
        let path = self
            .root
            .join(&self.map_name)
            .join(tileset.index().to_string())
            .join(name);
        Some(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Direction, MapData, Tile};

    #[test]
    fn test_directory_images() {
        let mut map = MapData::new();
        let index = map.create_tileset(400.0).unwrap();
        let tileset = map.tileset_mut(index).unwrap();
        tileset.expand(Direction::North, 1).unwrap();
        tileset.expand(Direction::East, 1).unwrap();
        tileset.set_tile(0, 1, Tile::present()).unwrap();
        tileset.set_tile(1, 0, Tile::local("blob:abc")).unwrap();

        let images = DirectoryImages::new("data", "world");
        let tileset = map.tileset(index).unwrap();
        assert_eq!(
            images.tile_image(tileset, CellAddress::new(0, 1)),
            Some(PathBuf::from("data/world/1/-1_1.webp").to_string_lossy().into_owned())
        );
        assert_eq!(images.tile_image(tileset, CellAddress::new(1, 0)), Some("blob:abc".to_string()));
        assert_eq!(images.tile_image(tileset, CellAddress::new(1, 1)), None);
        assert_eq!(images.tile_image(tileset, CellAddress::new(9, 9)), None);
    }
}
