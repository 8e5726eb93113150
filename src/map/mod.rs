// src/map/mod.rs
//! Map data: tilesets, marker icons and their bookkeeping

pub mod grid;
pub mod markers;
pub mod tile;
pub mod tileset;

pub use grid::{CellAddress, Direction, Extents, TileGrid};
pub use markers::{IconGeometry, Marker, MarkerIcon};
pub use tile::Tile;
pub use tileset::Tileset;

use crate::error::{MapError, Result};
use tracing::info;

pub const DEFAULT_BG_COLOR: &str = "#111";

/// A complete map: tilesets covering the same area at different zoom
/// levels, plus marker icon types.
///
/// A tileset's index is permanent because tile images are stored by it, so
/// tilesets are only ever appended or removed from the tail. Icon indices
/// carry no external meaning and are compacted on removal.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    tilesets: Vec<Tileset>,
    icons: Vec<MarkerIcon>,
    bg_color: String,
    overview: Option<usize>,
}

impl Default for MapData {
    fn default() -> Self {
        Self::new()
    }
}

impl MapData {
    /// New map with a single default tileset
    pub fn new() -> Self {
        Self::with_tileset(Tileset::default())
    }

    pub fn with_tileset(tileset: Tileset) -> Self {
        Self::from_parts(vec![tileset], Vec::new(), DEFAULT_BG_COLOR)
    }

    /// Assemble a map, assigning indices in list order
    pub fn from_parts(tilesets: Vec<Tileset>, icons: Vec<MarkerIcon>, bg_color: impl Into<String>) -> Self {
        let mut map = Self {
            tilesets,
            icons,
            bg_color: bg_color.into(),
            overview: None,
        };
        for (index, tileset) in map.tilesets.iter_mut().enumerate() {
            tileset.set_index(index);
        }
        for (index, icon) in map.icons.iter_mut().enumerate() {
            icon.set_index(index);
        }
        map.update_tileset_order();
        map
    }

    // Tilesets

    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    pub fn tileset(&self, index: usize) -> Result<&Tileset> {
        self.tilesets.get(index).ok_or(MapError::UnknownTileset(index))
    }

    /// Grid and geometry edits. Zoom level changes go through
    /// [`set_tileset_zoom_level`](Self::set_tileset_zoom_level).
    pub fn tileset_mut(&mut self, index: usize) -> Result<&mut Tileset> {
        self.tilesets.get_mut(index).ok_or(MapError::UnknownTileset(index))
    }

    /// Tileset with the lowest zoom level, always kept visible
    pub fn overview(&self) -> Option<&Tileset> {
        self.overview.map(|index| &self.tilesets[index])
    }

    pub fn overview_index(&self) -> Option<usize> {
        self.overview
    }

    /// Rank tilesets by ascending zoom level (ties keep index order) and
    /// refresh the overview.
    pub fn update_tileset_order(&mut self) {
        let mut sorted: Vec<usize> = (0..self.tilesets.len()).collect();
        sorted.sort_by(|&a, &b| self.tilesets[a].zoom_level().total_cmp(&self.tilesets[b].zoom_level()));
        for (z_order, &index) in sorted.iter().enumerate() {
            self.tilesets[index].set_z_order(z_order);
        }
        self.overview = sorted.first().copied();
    }

    pub fn create_tileset(&mut self, zoom_level: f64) -> Result<usize> {
        let mut tileset = Tileset::new(zoom_level)?;
        let index = self.tilesets.len();
        tileset.set_index(index);
        self.tilesets.push(tileset);
        self.update_tileset_order();
        info!(index, zoom_level, "created tileset");
        Ok(index)
    }

    pub fn set_tileset_zoom_level(&mut self, index: usize, zoom_level: f64) -> Result<()> {
        self.tileset_mut(index)?.set_zoom_level(zoom_level)?;
        self.update_tileset_order();
        Ok(())
    }

    /// Drop empty tilesets from the tail of the list, returning the removed
    /// indices. Stops at the first non-empty tileset and never removes the
    /// first one, so a map always keeps at least one tileset.
    pub fn cull_empty_tilesets(&mut self) -> Vec<usize> {
        let mut removed = Vec::new();
        while self.tilesets.len() > 1 && self.tilesets.last().map_or(false, |t| t.is_empty()) {
            self.tilesets.pop();
            removed.push(self.tilesets.len());
        }
        if !removed.is_empty() {
            self.update_tileset_order();
            info!(?removed, "culled empty tilesets");
        }
        removed
    }

    // Icons and markers

    pub fn icons(&self) -> &[MarkerIcon] {
        &self.icons
    }

    pub fn icon(&self, index: usize) -> Result<&MarkerIcon> {
        self.icons.get(index).ok_or(MapError::UnknownIcon(index))
    }

    pub fn icon_mut(&mut self, index: usize) -> Result<&mut MarkerIcon> {
        self.icons.get_mut(index).ok_or(MapError::UnknownIcon(index))
    }

    pub fn create_icon(&mut self, mut icon: MarkerIcon) -> usize {
        let index = self.icons.len();
        icon.set_index(index);
        icon.set_enabled(true);
        self.icons.push(icon);
        index
    }

    /// Remove an icon and its markers, shifting later icons down by one
    pub fn remove_icon(&mut self, index: usize) -> Result<MarkerIcon> {
        if index >= self.icons.len() {
            return Err(MapError::UnknownIcon(index));
        }
        let removed = self.icons.remove(index);
        for (i, icon) in self.icons.iter_mut().enumerate().skip(index) {
            icon.set_index(i);
        }
        Ok(removed)
    }

    pub fn create_marker(&mut self, icon: usize, x: f64, y: f64) -> Result<usize> {
        Ok(self.icon_mut(icon)?.add_marker(Marker::new(x, y)))
    }

    pub fn remove_marker(&mut self, icon: usize, marker: usize) -> Result<Marker> {
        self.icon_mut(icon)?.remove_marker(marker)
    }

    // Appearance

    pub fn bg_color(&self) -> &str {
        &self.bg_color
    }

    pub fn set_bg_color(&mut self, color: impl Into<String>) {
        self.bg_color = color.into();
    }

    /// Background as RGB, `None` unless it is `#rgb` or `#rrggbb`
    pub fn bg_rgb(&self) -> Option<(u8, u8, u8)> {
        parse_hex_color(&self.bg_color)
    }

    /// Text color readable on the background: black on bright
    /// backgrounds, white otherwise (also for unparseable colors)
    pub fn foreground_color(&self) -> &'static str {
        match self.bg_rgb() {
            Some((r, g, b)) if r as u32 + g as u32 + b as u32 > 500 => "#000",
            _ => "#fff",
        }
    }
}

/// Parse `#rgb` or `#rrggbb`
fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut it = hex.chars().map(|c| channel(&c.to_string()).map(|v| v * 17));
            Some((it.next()??, it.next()??, it.next()??))
        }
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        _ => None,
    }
}
