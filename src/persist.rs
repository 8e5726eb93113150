// src/persist.rs
//! JSON map documents
//!
//! Only durable facts are stored: extents, geometry, tile presence and
//! markers. Render state and local tile images are never written.

use crate::error::{MapError, Result};
use crate::map::{Extents, IconGeometry, MapData, Marker, MarkerIcon, Tile, TileGrid, Tileset, DEFAULT_BG_COLOR};
use crate::map::tileset::{DEFAULT_TILE_SIZE, DEFAULT_ZOOM_LEVEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MAP_FILE_NAME: &str = "data.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapDocument {
    pub bg_color: String,
    pub tilesets: Vec<TilesetDocument>,
    pub icons: Vec<IconDocument>,
}

impl Default for MapDocument {
    fn default() -> Self {
        Self {
            bg_color: DEFAULT_BG_COLOR.to_string(),
            tilesets: Vec::new(),
            icons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TilesetDocument {
    pub size_n: usize,
    pub size_s: usize,
    pub size_w: usize,
    pub size_e: usize,
    pub zoom_level: f64,
    pub tile_width: u32,
    pub tile_height: u32,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Row-major presence flags, 1 = tile present
    pub grid: Vec<Vec<u8>>,
}

impl Default for TilesetDocument {
    fn default() -> Self {
        let extents = Extents::default();
        Self {
            size_n: extents.north,
            size_s: extents.south,
            size_w: extents.west,
            size_e: extents.east,
            zoom_level: DEFAULT_ZOOM_LEVEL,
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            offset_x: 0.0,
            offset_y: 0.0,
            grid: Vec::new(),
        }
    }
}

impl TilesetDocument {
    pub fn from_tileset(tileset: &Tileset) -> Self {
        let extents = tileset.extents();
        let (offset_x, offset_y) = tileset.offset();
        let grid = tileset
            .grid()
            .rows()
            .map(|row| row.iter().map(|tile| u8::from(tile.is_present())).collect())
            .collect();
        Self {
            size_n: extents.north,
            size_s: extents.south,
            size_w: extents.west,
            size_e: extents.east,
            zoom_level: tileset.zoom_level(),
            tile_width: tileset.tile_width(),
            tile_height: tileset.tile_height(),
            offset_x,
            offset_y,
            grid,
        }
    }

    pub fn into_tileset(self) -> Result<Tileset> {
        let extents = Extents::new(self.size_n, self.size_s, self.size_w, self.size_e)?;
        let rows = self
            .grid
            .into_iter()
            .map(|row| row.into_iter().map(|flag| Tile::from_flag(flag != 0)).collect())
            .collect();
        let grid = TileGrid::from_rows(extents, rows)?;
        Tileset::new(self.zoom_level)?
            .with_grid(grid)
            .with_tile_size(self.tile_width, self.tile_height)?
            .with_offset(self.offset_x, self.offset_y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IconDocument {
    pub image_uri: String,
    pub name: String,
    pub size_x: String,
    pub size_y: String,
    pub offset_x: String,
    pub offset_y: String,
    pub zoom_level: f64,
    pub markers: Vec<MarkerRecord>,
}

impl Default for IconDocument {
    fn default() -> Self {
        let geometry = IconGeometry::default();
        Self {
            image_uri: String::new(),
            name: String::new(),
            size_x: geometry.size_x,
            size_y: geometry.size_y,
            offset_x: geometry.offset_x,
            offset_y: geometry.offset_y,
            zoom_level: 0.0,
            markers: Vec::new(),
        }
    }
}

impl IconDocument {
    pub fn from_icon(icon: &MarkerIcon) -> Self {
        Self {
            image_uri: icon.image_uri.clone(),
            name: icon.name.clone(),
            size_x: icon.geometry.size_x.clone(),
            size_y: icon.geometry.size_y.clone(),
            offset_x: icon.geometry.offset_x.clone(),
            offset_y: icon.geometry.offset_y.clone(),
            zoom_level: icon.zoom_level,
            markers: icon.markers().iter().map(MarkerRecord::from).collect(),
        }
    }

    pub fn into_icon(self) -> MarkerIcon {
        let mut icon = MarkerIcon::new(self.name, self.image_uri)
            .with_zoom_level(self.zoom_level)
            .with_markers(self.markers.into_iter().map(Marker::from).collect());
        icon.geometry = IconGeometry {
            size_x: self.size_x,
            size_y: self.size_y,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        };
        icon
    }
}

/// Markers are written as compact arrays; the object form is read too
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerRecord {
    WithInfo(f64, f64, String),
    Point(f64, f64),
    Object {
        x: f64,
        y: f64,
        #[serde(default)]
        info: Option<String>,
    },
}

impl From<&Marker> for MarkerRecord {
    fn from(marker: &Marker) -> Self {
        match &marker.info {
            Some(info) => MarkerRecord::WithInfo(marker.x, marker.y, info.clone()),
            None => MarkerRecord::Point(marker.x, marker.y),
        }
    }
}

impl From<MarkerRecord> for Marker {
    fn from(record: MarkerRecord) -> Self {
        match record {
            MarkerRecord::WithInfo(x, y, info) => Marker::new(x, y).with_info(info),
            MarkerRecord::Point(x, y) => Marker::new(x, y),
            MarkerRecord::Object { x, y, info } => Marker { x, y, info },
        }
    }
}

impl MapDocument {
    pub fn from_map(map: &MapData) -> Self {
        Self {
            bg_color: map.bg_color().to_string(),
            tilesets: map.tilesets().iter().map(TilesetDocument::from_tileset).collect(),
            icons: map.icons().iter().map(IconDocument::from_icon).collect(),
        }
    }

    pub fn into_map(self) -> Result<MapData> {
        let mut tilesets = self
            .tilesets
            .into_iter()
            .map(TilesetDocument::into_tileset)
            .collect::<Result<Vec<_>>>()?;
        if tilesets.is_empty() {
            tilesets.push(Tileset::default());
        }
        let icons = self.icons.into_iter().map(IconDocument::into_icon).collect();
        Ok(MapData::from_parts(tilesets, icons, self.bg_color))
    }
}

/// Data file inside a map directory
pub fn map_file(map_dir: &Path) -> PathBuf {
    map_dir.join(MAP_FILE_NAME)
}

pub fn load_map(path: &Path) -> Result<MapData> {
    let contents = fs::read_to_string(path)?;
    let document: MapDocument = serde_json::from_str(&contents)?;
    let map = document.into_map()?;
    info!(
        path = %path.display(),
        tilesets = map.tilesets().len(),
        icons = map.icons().len(),
        "loaded map"
    );
    Ok(map)
}

pub fn save_map(path: &Path, map: &MapData) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(&MapDocument::from_map(map))?;
    fs::write(path, contents)?;
    info!(path = %path.display(), "saved map");
    Ok(())
}

/// Lowercase and keep only `[a-z0-9]`. Names shorter than three characters
/// after cleanup are rejected.
pub fn normalize_map_name(name: &str) -> Result<String> {
    let normalized: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    if normalized.len() < 3 {
        warn!(name, "rejected map name");
        return Err(MapError::Other(format!(
            "map name {:?} must have at least 3 letters or digits",
            name
        )));
    }
    Ok(normalized)
}
