// src/lib.rs
//! Tile Map Viewer Library
//!
//! A multi-resolution tile map engine: growable tile grids, viewport
//! culling, level-of-detail selection between overlapping tilesets, and a
//! marker overlay that follows the global pan/zoom.

pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod map;
pub mod persist;
pub mod view;

// Re-export main types for convenience
pub use engine::{MapEngine, MapEvent};
pub use error::{MapError, Result};
pub use map::{CellAddress, Direction, Extents, MapData, Marker, MarkerIcon, Tile, Tileset};
pub use view::{LodPolicy, RenderArea, ViewportState};
