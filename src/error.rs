// src/error.rs
//! Error types for the tile map engine

use std::fmt;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug)]
pub enum MapError {
    /// Row/column outside the current grid bounds. Never clamped.
    InvalidAddress {
        row: i64,
        col: i64,
        num_rows: usize,
        num_cols: usize,
    },
    /// Non-positive tile dimensions, zoom levels or malformed grids
    InvalidGeometry(String),
    UnknownTileset(usize),
    UnknownIcon(usize),
    UnknownMarker { icon: usize, marker: usize },
    Io(std::io::Error),
    Json(serde_json::Error),
    Other(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::InvalidAddress { row, col, num_rows, num_cols } => write!(
                f,
                "Invalid address: ({}, {}) is outside the {}x{} grid",
                row, col, num_rows, num_cols
            ),
            MapError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            MapError::UnknownTileset(index) => write!(f, "No tileset at index {}", index),
            MapError::UnknownIcon(index) => write!(f, "No icon at index {}", index),
            MapError::UnknownMarker { icon, marker } => {
                write!(f, "No marker {} on icon {}", marker, icon)
            }
            MapError::Io(e) => write!(f, "IO error: {}", e),
            MapError::Json(e) => write!(f, "JSON error: {}", e),
            MapError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io(e) => Some(e),
            MapError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(error: std::io::Error) -> Self {
        MapError::Io(error)
    }
}

impl From<serde_json::Error> for MapError {
    fn from(error: serde_json::Error) -> Self {
        MapError::Json(error)
    }
}

impl From<anyhow::Error> for MapError {
    fn from(error: anyhow::Error) -> Self {
        MapError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_message() {
        let err = MapError::InvalidAddress { row: -1, col: 3, num_rows: 2, num_cols: 4 };
        assert_eq!(err.to_string(), "Invalid address: (-1, 3) is outside the 2x4 grid");
    }

    #[test]
    fn test_io_conversion_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MapError = io.into();
        assert!(matches!(err, MapError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
