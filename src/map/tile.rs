// src/map/tile.rs
//! Per-cell tile state

/// Content marker for one grid cell.
///
/// Presence is the only durable fact about a tile; the image itself is
/// resolved lazily from the tileset index and the cell address. A freshly
/// uploaded tile may carry a transient local image reference until the
/// committed image exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tile {
    #[default]
    Absent,
    Present { local_src: Option<String> },
}

impl Tile {
    /// Committed tile, image resolved by address
    pub fn present() -> Self {
        Tile::Present { local_src: None }
    }

    /// Tile backed by a local image reference (not persisted)
    pub fn local(src: impl Into<String>) -> Self {
        Tile::Present { local_src: Some(src.into()) }
    }

    /// Build from the persisted presence flag
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            Self::present()
        } else {
            Tile::Absent
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Tile::Present { .. })
    }

    pub fn local_src(&self) -> Option<&str> {
        match self {
            Tile::Present { local_src } => local_src.as_deref(),
            Tile::Absent => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_flag() {
        assert!(Tile::from_flag(true).is_present());
        assert!(!Tile::from_flag(false).is_present());
        assert_eq!(Tile::default(), Tile::Absent);
    }

    #[test]
    fn test_local_src() {
        let tile = Tile::local("blob:1234");
        assert!(tile.is_present());
        assert_eq!(tile.local_src(), Some("blob:1234"));
        assert_eq!(Tile::present().local_src(), None);
    }
}
