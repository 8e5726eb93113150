// src/view/lod.rs
//! Level-of-detail selection across overlapping tilesets

use crate::error::{MapError, Result};
use crate::map::tileset::Tileset;
use crate::view::viewport::ViewportState;
use serde::{Deserialize, Serialize};

/// Thresholds deciding when a non-overview tileset is worth showing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodPolicy {
    /// Shown while displayed above this fraction of native resolution
    pub min_display_scale: f64,
    /// ... or while one tile covers more than this fraction of the viewport
    /// in both axes
    pub min_viewport_coverage: f64,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            min_display_scale: 0.7,
            min_viewport_coverage: 0.5,
        }
    }
}

impl LodPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.min_display_scale > 0.0 && self.min_viewport_coverage > 0.0 {
            Ok(())
        } else {
            Err(MapError::InvalidGeometry(format!(
                "LOD thresholds must be positive, got scale {} and coverage {}",
                self.min_display_scale, self.min_viewport_coverage
            )))
        }
    }

    /// Visibility of a tileset other than the overview
    pub fn is_visible(&self, tileset: &Tileset, viewport: &ViewportState) -> bool {
        if tileset.display_scale(viewport.zoom) > self.min_display_scale {
            return true;
        }
        let (tile_w, tile_h) = tileset.scaled_tile_size(viewport.zoom);
        tile_w > self.min_viewport_coverage * viewport.width
            && tile_h > self.min_viewport_coverage * viewport.height
    }
}

/// Outcome of a level-of-detail pass, indexed like the tileset list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LodSelection {
    pub visible: Vec<bool>,
    /// Most detailed visible tileset
    pub current: Option<usize>,
}

impl LodSelection {
    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(false)
    }

    pub fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.visible
            .iter()
            .enumerate()
            .filter(|(_, visible)| **visible)
            .map(|(index, _)| index)
    }
}

/// Decide which tilesets are shown at the viewport's zoom and which one is
/// current. The overview always stays visible as a background.
pub fn update_visibility(
    tilesets: &[Tileset],
    overview: Option<usize>,
    viewport: &ViewportState,
    policy: &LodPolicy,
) -> LodSelection {
    let mut order: Vec<usize> = (0..tilesets.len()).collect();
    order.sort_by_key(|&index| tilesets[index].z_order());

    let mut visible = vec![false; tilesets.len()];
    let mut current = overview.filter(|&index| index < tilesets.len());

    for index in order {
        let tileset = &tilesets[index];
        visible[index] = Some(index) == overview || policy.is_visible(tileset, viewport);

        let more_detailed = current.map_or(true, |best| tileset.z_order() > tilesets[best].z_order());
        if visible[index] && more_detailed {
            current = Some(index);
        }
    }

    LodSelection { visible, current }
}
