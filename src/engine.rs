// src/engine.rs
//! Map engine: keeps the renderer in step with the map and the view
//!
//! Every pan/zoom/resize/edit call settles completely (culling, level of
//! detail, overlay) before returning, so two inputs can never interleave.

use crate::display::{CellContent, ImageResolver, Materialize, Placement, TileRenderer};
use crate::error::Result;
use crate::map::{CellAddress, Direction, Extents, MapData, MarkerIcon, Marker, Tile};
use crate::view::culling::{compute_render_area, plan_update, RenderArea};
use crate::view::lod::{update_visibility, LodPolicy};
use crate::view::overlay::OverlaySync;
use crate::view::viewport::ViewportState;
use tracing::{debug, info};

/// Observable changes consumed by editing UIs
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The most detailed visible tileset changed
    CurrentTilesetChanged(Option<usize>),
    /// A visible tileset's grid or geometry was edited
    TilesetChanged(usize),
}

#[derive(Debug, Clone, Default)]
struct TilesetView {
    visible: bool,
    materialized: Option<RenderArea>,
}

pub struct MapEngine<R, I> {
    map: MapData,
    viewport: ViewportState,
    policy: LodPolicy,
    renderer: R,
    images: I,
    views: Vec<TilesetView>,
    current: Option<usize>,
    overlay: OverlaySync,
    layers: Vec<bool>,
    events: Vec<MapEvent>,
}

impl<R: TileRenderer, I: ImageResolver> MapEngine<R, I> {
    /// Create an engine and render the initial view
    pub fn new(map: MapData, viewport: ViewportState, policy: LodPolicy, renderer: R, images: I) -> Self {
        let views = vec![TilesetView::default(); map.tilesets().len()];
        let layers = vec![false; map.icons().len()];
        let mut engine = Self {
            map,
            viewport,
            policy,
            renderer,
            images,
            views,
            current: None,
            overlay: OverlaySync::new(),
            layers,
            events: Vec::new(),
        };
        engine.sync_layers(true);
        engine.zoom_changed();
        engine
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn into_map(self) -> MapData {
        self.map
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Most detailed visible tileset
    pub fn current_tileset(&self) -> Option<usize> {
        self.current
    }

    pub fn is_visible(&self, tileset: usize) -> bool {
        self.views.get(tileset).map_or(false, |view| view.visible)
    }

    pub fn materialized_area(&self, tileset: usize) -> Option<&RenderArea> {
        self.views.get(tileset).and_then(|view| view.materialized.as_ref())
    }

    pub fn take_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    // Navigation

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
        self.position_changed();
    }

    pub fn zoom_at(&mut self, factor: f64, screen_x: f64, screen_y: f64) -> Result<()> {
        self.viewport.zoom_at(factor, screen_x, screen_y)?;
        self.zoom_changed();
        Ok(())
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        self.viewport.set_zoom(zoom)?;
        self.zoom_changed();
        Ok(())
    }

    /// Viewport size feeds the coverage rule, so this reruns the LOD pass
    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        self.viewport.resize(width, height)?;
        self.zoom_changed();
        Ok(())
    }

    pub fn recenter(&mut self) {
        self.viewport.recenter();
        self.position_changed();
    }

    /// Show the overview tileset at native scale in the middle of the view
    pub fn center_on_overview(&mut self) {
        if let Some(overview) = self.map.overview() {
            self.viewport.center_on(overview);
        }
        self.zoom_changed();
    }

    pub fn cell_at(&self, tileset: usize, screen_x: f64, screen_y: f64) -> Result<CellAddress> {
        self.map.tileset(tileset)?.cell_at(&self.viewport, screen_x, screen_y)
    }

    pub fn screen_to_map(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        self.viewport.screen_to_map(screen_x, screen_y)
    }

    // Recomputation

    /// Origin moved: same visibility, only rectangles and the overlay move
    fn position_changed(&mut self) {
        for index in 0..self.views.len() {
            if self.views[index].visible {
                self.render_tileset(index, false);
            }
        }
        self.sync_overlay();
    }

    /// Zoom, size or tileset list changed: full LOD pass
    fn zoom_changed(&mut self) {
        let selection = update_visibility(
            self.map.tilesets(),
            self.map.overview_index(),
            &self.viewport,
            &self.policy,
        );

        if selection.current != self.current {
            info!(current = ?selection.current, zoom = self.viewport.zoom, "current tileset changed");
            self.current = selection.current;
            self.events.push(MapEvent::CurrentTilesetChanged(selection.current));
        }

        for index in 0..self.views.len() {
            if selection.is_visible(index) {
                self.views[index].visible = true;
                self.render_tileset(index, false);
            } else {
                self.hide(index);
            }
        }

        self.sync_layers(false);
        self.sync_overlay();
    }

    fn hide(&mut self, index: usize) {
        let view = &mut self.views[index];
        view.visible = false;
        if view.materialized.take().is_some() {
            debug!(tileset = index, "released hidden tileset");
            self.renderer.release(index);
        }
    }

    fn render_tileset(&mut self, index: usize, force: bool) {
        let tileset = &self.map.tilesets()[index];
        let area = compute_render_area(tileset, &self.viewport);
        let update = plan_update(self.views[index].materialized.as_ref(), area, force);

        if update.is_rebuild() {
            if self.views[index].materialized.take().is_some() {
                self.renderer.release(index);
            }
            let cells = area
                .cells()
                .map(|addr| match self.images.tile_image(tileset, addr) {
                    Some(src) => CellContent::Image(src),
                    None => CellContent::Empty,
                })
                .collect();
            debug!(
                tileset = index,
                first_row = area.first_row,
                rows = area.num_rows,
                first_col = area.first_col,
                cols = area.num_cols,
                "rebuilding render area"
            );
            self.renderer.materialize(Materialize {
                tileset: index,
                area,
                tile_width: tileset.tile_width(),
                tile_height: tileset.tile_height(),
                cells,
            });
        }

        self.views[index].materialized = Some(area);
        self.renderer.place(
            index,
            &Placement {
                left: area.screen_x,
                top: area.screen_y,
                scale: tileset.display_scale(self.viewport.zoom),
                z_order: tileset.z_order(),
                current: self.current == Some(index),
            },
        );
    }

    fn sync_overlay(&mut self) {
        let update = self.overlay.sync(&self.viewport);
        self.renderer.apply_overlay(&update.transform, update.rescale_markers);
    }

    fn sync_layers(&mut self, force: bool) {
        for (index, icon) in self.map.icons().iter().enumerate() {
            let visible = icon.is_layer_visible(self.viewport.zoom);
            if force || self.layers[index] != visible {
                self.layers[index] = visible;
                self.renderer.sync_layer(icon, visible);
            }
        }
    }

    /// Rebuild one icon's layer after its markers changed
    fn rebuild_layer(&mut self, index: usize) {
        let Some(icon) = self.map.icons().get(index) else {
            return;
        };
        let visible = icon.is_layer_visible(self.viewport.zoom);
        self.layers[index] = visible;
        self.renderer.sync_layer(icon, visible);
        // Rebuilt markers need the current inverse scale
        self.overlay.invalidate();
        self.sync_overlay();
    }

    // Tileset editing

    /// Grid indexing changed: rebuild the visible rectangle from scratch
    fn grid_changed(&mut self, index: usize) {
        if self.views[index].visible {
            self.render_tileset(index, true);
            self.events.push(MapEvent::TilesetChanged(index));
        }
    }

    /// Geometry changed: visibility may flip, so rerun the LOD pass after
    /// dropping the stale rectangle
    fn geometry_changed(&mut self, index: usize) {
        let was_visible = self.views[index].visible;
        self.hide(index);
        self.zoom_changed();
        if was_visible || self.views[index].visible {
            self.events.push(MapEvent::TilesetChanged(index));
        }
    }

    pub fn expand(&mut self, tileset: usize, dir: Direction, amount: usize) -> Result<()> {
        self.map.tileset_mut(tileset)?.expand(dir, amount)?;
        info!(tileset, %dir, amount, "expanded tileset");
        self.grid_changed(tileset);
        Ok(())
    }

    pub fn trim(&mut self, tileset: usize) -> Result<Extents> {
        let removed = self.map.tileset_mut(tileset)?.trim();
        info!(tileset, ?removed, "trimmed tileset");
        self.grid_changed(tileset);
        Ok(removed)
    }

    pub fn is_empty(&self, tileset: usize) -> Result<bool> {
        Ok(self.map.tileset(tileset)?.is_empty())
    }

    pub fn set_tile(&mut self, tileset: usize, row: usize, col: usize, tile: Tile) -> Result<Tile> {
        let previous = self.map.tileset_mut(tileset)?.set_tile(row, col, tile)?;
        self.refresh_cell(tileset, CellAddress::new(row, col));
        Ok(previous)
    }

    pub fn remove_tile(&mut self, tileset: usize, row: usize, col: usize) -> Result<Tile> {
        self.set_tile(tileset, row, col, Tile::Absent)
    }

    fn refresh_cell(&mut self, index: usize, addr: CellAddress) {
        let inside = self.views[index]
            .materialized
            .as_ref()
            .map_or(false, |area| area.contains(addr));
        if !inside {
            return;
        }
        let tileset = &self.map.tilesets()[index];
        let content = match self.images.tile_image(tileset, addr) {
            Some(src) => CellContent::Image(src),
            None => CellContent::Empty,
        };
        self.renderer.refresh_cell(index, addr, content);
    }

    pub fn create_tileset(&mut self, zoom_level: f64) -> Result<usize> {
        let index = self.map.create_tileset(zoom_level)?;
        self.views.push(TilesetView::default());
        self.zoom_changed();
        Ok(index)
    }

    /// Drop empty tilesets from the tail, releasing their rectangles
    pub fn cull_empty_tilesets(&mut self) -> Vec<usize> {
        let removed = self.map.cull_empty_tilesets();
        for &index in &removed {
            self.hide(index);
        }
        self.views.truncate(self.map.tilesets().len());
        if !removed.is_empty() {
            self.zoom_changed();
        }
        removed
    }

    pub fn set_tileset_zoom_level(&mut self, tileset: usize, zoom_level: f64) -> Result<()> {
        self.map.set_tileset_zoom_level(tileset, zoom_level)?;
        self.geometry_changed(tileset);
        Ok(())
    }

    pub fn set_tile_size(&mut self, tileset: usize, width: u32, height: u32) -> Result<()> {
        self.map.tileset_mut(tileset)?.set_tile_size(width, height)?;
        self.geometry_changed(tileset);
        Ok(())
    }

    pub fn set_tileset_offset(&mut self, tileset: usize, x: f64, y: f64) -> Result<()> {
        self.map.tileset_mut(tileset)?.set_offset(x, y)?;
        self.geometry_changed(tileset);
        Ok(())
    }

    pub fn set_bg_color(&mut self, color: impl Into<String>) {
        self.map.set_bg_color(color);
    }

    // Icons and markers

    pub fn create_icon(&mut self, icon: MarkerIcon) -> usize {
        let index = self.map.create_icon(icon);
        self.layers.push(false);
        self.rebuild_layer(index);
        index
    }

    pub fn remove_icon(&mut self, index: usize) -> Result<MarkerIcon> {
        let icon = self.map.remove_icon(index)?;
        self.layers.remove(index);
        self.renderer.remove_layer(index);
        Ok(icon)
    }

    pub fn set_icon_enabled(&mut self, index: usize, enabled: bool) -> Result<()> {
        self.map.icon_mut(index)?.set_enabled(enabled);
        let icon = self.map.icon(index)?;
        let visible = icon.is_layer_visible(self.viewport.zoom);
        if self.layers[index] != visible {
            self.layers[index] = visible;
            self.renderer.sync_layer(icon, visible);
        }
        Ok(())
    }

    pub fn create_marker(&mut self, icon: usize, x: f64, y: f64) -> Result<usize> {
        let marker = self.map.create_marker(icon, x, y)?;
        self.rebuild_layer(icon);
        Ok(marker)
    }

    /// Place a marker under a screen point
    pub fn create_marker_at_screen(&mut self, icon: usize, screen_x: f64, screen_y: f64) -> Result<usize> {
        let (x, y) = self.screen_to_map(screen_x, screen_y);
        self.create_marker(icon, x, y)
    }

    pub fn remove_marker(&mut self, icon: usize, marker: usize) -> Result<Marker> {
        let removed = self.map.remove_marker(icon, marker)?;
        self.rebuild_layer(icon);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DirectoryImages;
    use crate::map::{Extents, TileGrid, Tileset};
    use crate::view::overlay::OverlayTransform;

    #[derive(Debug, Default)]
    struct RecordingRenderer {
        materialized: Vec<Materialize>,
        placed: Vec<(usize, Placement)>,
        released: Vec<usize>,
        refreshed: Vec<(usize, CellAddress, CellContent)>,
        overlays: Vec<(OverlayTransform, bool)>,
        layers: Vec<(usize, bool, usize)>,
        removed_layers: Vec<usize>,
    }

    impl RecordingRenderer {
        fn clear(&mut self) {
            *self = Self::default();
        }
    }

    impl TileRenderer for RecordingRenderer {
        fn materialize(&mut self, request: Materialize) {
            self.materialized.push(request);
        }
        fn place(&mut self, tileset: usize, placement: &Placement) {
            self.placed.push((tileset, *placement));
        }
        fn release(&mut self, tileset: usize) {
            self.released.push(tileset);
        }
        fn refresh_cell(&mut self, tileset: usize, addr: CellAddress, content: CellContent) {
            self.refreshed.push((tileset, addr, content));
        }
        fn apply_overlay(&mut self, transform: &OverlayTransform, rescale_markers: bool) {
            self.overlays.push((*transform, rescale_markers));
        }
        fn sync_layer(&mut self, icon: &MarkerIcon, visible: bool) {
            self.layers.push((icon.index(), visible, icon.markers().len()));
        }
        fn remove_layer(&mut self, icon: usize) {
            self.removed_layers.push(icon);
        }
    }

    type TestEngine = MapEngine<RecordingRenderer, DirectoryImages>;

    /// Overview at zoom 10 (2x2 tiles) and a 20x20 detail tileset at zoom 100
    fn sample_map() -> MapData {
        let overview = Tileset::new(10.0)
            .unwrap()
            .with_grid(TileGrid::with_extents(Extents::new(1, 1, 1, 1).unwrap()))
            .with_tile_size(256, 256)
            .unwrap();
        let detail = Tileset::new(100.0)
            .unwrap()
            .with_grid(TileGrid::with_extents(Extents::new(10, 10, 10, 10).unwrap()))
            .with_tile_size(256, 256)
            .unwrap();
        MapData::from_parts(vec![overview, detail], Vec::new(), "#111")
    }

    fn engine_at(zoom: f64) -> TestEngine {
        let viewport = ViewportState::new(1024.0, 768.0)
            .unwrap()
            .with_origin(512.0, 384.0)
            .with_zoom(zoom)
            .unwrap();
        MapEngine::new(
            sample_map(),
            viewport,
            LodPolicy::default(),
            RecordingRenderer::default(),
            DirectoryImages::new("data", "test"),
        )
    }

    #[test]
    fn test_initial_render_hides_detail_when_zoomed_out() {
        let mut engine = engine_at(10.0);
        assert!(engine.is_visible(0));
        assert!(!engine.is_visible(1));
        assert_eq!(engine.current_tileset(), Some(0));
        assert_eq!(engine.take_events(), vec![MapEvent::CurrentTilesetChanged(Some(0))]);
        assert_eq!(engine.renderer().materialized.len(), 1);
        assert!(engine.materialized_area(1).is_none());
    }

    #[test]
    fn test_zoom_in_switches_current_and_materializes_detail() {
        let mut engine = engine_at(10.0);
        engine.take_events();
        engine.set_zoom(100.0).unwrap();

        assert!(engine.is_visible(1));
        assert_eq!(engine.current_tileset(), Some(1));
        assert_eq!(engine.take_events(), vec![MapEvent::CurrentTilesetChanged(Some(1))]);

        let area = *engine.materialized_area(1).unwrap();
        // 1024x768 view over 256px cells centred on the origin
        assert_eq!((area.first_col, area.num_cols), (8, 4));
        assert_eq!((area.first_row, area.num_rows), (8, 4));
        let request = engine.renderer().materialized.last().unwrap();
        assert_eq!(request.cells.len(), 16);
        assert!(request.cells.iter().all(|c| *c == CellContent::Empty));
    }

    #[test]
    fn test_zoom_out_releases_hidden_tileset() {
        let mut engine = engine_at(100.0);
        engine.renderer_mut().clear();
        engine.set_zoom(10.0).unwrap();
        assert_eq!(engine.renderer().released, vec![1]);
        assert!(engine.materialized_area(1).is_none());
        assert_eq!(engine.current_tileset(), Some(0));
    }

    #[test]
    fn test_small_pan_only_repositions() {
        let mut engine = engine_at(100.0);
        engine.renderer_mut().clear();

        // detail rows start 128px above the screen, 5px keeps the same rows
        engine.pan(0.0, 5.0);
        let renderer = engine.renderer();
        assert!(renderer.materialized.is_empty());
        assert!(renderer.released.is_empty());
        assert_eq!(renderer.placed.len(), 2);
        assert_eq!(renderer.overlays.len(), 1);
        assert!(!renderer.overlays[0].1);
        assert_eq!(renderer.overlays[0].0.top, 389.0);
    }

    #[test]
    fn test_large_pan_rebuilds_after_release() {
        let mut engine = engine_at(100.0);
        engine.renderer_mut().clear();

        engine.pan(-300.0, 0.0);
        let renderer = engine.renderer();
        assert_eq!(renderer.released, vec![1]);
        assert_eq!(renderer.materialized.len(), 1);
        assert_eq!(renderer.materialized[0].tileset, 1);
    }

    #[test]
    fn test_placement_reports_current_and_scale() {
        let engine = engine_at(100.0);
        let (_, last_detail) = engine
            .renderer()
            .placed
            .iter()
            .rev()
            .find(|(index, _)| *index == 1)
            .copied()
            .unwrap();
        assert!(last_detail.current);
        assert_eq!(last_detail.scale, 1.0);
        assert_eq!(last_detail.z_order, 1);
    }

    #[test]
    fn test_expand_north_rebuilds_and_notifies() {
        let mut engine = engine_at(100.0);
        engine.take_events();
        engine.renderer_mut().clear();

        engine.expand(1, Direction::North, 2).unwrap();
        assert_eq!(engine.map().tileset(1).unwrap().extents().north, 12);
        assert_eq!(engine.take_events(), vec![MapEvent::TilesetChanged(1)]);
        assert_eq!(engine.renderer().released, vec![1]);
        // rows shifted by two, same screen region
        assert_eq!(engine.materialized_area(1).unwrap().first_row, 10);
    }

    #[test]
    fn test_hidden_tileset_edit_is_silent() {
        let mut engine = engine_at(10.0);
        engine.take_events();
        engine.expand(1, Direction::East, 1).unwrap();
        assert!(engine.take_events().is_empty());
        assert!(engine.materialized_area(1).is_none());
    }

    #[test]
    fn test_set_tile_refreshes_only_materialized_cells() {
        let mut engine = engine_at(100.0);
        engine.renderer_mut().clear();

        engine.set_tile(1, 9, 9, Tile::present()).unwrap();
        engine.set_tile(1, 0, 0, Tile::present()).unwrap();
        let refreshed = &engine.renderer().refreshed;
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].1, CellAddress::new(9, 9));
        assert!(matches!(&refreshed[0].2, CellContent::Image(path) if path.ends_with("-1_-1.webp")));

        assert!(engine.set_tile(1, 20, 0, Tile::present()).is_err());
        assert_eq!(engine.remove_tile(1, 9, 9).unwrap(), Tile::present());
    }

    #[test]
    fn test_create_and_cull_tilesets() {
        let mut engine = engine_at(400.0);
        let index = engine.create_tileset(400.0).unwrap();
        assert_eq!(index, 2);
        assert_eq!(engine.current_tileset(), Some(2));
        assert!(engine.materialized_area(2).is_some());

        engine.renderer_mut().clear();
        let removed = engine.cull_empty_tilesets();
        // every tileset is empty; the first one always stays
        assert_eq!(removed, vec![2, 1]);
        assert_eq!(engine.renderer().released, vec![2, 1]);
        assert_eq!(engine.current_tileset(), Some(0));
        assert_eq!(engine.map().tilesets().len(), 1);
    }

    #[test]
    fn test_geometry_change_reruns_lod() {
        let mut engine = engine_at(10.0);
        assert!(!engine.is_visible(1));
        // huge tiles fill the screen even at 0.1 display scale
        engine.set_tile_size(1, 8192, 8192).unwrap();
        assert!(engine.is_visible(1));
        assert!(engine.take_events().contains(&MapEvent::TilesetChanged(1)));

        engine.set_tileset_zoom_level(1, 5.0).unwrap();
        assert_eq!(engine.map().overview_index(), Some(1));
        assert!(engine.set_tileset_offset(1, f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_marker_layers_follow_zoom_and_filter() {
        let mut engine = engine_at(100.0);
        let icon = engine.create_icon(MarkerIcon::new("camp", "camp.svg").with_zoom_level(50.0));
        assert_eq!(engine.renderer().layers.last(), Some(&(0, true, 0)));

        engine.renderer_mut().clear();
        engine.create_marker(icon, 100.0, 200.0).unwrap();
        assert_eq!(engine.renderer().layers, vec![(0, true, 1)]);
        // rebuilt markers get the current inverse scale
        assert_eq!(engine.renderer().overlays.len(), 1);
        assert!(engine.renderer().overlays[0].1);

        engine.renderer_mut().clear();
        engine.set_zoom(40.0).unwrap();
        assert_eq!(engine.renderer().layers, vec![(0, false, 1)]);
        assert!(engine.renderer().overlays.last().unwrap().1);

        engine.renderer_mut().clear();
        engine.set_zoom(45.0).unwrap();
        assert!(engine.renderer().layers.is_empty());

        engine.set_zoom(60.0).unwrap();
        engine.renderer_mut().clear();
        engine.set_icon_enabled(icon, false).unwrap();
        assert_eq!(engine.renderer().layers, vec![(0, false, 1)]);

        assert!(engine.create_marker(3, 0.0, 0.0).is_err());
        assert_eq!(engine.remove_marker(icon, 0).unwrap(), Marker::new(100.0, 200.0));
    }

    #[test]
    fn test_marker_at_screen_uses_map_coordinates() {
        let mut engine = engine_at(50.0);
        let icon = engine.create_icon(MarkerIcon::new("camp", "camp.svg"));
        engine.create_marker_at_screen(icon, 562.0, 484.0).unwrap();
        let marker = &engine.map().icon(icon).unwrap().markers()[0];
        assert_eq!((marker.x, marker.y), (100.0, 200.0));
    }

    #[test]
    fn test_remove_icon_drops_layer() {
        let mut engine = engine_at(100.0);
        engine.create_icon(MarkerIcon::new("a", "a.svg"));
        engine.create_icon(MarkerIcon::new("b", "b.svg"));
        let removed = engine.remove_icon(0).unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(engine.renderer().removed_layers, vec![0]);
        assert_eq!(engine.map().icon(0).unwrap().index(), 0);
        assert!(engine.set_icon_enabled(1, true).is_err());
    }

    #[test]
    fn test_center_on_overview() {
        let mut engine = engine_at(300.0);
        engine.center_on_overview();
        assert_eq!(engine.viewport().zoom, 10.0);
        assert_eq!(engine.viewport().origin_x, 512.0);
        assert_eq!(engine.current_tileset(), Some(0));
        let cell = engine.cell_at(0, 512.0 - 1.0, 384.0 + 1.0).unwrap();
        assert_eq!(cell, CellAddress::new(1, 0));
    }
}
