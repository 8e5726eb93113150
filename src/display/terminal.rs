// src/display/terminal.rs
//! Terminal renderer and interactive viewer
//!
//! Each terminal character stands for a block of viewport pixels. Present
//! tiles of the current tileset draw as `#`, coarser visible tilesets as
//! `+`, empty cells of the current tileset as `.`, and markers as the first
//! letter of their icon name.

use super::{CellContent, ImageResolver, Materialize, Placement, TileRenderer};
use crate::{
    config::ViewerConfig,
    engine::MapEngine,
    error::{MapError, Result},
    map::{CellAddress, MapData, Marker, MarkerIcon},
    view::overlay::OverlayTransform,
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::collections::BTreeMap;
use std::io::{self, Write};
use tracing::debug;

/// Viewport pixels covered by one terminal character
pub const PIXELS_PER_COLUMN: f64 = 8.0;
pub const PIXELS_PER_ROW: f64 = 16.0;

#[derive(Debug, Clone)]
struct Table {
    request: Materialize,
    placement: Option<Placement>,
}

#[derive(Debug, Clone, Default)]
struct Layer {
    visible: bool,
    label: char,
    markers: Vec<Marker>,
    tooltips: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TerminalRenderer {
    tables: BTreeMap<usize, Table>,
    layers: Vec<Layer>,
    overlay: Option<OverlayTransform>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tilesets with a materialized rectangle
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Cells materialized for a tileset, zero when released
    pub fn cell_count(&self, tileset: usize) -> usize {
        self.tables.get(&tileset).map_or(0, |table| table.request.cells.len())
    }

    /// Rasterize the current scene into `rows` lines of `cols` characters
    pub fn canvas(&self, cols: usize, rows: usize) -> Vec<String> {
        let mut canvas = vec![vec![' '; cols]; rows];

        let mut placed: Vec<(&Table, &Placement)> = self
            .tables
            .values()
            .filter_map(|table| table.placement.as_ref().map(|p| (table, p)))
            .collect();
        placed.sort_by_key(|(_, placement)| placement.z_order);

        for (table, placement) in placed {
            let tile_w = table.request.tile_width as f64 * placement.scale;
            let tile_h = table.request.tile_height as f64 * placement.scale;
            let area = &table.request.area;
            for (i, content) in table.request.cells.iter().enumerate() {
                let glyph = match (content, placement.current) {
                    (CellContent::Image(_), true) => '#',
                    (CellContent::Image(_), false) => '+',
                    (CellContent::Empty, true) => '.',
                    (CellContent::Empty, false) => continue,
                };
                let x = placement.left + (i % area.num_cols) as f64 * tile_w;
                let y = placement.top + (i / area.num_cols) as f64 * tile_h;
                fill(&mut canvas, x, y, tile_w, tile_h, glyph);
            }
        }

        for (layer, marker) in self.visible_markers() {
            if let Some((col, row)) = self.marker_cell(marker) {
                if col < cols && row < rows {
                    canvas[row][col] = layer.label;
                }
            }
        }

        canvas.into_iter().map(|line| line.into_iter().collect()).collect()
    }

    /// Tooltip of the topmost visible marker drawn at a character cell
    pub fn tooltip_at(&self, col: usize, row: usize) -> Option<&str> {
        self.layers
            .iter()
            .filter(|layer| layer.visible)
            .flat_map(|layer| layer.markers.iter().zip(&layer.tooltips))
            .filter(|(marker, _)| self.marker_cell(marker) == Some((col, row)))
            .map(|(_, tooltip)| tooltip.as_str())
            .last()
    }

    fn visible_markers(&self) -> impl Iterator<Item = (&Layer, &Marker)> + '_ {
        self.layers
            .iter()
            .filter(|layer| layer.visible)
            .flat_map(|layer| layer.markers.iter().map(move |marker| (layer, marker)))
    }

    fn marker_cell(&self, marker: &Marker) -> Option<(usize, usize)> {
        let (x, y) = self.overlay?.marker_screen_position(marker);
        let col = (x / PIXELS_PER_COLUMN).floor();
        let row = (y / PIXELS_PER_ROW).floor();
        // NaN fails both comparisons
        if col >= 0.0 && row >= 0.0 && col < usize::MAX as f64 && row < usize::MAX as f64 {
            Some((col as usize, row as usize))
        } else {
            None
        }
    }
}

fn fill(canvas: &mut [Vec<char>], x: f64, y: f64, w: f64, h: f64, glyph: char) {
    let rows = canvas.len();
    let cols = canvas.first().map_or(0, |line| line.len());
    let span = |from: f64, to: f64, per: f64, max: usize| {
        let start = (from / per).floor().max(0.0) as usize;
        let end = ((to / per).ceil().max(0.0) as usize).min(max);
        start..end
    };
    for row in span(y, y + h, PIXELS_PER_ROW, rows) {
        for col in span(x, x + w, PIXELS_PER_COLUMN, cols) {
            canvas[row][col] = glyph;
        }
    }
}

impl TileRenderer for TerminalRenderer {
    fn materialize(&mut self, request: Materialize) {
        self.tables.insert(request.tileset, Table { request, placement: None });
    }

    fn place(&mut self, tileset: usize, placement: &Placement) {
        if let Some(table) = self.tables.get_mut(&tileset) {
            table.placement = Some(*placement);
        }
    }

    fn release(&mut self, tileset: usize) {
        self.tables.remove(&tileset);
    }

    fn refresh_cell(&mut self, tileset: usize, addr: CellAddress, content: CellContent) {
        let Some(table) = self.tables.get_mut(&tileset) else {
            return;
        };
        let area = table.request.area;
        if area.contains(addr) {
            let i = (addr.row - area.first_row) * area.num_cols + (addr.col - area.first_col);
            table.request.cells[i] = content;
        }
    }

    fn apply_overlay(&mut self, transform: &OverlayTransform, _rescale_markers: bool) {
        // Glyphs have a fixed size, only the layer transform matters here
        self.overlay = Some(*transform);
    }

    fn sync_layer(&mut self, icon: &MarkerIcon, visible: bool) {
        if icon.index() >= self.layers.len() {
            self.layers.resize_with(icon.index() + 1, Layer::default);
        }
        self.layers[icon.index()] = Layer {
            visible,
            label: icon.name.chars().next().unwrap_or('*').to_ascii_uppercase(),
            markers: icon.markers().to_vec(),
            tooltips: icon.markers().iter().map(|marker| icon.tooltip(marker)).collect(),
        };
    }

    fn remove_layer(&mut self, icon: usize) {
        if icon < self.layers.len() {
            self.layers.remove(icon);
        }
    }
}

/// Terminal size in viewport pixels, leaving the last line for status
fn viewport_size(cols: u16, rows: u16) -> (f64, f64) {
    (
        cols.max(1) as f64 * PIXELS_PER_COLUMN,
        rows.saturating_sub(1).max(1) as f64 * PIXELS_PER_ROW,
    )
}

/// Run the interactive viewer until the user quits
pub fn run_viewer<I: ImageResolver>(
    engine: &mut MapEngine<TerminalRenderer, I>,
    config: &ViewerConfig,
    title: &str,
) -> Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode().map_err(MapError::Io)?;
    execute!(stdout, EnterAlternateScreen, Hide, DisableLineWrap).map_err(MapError::Io)?;

    let result = viewer_loop(engine, config, title, &mut stdout);

    execute!(stdout, Show, EnableLineWrap, LeaveAlternateScreen).map_err(MapError::Io)?;
    terminal::disable_raw_mode().map_err(MapError::Io)?;
    result
}

fn viewer_loop<I: ImageResolver>(
    engine: &mut MapEngine<TerminalRenderer, I>,
    config: &ViewerConfig,
    title: &str,
    stdout: &mut impl Write,
) -> Result<()> {
    let (cols, rows) = terminal::size().map_err(MapError::Io)?;
    let (width, height) = viewport_size(cols, rows);
    engine.resize(width, height)?;
    engine.center_on_overview();
    let mut size = (cols, rows);

    loop {
        for event in engine.take_events() {
            debug!(?event, "map event");
        }
        draw(engine, title, size, stdout)?;

        match event::read().map_err(MapError::Io)? {
            Event::Resize(cols, rows) => {
                size = (cols, rows);
                let (width, height) = viewport_size(cols, rows);
                engine.resize(width, height)?;
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let (width, height) = (engine.viewport().width, engine.viewport().height);
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Left => engine.pan(config.pan_step, 0.0),
                    KeyCode::Right => engine.pan(-config.pan_step, 0.0),
                    KeyCode::Up => engine.pan(0.0, config.pan_step),
                    KeyCode::Down => engine.pan(0.0, -config.pan_step),
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        engine.zoom_at(config.zoom_step, width / 2.0, height / 2.0)?
                    }
                    KeyCode::Char('-') => engine.zoom_at(1.0 / config.zoom_step, width / 2.0, height / 2.0)?,
                    KeyCode::Char('c') => engine.recenter(),
                    KeyCode::Char('o') => engine.center_on_overview(),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Status text, with the tooltip of a marker under the view centre
fn status_line<I: ImageResolver>(
    engine: &MapEngine<TerminalRenderer, I>,
    title: &str,
    cols: usize,
    map_rows: usize,
) -> String {
    let current = match engine.current_tileset() {
        Some(index) => index.to_string(),
        None => "-".to_string(),
    };
    let mut status = format!(
        " {} | zoom {:.0}% | tileset {}",
        title,
        engine.viewport().zoom,
        current
    );
    match engine.renderer().tooltip_at(cols / 2, map_rows / 2) {
        Some(tooltip) => {
            status.push_str(" | ");
            status.push_str(&tooltip.replace("<br>", ": "));
        }
        None => status.push_str(" | arrows pan, +/- zoom, c center, o overview, q quit"),
    }
    status.chars().take(cols).collect()
}

/// Status line drawn in the map's colors, green on the terminal default
/// when the background is not a hex color
fn status_colors(map: &MapData) -> (Color, Option<Color>) {
    match map.bg_rgb() {
        Some((r, g, b)) => {
            let foreground = if map.foreground_color() == "#000" {
                Color::Black
            } else {
                Color::White
            };
            (foreground, Some(Color::Rgb { r, g, b }))
        }
        None => (Color::Green, None),
    }
}

fn draw<I: ImageResolver>(
    engine: &MapEngine<TerminalRenderer, I>,
    title: &str,
    (cols, rows): (u16, u16),
    stdout: &mut impl Write,
) -> Result<()> {
    let map_rows = rows.saturating_sub(1) as usize;
    let lines = engine.renderer().canvas(cols as usize, map_rows);

    queue!(stdout, Clear(ClearType::All)).map_err(MapError::Io)?;
    for (row, line) in lines.iter().enumerate() {
        queue!(stdout, MoveTo(0, row as u16), Print(line)).map_err(MapError::Io)?;
    }

    let status = status_line(engine, title, cols as usize, map_rows);
    let (foreground, background) = status_colors(engine.map());
    queue!(stdout, MoveTo(0, map_rows as u16), SetForegroundColor(foreground)).map_err(MapError::Io)?;
    if let Some(background) = background {
        queue!(stdout, SetBackgroundColor(background)).map_err(MapError::Io)?;
    }
    queue!(stdout, Print(status), ResetColor).map_err(MapError::Io)?;

    stdout.flush().map_err(MapError::Io)?;
    Ok(())
}
