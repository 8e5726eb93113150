// src/main.rs
//! Tile Map Viewer - inspect, edit and browse multi-resolution tile maps

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tilemap_viewer::{
    config::ViewerConfig,
    display::{terminal, DirectoryImages},
    persist::{self, load_map, save_map},
    view::{compute_render_area, update_visibility},
    Direction, MapData, MapEngine, ViewportState,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-resolution tile map viewer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print which tilesets are visible and which cells would be rendered
    Plan {
        /// Map name under the data directory, or a path to a map file
        map: String,
        /// Global zoom in percent
        #[arg(long)]
        zoom: Option<f64>,
        /// Screen position of the map origin, as X,Y
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        origin: Option<(f64, f64)>,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
    },
    /// Browse a map in the terminal
    View { map: String },
    /// Create an empty map
    New { name: String },
    /// Grow one tileset's grid
    Expand {
        map: String,
        #[arg(long)]
        tileset: usize,
        /// n, s, w or e
        #[arg(long)]
        direction: Direction,
        #[arg(long, default_value_t = 1)]
        amount: usize,
    },
    /// Trim empty borders from every tileset and drop empty trailing tilesets
    Trim { map: String },
}

fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{}'", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| format!("bad X '{}': {}", x, e))?;
    let y = y.trim().parse::<f64>().map_err(|e| format!("bad Y '{}': {}", y, e))?;
    Ok((x, y))
}

/// Where a map lives: its data file and the image root/name pair
struct MapLocation {
    file: PathBuf,
    root: PathBuf,
    name: String,
}

fn locate(config: &ViewerConfig, map: &str) -> Result<MapLocation> {
    let path = Path::new(map);
    if path.is_file() {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let root = dir.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        return Ok(MapLocation { file: path.to_path_buf(), root, name });
    }

    let name = persist::normalize_map_name(map)?;
    Ok(MapLocation {
        file: persist::map_file(&config.map_dir(&name)),
        root: config.data_dir.clone(),
        name,
    })
}

fn load(location: &MapLocation) -> Result<MapData> {
    load_map(&location.file).with_context(|| format!("Failed to load map from {}", location.file.display()))
}

fn save(location: &MapLocation, map: &MapData) -> Result<()> {
    save_map(&location.file, map).with_context(|| format!("Failed to save map to {}", location.file.display()))
}

fn plan(
    config: &ViewerConfig,
    location: &MapLocation,
    zoom: Option<f64>,
    origin: Option<(f64, f64)>,
    width: Option<f64>,
    height: Option<f64>,
) -> Result<()> {
    let map = load(location)?;
    let mut viewport = ViewportState::new(
        width.unwrap_or(config.viewport_width),
        height.unwrap_or(config.viewport_height),
    )?;

    if zoom.is_none() && origin.is_none() {
        if let Some(overview) = map.overview() {
            viewport.center_on(overview);
        }
    } else {
        viewport.recenter();
    }
    if let Some(zoom) = zoom {
        viewport.set_zoom(zoom)?;
    }
    if let Some((x, y)) = origin {
        viewport = viewport.with_origin(x, y);
    }

    println!(
        "viewport {}x{} origin ({:.1}, {:.1}) zoom {:.1}%",
        viewport.width, viewport.height, viewport.origin_x, viewport.origin_y, viewport.zoom
    );

    let selection = update_visibility(map.tilesets(), map.overview_index(), &viewport, &config.lod);
    for tileset in map.tilesets() {
        let index = tileset.index();
        let marker = if selection.current == Some(index) { "*" } else { " " };
        if !selection.is_visible(index) {
            println!(
                "{} tileset {} zoom {} ({}x{}): hidden",
                marker,
                index,
                tileset.zoom_level(),
                tileset.num_rows(),
                tileset.num_cols()
            );
            continue;
        }
        let area = compute_render_area(tileset, &viewport);
        println!(
            "{} tileset {} zoom {} ({}x{}): rows {}..{} cols {}..{} at ({:.1}, {:.1}), {} cells",
            marker,
            index,
            tileset.zoom_level(),
            tileset.num_rows(),
            tileset.num_cols(),
            area.first_row,
            area.first_row + area.num_rows,
            area.first_col,
            area.first_col + area.num_cols,
            area.screen_x,
            area.screen_y,
            area.cell_count()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ViewerConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Plan { map, zoom, origin, width, height } => {
            let location = locate(&config, &map)?;
            plan(&config, &location, zoom, origin, width, height)?;
        }
        Command::View { map } => {
            let location = locate(&config, &map)?;
            let data = load(&location)?;
            let viewport = ViewportState::new(config.viewport_width, config.viewport_height)?;
            let images = DirectoryImages::new(&location.root, &location.name);
            let mut engine = MapEngine::new(
                data,
                viewport,
                config.lod,
                terminal::TerminalRenderer::new(),
                images,
            );
            terminal::run_viewer(&mut engine, &config, &location.name)?;
        }
        Command::New { name } => {
            let location = locate(&config, &name)?;
            if location.file.exists() {
                bail!("Map '{}' already exists at {}", location.name, location.file.display());
            }
            save(&location, &MapData::new())?;
            println!("Created map '{}' at {}", location.name, location.file.display());
        }
        Command::Expand { map, tileset, direction, amount } => {
            let location = locate(&config, &map)?;
            let mut data = load(&location)?;
            data.tileset_mut(tileset)?.expand(direction, amount)?;
            save(&location, &data)?;
            let extents = data.tileset(tileset)?.extents();
            info!(tileset, %direction, amount, "expanded");
            println!(
                "Tileset {} extents: N{} S{} W{} E{}",
                tileset, extents.north, extents.south, extents.west, extents.east
            );
        }
        Command::Trim { map } => {
            let location = locate(&config, &map)?;
            let mut data = load(&location)?;
            for index in 0..data.tilesets().len() {
                let removed = data.tileset_mut(index)?.trim();
                println!(
                    "Tileset {} trimmed N{} S{} W{} E{}",
                    index, removed.north, removed.south, removed.west, removed.east
                );
            }
            let culled = data.cull_empty_tilesets();
            if !culled.is_empty() {
                println!("Removed empty tilesets {:?}", culled);
            }
            save(&location, &data)?;
        }
    }

    Ok(())
}
