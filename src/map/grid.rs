// src/map/grid.rs
//! Direction-extent grid addressing
//!
//! A grid grows around a fixed origin cell. The origin is not stored: it is
//! always the cell at `(extents.north, extents.west)`. Growing towards the
//! north or west prepends rows/columns and bumps the matching extent, so every
//! origin-relative address (and therefore every real-world position) stays
//! put. Growing south or east simply appends.

use super::tile::Tile;
use crate::error::{MapError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    /// Order used by [`TileGrid::trim`]
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Smallest extent allowed in this direction. The origin cell lives in
    /// the south/east extents, so those never drop below one.
    pub fn minimum_extent(&self) -> usize {
        match self {
            Direction::North | Direction::West => 0,
            Direction::South | Direction::East => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        };
        f.write_str(name)
    }
}

impl FromStr for Direction {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "s" | "south" => Ok(Direction::South),
            "w" | "west" => Ok(Direction::West),
            "e" | "east" => Ok(Direction::East),
            other => Err(MapError::Other(format!("Unknown direction '{}'", other))),
        }
    }
}

/// Largest number of cells a grid may hold
pub const MAX_GRID_CELLS: usize = 1 << 26;

fn check_grid_size(rows: Option<usize>, cols: Option<usize>) -> Result<()> {
    match rows.zip(cols).and_then(|(rows, cols)| rows.checked_mul(cols)) {
        Some(cells) if cells <= MAX_GRID_CELLS => Ok(()),
        _ => Err(MapError::InvalidGeometry(format!(
            "grid of {}x{} cells exceeds the {} cell limit",
            rows.map_or_else(|| "overflowing".to_string(), |r| r.to_string()),
            cols.map_or_else(|| "overflowing".to_string(), |c| c.to_string()),
            MAX_GRID_CELLS
        ))),
    }
}

/// How many rows/columns a grid spans from its origin in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extents {
    pub north: usize,
    pub south: usize,
    pub west: usize,
    pub east: usize,
}

impl Default for Extents {
    fn default() -> Self {
        Self { north: 0, south: 1, west: 0, east: 1 }
    }
}

impl Extents {
    pub fn new(north: usize, south: usize, west: usize, east: usize) -> Result<Self> {
        if south < 1 || east < 1 {
            return Err(MapError::InvalidGeometry(format!(
                "south/east extents must be at least 1 (got south={}, east={})",
                south, east
            )));
        }
        check_grid_size(north.checked_add(south), west.checked_add(east))?;
        Ok(Self { north, south, west, east })
    }

    pub fn num_rows(&self) -> usize {
        self.north + self.south
    }

    pub fn num_cols(&self) -> usize {
        self.west + self.east
    }

    pub fn get(&self, dir: Direction) -> usize {
        match dir {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::West => self.west,
            Direction::East => self.east,
        }
    }

    fn get_mut(&mut self, dir: Direction) -> &mut usize {
        match dir {
            Direction::North => &mut self.north,
            Direction::South => &mut self.south,
            Direction::West => &mut self.west,
            Direction::East => &mut self.east,
        }
    }
}

/// Absolute (row, col) index into a grid's current storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Dense row-major grid of tiles, always exactly `num_rows x num_cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    extents: Extents,
    cells: Vec<Vec<Tile>>,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TileGrid {
    /// Minimal 1x1 grid holding only the (empty) origin cell
    pub fn new() -> Self {
        Self::with_extents(Extents::default())
    }

    pub fn with_extents(extents: Extents) -> Self {
        let cells = vec![vec![Tile::Absent; extents.num_cols()]; extents.num_rows()];
        Self { extents, cells }
    }

    /// Build from possibly ragged rows, padding missing cells with absent
    /// tiles. Content outside the extents is rejected.
    pub fn from_rows(extents: Extents, rows: Vec<Vec<Tile>>) -> Result<Self> {
        Extents::new(extents.north, extents.south, extents.west, extents.east)?;

        let num_rows = extents.num_rows();
        let num_cols = extents.num_cols();
        if rows.len() > num_rows {
            return Err(MapError::InvalidGeometry(format!(
                "grid has {} rows but extents allow {}",
                rows.len(),
                num_rows
            )));
        }

        let mut cells = Vec::with_capacity(num_rows);
        for (index, mut row) in rows.into_iter().enumerate() {
            if row.len() > num_cols {
                return Err(MapError::InvalidGeometry(format!(
                    "grid row {} has {} cells but extents allow {}",
                    index,
                    row.len(),
                    num_cols
                )));
            }
            row.resize(num_cols, Tile::Absent);
            cells.push(row);
        }
        cells.resize_with(num_rows, || vec![Tile::Absent; num_cols]);

        Ok(Self { extents, cells })
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn num_rows(&self) -> usize {
        self.extents.num_rows()
    }

    pub fn num_cols(&self) -> usize {
        self.extents.num_cols()
    }

    /// Storage address of the logical (0, 0) anchor
    pub fn origin_offset(&self) -> CellAddress {
        CellAddress::new(self.extents.north, self.extents.west)
    }

    /// Validate a signed address against the current bounds
    pub fn check(&self, row: i64, col: i64) -> Result<CellAddress> {
        let in_rows = row >= 0 && (row as u64) < self.num_rows() as u64;
        let in_cols = col >= 0 && (col as u64) < self.num_cols() as u64;
        if in_rows && in_cols {
            Ok(CellAddress::new(row as usize, col as usize))
        } else {
            Err(MapError::InvalidAddress {
                row,
                col,
                num_rows: self.num_rows(),
                num_cols: self.num_cols(),
            })
        }
    }

    fn checked(&self, row: usize, col: usize) -> Result<CellAddress> {
        self.check(
            i64::try_from(row).unwrap_or(i64::MAX),
            i64::try_from(col).unwrap_or(i64::MAX),
        )
    }

    pub fn tile_at(&self, row: usize, col: usize) -> Result<&Tile> {
        let addr = self.checked(row, col)?;
        Ok(&self.cells[addr.row][addr.col])
    }

    /// Replace a cell, returning the previous tile
    pub fn set_tile(&mut self, row: usize, col: usize, tile: Tile) -> Result<Tile> {
        let addr = self.checked(row, col)?;
        Ok(std::mem::replace(&mut self.cells[addr.row][addr.col], tile))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.cells.iter().map(|row| row.as_slice())
    }

    pub fn present_cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, tile)| tile.is_present())
                .map(move |(c, _)| CellAddress::new(r, c))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|tile| !tile.is_present())
    }

    /// Origin-relative coordinates of a storage address
    pub fn relative(&self, addr: CellAddress) -> (i64, i64) {
        (
            addr.row as i64 - self.extents.north as i64,
            addr.col as i64 - self.extents.west as i64,
        )
    }

    /// Storage address of an origin-relative cell
    pub fn absolute(&self, rel_row: i64, rel_col: i64) -> Result<CellAddress> {
        self.check(
            rel_row + self.extents.north as i64,
            rel_col + self.extents.west as i64,
        )
    }

    /// Grow by `amount` rows/columns in one direction. North/west growth
    /// prepends, south/east appends. Existing cells keep their
    /// origin-relative position.
    pub fn expand(&mut self, dir: Direction, amount: usize) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }

        let current = self.extents.get(dir);
        let (rows, cols) = match dir {
            Direction::North | Direction::South => (self.num_rows().checked_add(amount), Some(self.num_cols())),
            Direction::West | Direction::East => (Some(self.num_rows()), self.num_cols().checked_add(amount)),
        };
        if current.checked_add(amount).is_none() {
            return Err(MapError::InvalidGeometry(format!(
                "cannot expand {} by {}: extent overflow",
                dir, amount
            )));
        }
        check_grid_size(rows, cols)?;

        let num_cols = self.num_cols();
        match dir {
            Direction::North => {
                let fresh = (0..amount).map(|_| vec![Tile::Absent; num_cols]);
                self.cells.splice(0..0, fresh);
            }
            Direction::South => {
                self.cells
                    .extend((0..amount).map(|_| vec![Tile::Absent; num_cols]));
            }
            Direction::West => {
                for row in &mut self.cells {
                    row.splice(0..0, std::iter::repeat(Tile::Absent).take(amount));
                }
            }
            Direction::East => {
                for row in &mut self.cells {
                    row.extend(std::iter::repeat(Tile::Absent).take(amount));
                }
            }
        }
        *self.extents.get_mut(dir) = current + amount;
        Ok(())
    }

    fn edge_is_empty(&self, dir: Direction) -> bool {
        match dir {
            Direction::North => self.cells.first().map_or(true, |row| row.iter().all(|t| !t.is_present())),
            Direction::South => self.cells.last().map_or(true, |row| row.iter().all(|t| !t.is_present())),
            Direction::West => self.cells.iter().all(|row| row.first().map_or(true, |t| !t.is_present())),
            Direction::East => self.cells.iter().all(|row| row.last().map_or(true, |t| !t.is_present())),
        }
    }

    fn remove_edge(&mut self, dir: Direction) {
        match dir {
            Direction::North => {
                self.cells.remove(0);
            }
            Direction::South => {
                self.cells.pop();
            }
            Direction::West => {
                for row in &mut self.cells {
                    row.remove(0);
                }
            }
            Direction::East => {
                for row in &mut self.cells {
                    row.pop();
                }
            }
        }
        *self.extents.get_mut(dir) -= 1;
    }

    /// Shrink the grid to its used area. Each direction is trimmed in turn
    /// (north, south, west, east) against the already-reduced grid, stopping
    /// at the first line holding a tile or at the direction's minimum extent.
    /// Returns how many lines were removed per direction.
    pub fn trim(&mut self) -> Extents {
        let mut removed = Extents { north: 0, south: 0, west: 0, east: 0 };
        for dir in Direction::ALL {
            while self.extents.get(dir) > dir.minimum_extent() && self.edge_is_empty(dir) {
                self.remove_edge(dir);
                *removed.get_mut(dir) += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_tile_at_origin() -> TileGrid {
        let mut grid = TileGrid::new();
        grid.set_tile(0, 0, Tile::present()).unwrap();
        grid
    }

    #[test]
    fn test_default_grid_is_origin_only() {
        let grid = TileGrid::new();
        assert_eq!(grid.num_rows(), 1);
        assert_eq!(grid.num_cols(), 1);
        assert_eq!(grid.origin_offset(), CellAddress::new(0, 0));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let grid = TileGrid::new();
        assert!(matches!(grid.tile_at(1, 0), Err(MapError::InvalidAddress { .. })));
        assert!(matches!(grid.check(-1, 0), Err(MapError::InvalidAddress { .. })));
    }

    #[test]
    fn test_expand_north_keeps_relative_positions() {
        let mut grid = grid_with_tile_at_origin();
        grid.expand(Direction::North, 2).unwrap();
        grid.expand(Direction::West, 3).unwrap();

        assert_eq!(grid.extents(), Extents { north: 2, south: 1, west: 3, east: 1 });
        assert_eq!(grid.num_rows(), 3);
        assert_eq!(grid.num_cols(), 4);

        let origin = grid.origin_offset();
        assert_eq!(origin, CellAddress::new(2, 3));
        assert!(grid.tile_at(2, 3).unwrap().is_present());
        assert_eq!(grid.relative(origin), (0, 0));
        assert_eq!(grid.absolute(0, 0).unwrap(), origin);
    }

    #[test]
    fn test_expand_south_east_appends() {
        let mut grid = grid_with_tile_at_origin();
        grid.expand(Direction::South, 2).unwrap();
        grid.expand(Direction::East, 1).unwrap();
        assert_eq!(grid.num_rows(), 3);
        assert_eq!(grid.num_cols(), 2);
        assert!(grid.tile_at(0, 0).unwrap().is_present());
        assert_eq!(grid.rows().filter(|row| row.len() == 2).count(), 3);
    }

    #[test]
    fn test_expand_zero_is_noop() {
        let mut grid = grid_with_tile_at_origin();
        let before = grid.clone();
        grid.expand(Direction::West, 0).unwrap();
        assert_eq!(grid, before);
    }

    #[test]
    fn test_expand_beyond_cell_limit_is_rejected() {
        let mut grid = grid_with_tile_at_origin();
        let before = grid.clone();
        for (dir, amount) in [
            (Direction::North, usize::MAX / 2),
            (Direction::East, usize::MAX),
            (Direction::South, MAX_GRID_CELLS),
        ] {
            assert!(
                matches!(grid.expand(dir, amount), Err(MapError::InvalidGeometry(_))),
                "{} by {}",
                dir,
                amount
            );
            assert_eq!(grid, before);
        }

        // a tall grid caps the width it can grow to
        grid.expand(Direction::South, 1 << 16).unwrap();
        assert!(grid.expand(Direction::East, 1023).is_err());
        assert_eq!(grid.num_cols(), 1);
        grid.expand(Direction::East, 10).unwrap();
        assert_eq!(grid.num_cols(), 11);
    }

    #[test]
    fn test_extents_reject_oversized_grid() {
        assert!(matches!(
            Extents::new(usize::MAX, 1, 0, 1),
            Err(MapError::InvalidGeometry(_))
        ));
        assert!(Extents::new(0, 1 << 13, 0, 1 << 13).is_ok());
        assert!(Extents::new(0, 1 << 13, 0, (1 << 13) + 1).is_err());
    }

    #[test]
    fn test_expand_then_trim_restores_grid() {
        let original = grid_with_tile_at_origin();
        for dir in Direction::ALL {
            let mut grid = original.clone();
            grid.expand(dir, 4).unwrap();
            grid.trim();
            assert_eq!(grid, original, "direction {}", dir);
        }
    }

    #[test]
    fn test_trim_stops_at_present_tiles() {
        let mut grid = TileGrid::with_extents(Extents::new(2, 3, 2, 3).unwrap());
        // relative (-1, -1) and (1, 1)
        grid.set_tile(1, 1, Tile::present()).unwrap();
        grid.set_tile(3, 3, Tile::present()).unwrap();

        let removed = grid.trim();
        assert_eq!(removed, Extents { north: 1, south: 1, west: 1, east: 1 });
        assert_eq!(grid.extents(), Extents { north: 1, south: 2, west: 1, east: 2 });
        assert!(grid.absolute(-1, -1).map(|a| grid.tile_at(a.row, a.col).unwrap().is_present()).unwrap());
        assert!(grid.absolute(1, 1).map(|a| grid.tile_at(a.row, a.col).unwrap().is_present()).unwrap());
    }

    #[test]
    fn test_trim_never_drops_origin_cell() {
        let mut grid = TileGrid::with_extents(Extents::new(3, 4, 5, 6).unwrap());
        grid.trim();
        assert_eq!(grid.extents(), Extents::default());
        // Second trim at the minimum is a silent no-op
        let removed = grid.trim();
        assert_eq!(removed, Extents { north: 0, south: 0, west: 0, east: 0 });
        assert_eq!(grid.num_rows(), 1);
        assert_eq!(grid.num_cols(), 1);
    }

    #[test]
    fn test_trim_keeps_north_tiles_south_of_empty_origin() {
        // Tile only in the north half: south/east stay at their minimum of 1
        let mut grid = TileGrid::with_extents(Extents::new(2, 2, 0, 1).unwrap());
        grid.set_tile(0, 0, Tile::present()).unwrap();
        grid.trim();
        assert_eq!(grid.extents(), Extents { north: 2, south: 1, west: 0, east: 1 });
        assert!(grid.tile_at(0, 0).unwrap().is_present());
    }

    #[test]
    fn test_from_rows_pads_ragged_input() {
        let rows = vec![vec![Tile::present()], vec![]];
        let grid = TileGrid::from_rows(Extents::new(0, 3, 0, 2).unwrap(), rows).unwrap();
        assert_eq!(grid.num_rows(), 3);
        assert!(grid.rows().all(|row| row.len() == 2));
        assert_eq!(grid.present_cells().collect::<Vec<_>>(), vec![CellAddress::new(0, 0)]);
    }

    #[test]
    fn test_from_rows_rejects_oversized_grid() {
        let rows = vec![vec![Tile::Absent, Tile::Absent]];
        let result = TileGrid::from_rows(Extents::default(), rows);
        assert!(matches!(result, Err(MapError::InvalidGeometry(_))));
    }

    #[test]
    fn test_extents_reject_empty_origin_span() {
        assert!(Extents::new(0, 0, 0, 1).is_err());
        assert!(Extents::new(0, 1, 0, 0).is_err());
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("N".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("west".parse::<Direction>().unwrap(), Direction::West);
        assert!("up".parse::<Direction>().is_err());
    }
}
