//! Tile occupancy grid
//!
//! Cells are stored row-major. Throughout the crate `x` is the column and `y`
//! is the row, so cell `(x, y)` lives at `cells[y * width + x]`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Contents of a single tile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    Wall,
}

impl Cell {
    /// Map a numeric layout tag to a cell. Zero is open floor, anything else blocks.
    #[inline(always)]
    pub const fn from_tag(tag: u8) -> Self {
        if tag == 0 {
            Cell::Empty
        } else {
            Cell::Wall
        }
    }

    #[inline(always)]
    pub const fn tag(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Wall => 1,
        }
    }

    #[inline(always)]
    pub const fn blocks_ray(self) -> bool {
        matches!(self, Cell::Wall)
    }
}

/// Immutable W x H tile map.
///
/// Boundary policy: [`Grid::is_wall`] treats every coordinate outside the grid
/// as solid, so rays and movement can never leave the map. Use [`Grid::cell`]
/// for a strict lookup that reports [`Error::OutOfBounds`] instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid from rows of cells. Every row must have the same, non-zero length.
    pub fn new(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let height = rows.len();
        if height == 0 {
            return Err(Error::MalformedGrid("grid has no rows".into()));
        }
        let width = rows[0].len();
        if width == 0 {
            return Err(Error::MalformedGrid("grid rows are empty".into()));
        }

        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(Error::MalformedGrid(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    width
                )));
            }
            cells.extend(row);
        }

        log::debug!("grid {}x{} constructed", width, height);
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid from numeric tags (`0` empty, non-zero wall)
    pub fn from_tags<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        Self::new(
            rows.iter()
                .map(|row| row.as_ref().iter().map(|&t| Cell::from_tag(t)).collect())
                .collect(),
        )
    }

    /// Parse an ASCII layout, one row per line.
    ///
    /// `#` and `1` are walls; `.`, `0` and space are floor. Blank lines at the
    /// start and end are ignored, and leading indentation common to all rows is
    /// not stripped.
    pub fn parse(layout: &str) -> Result<Self> {
        let lines: Vec<&str> = layout
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .skip_while(|l| l.trim().is_empty())
            .collect();
        let end = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);

        let mut rows = Vec::with_capacity(end);
        for (y, line) in lines[..end].iter().enumerate() {
            let mut row = Vec::with_capacity(line.len());
            for (x, ch) in line.chars().enumerate() {
                let cell = match ch {
                    '#' | '1' => Cell::Wall,
                    '.' | '0' | ' ' => Cell::Empty,
                    other => {
                        return Err(Error::MalformedGrid(format!(
                            "unexpected {:?} at column {}, row {}",
                            other, x, y
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }
        Self::new(rows)
    }

    /// Decode a JSON array of tag rows, e.g. `[[1,1,1],[1,0,1],[1,1,1]]`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline(always)]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.contains(x, y) {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    /// Strict lookup
    pub fn cell(&self, x: i32, y: i32) -> Result<Cell> {
        self.index(x, y)
            .map(|i| self.cells[i])
            .ok_or(Error::OutOfBounds { x, y })
    }

    /// Whether `(x, y)` blocks rays and movement. Out-of-bounds is solid.
    #[inline(always)]
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        match self.index(x, y) {
            Some(i) => self.cells[i].blocks_ray(),
            None => true,
        }
    }

    /// [`Grid::is_wall`] for a continuous point, using the cell it falls in
    #[inline(always)]
    pub fn is_wall_at(&self, x: f64, y: f64) -> bool {
        self.is_wall(x.floor() as i32, y.floor() as i32)
    }

    /// Coordinates of every wall cell, row by row
    pub fn iter_walls(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.blocks_ray())
            .map(move |(i, _)| ((i % self.width) as i32, (i / self.width) as i32))
    }

    /// Distance from a grid edge to the furthest opposite corner, an upper
    /// bound on any ray that starts inside the grid
    pub fn diagonal(&self) -> f64 {
        ((self.width * self.width + self.height * self.height) as f64).sqrt()
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = Error;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self> {
        Self::from_tags(&rows)
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.cells
            .chunks(grid.width)
            .map(|row| row.iter().map(|c| c.tag()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Grid {
        Grid::from_tags(&[[1, 1, 1], [1, 0, 1], [1, 1, 1]]).unwrap()
    }

    #[test]
    fn test_is_wall_matches_tags() {
        let tags = [[1u8, 0, 1, 1], [0, 0, 1, 0]];
        let grid = Grid::from_tags(&tags).unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 2);
        for (y, row) in tags.iter().enumerate() {
            for (x, &tag) in row.iter().enumerate() {
                assert_eq!(grid.is_wall(x as i32, y as i32), tag != 0);
            }
        }
    }

    #[test]
    fn test_x_is_column_y_is_row() {
        let grid = Grid::from_tags(&[[0, 1, 0], [0, 0, 0]]).unwrap();
        assert!(grid.is_wall(1, 0));
        assert!(!grid.is_wall(0, 1));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows: Vec<Vec<u8>> = vec![vec![1, 1, 1], vec![1, 0], vec![1, 1, 1]];
        assert!(matches!(
            Grid::from_tags(&rows),
            Err(Error::MalformedGrid(_))
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let rows: Vec<Vec<u8>> = vec![];
        assert!(matches!(
            Grid::from_tags(&rows),
            Err(Error::MalformedGrid(_))
        ));
        let rows: Vec<Vec<u8>> = vec![vec![], vec![]];
        assert!(matches!(
            Grid::from_tags(&rows),
            Err(Error::MalformedGrid(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_is_solid() {
        let grid = Grid::from_tags(&[[0, 0], [0, 0]]).unwrap();
        assert!(!grid.is_wall(0, 0));
        assert!(grid.is_wall(-1, 0));
        assert!(grid.is_wall(0, -1));
        assert!(grid.is_wall(2, 0));
        assert!(grid.is_wall(0, 2));
        assert!(grid.is_wall_at(-0.01, 0.5));
    }

    #[test]
    fn test_strict_cell_lookup() {
        let grid = room();
        assert_eq!(grid.cell(1, 1).unwrap(), Cell::Empty);
        assert_eq!(grid.cell(0, 1).unwrap(), Cell::Wall);
        assert!(matches!(
            grid.cell(3, 0),
            Err(Error::OutOfBounds { x: 3, y: 0 })
        ));
    }

    #[test]
    fn test_parse_ascii_layout() {
        let grid = Grid::parse(
            "
####
#..#
#.##
####
",
        )
        .unwrap();
        assert_eq!((grid.width(), grid.height()), (4, 4));
        assert!(!grid.is_wall(1, 2));
        assert!(grid.is_wall(2, 2));
        assert!(matches!(
            Grid::parse("#x#"),
            Err(Error::MalformedGrid(_))
        ));
    }

    #[test]
    fn test_json_layout() {
        let grid = Grid::from_json("[[1,1,1],[1,0,1],[1,1,1]]").unwrap();
        assert_eq!(grid, room());
        assert_eq!(
            serde_json::to_string(&grid).unwrap(),
            "[[1,1,1],[1,0,1],[1,1,1]]"
        );
        assert!(Grid::from_json("[[1,1],[1]]").is_err());
    }

    #[test]
    fn test_iter_walls() {
        let grid = Grid::from_tags(&[[0, 1], [1, 0]]).unwrap();
        let walls: Vec<_> = grid.iter_walls().collect();
        assert_eq!(walls, vec![(1, 0), (0, 1)]);
    }
}
