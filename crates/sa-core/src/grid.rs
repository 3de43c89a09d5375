//! Grid geometry: cell addressing, world ↔ cell conversion, and windows.
//!
//! # Layout
//!
//! A grid is `nrows × ncols` square cells anchored at its lower-left corner
//! `(xll, yll)`.  Row 0 is the **top** row (matching the ESRI ASCII grid
//! layout), so the centre of cell `(row, col)` is
//!
//! ```text
//! x = xll + (col + 0.5) · cell_size
//! y = yll + (nrows − row − 0.5) · cell_size
//! ```
//!
//! Cell storage is row-major: `index = row · ncols + col`.

use crate::geo::{Envelope, WorldPoint};

/// Relative tolerance used when comparing grid origins and cell sizes.
const ALIGN_EPS: f64 = 1e-9;

// ── CellPos ───────────────────────────────────────────────────────────────────

/// Row/column address of a cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CellPos {
    pub row: u32,
    pub col: u32,
}

impl CellPos {
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

// ── GridSpec ──────────────────────────────────────────────────────────────────

/// Dimensions, extent and resolution of a raster.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSpec {
    pub ncols:     u32,
    pub nrows:     u32,
    /// X of the lower-left corner of the lower-left cell.
    pub xll:       f64,
    /// Y of the lower-left corner of the lower-left cell.
    pub yll:       f64,
    pub cell_size: f64,
}

impl GridSpec {
    pub fn new(ncols: u32, nrows: u32, xll: f64, yll: f64, cell_size: f64) -> Self {
        Self { ncols, nrows, xll, yll, cell_size }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.ncols as usize * self.nrows as usize
    }

    /// Y of the top edge of the grid.
    #[inline]
    pub fn y_top(&self) -> f64 {
        self.yll + self.nrows as f64 * self.cell_size
    }

    /// X of the right edge of the grid.
    #[inline]
    pub fn x_right(&self) -> f64 {
        self.xll + self.ncols as f64 * self.cell_size
    }

    pub fn envelope(&self) -> Envelope {
        Envelope {
            min_x: self.xll,
            min_y: self.yll,
            max_x: self.x_right(),
            max_y: self.y_top(),
        }
    }

    #[inline]
    pub fn index(&self, pos: CellPos) -> usize {
        pos.row as usize * self.ncols as usize + pos.col as usize
    }

    #[inline]
    pub fn pos(&self, index: usize) -> CellPos {
        let ncols = self.ncols as usize;
        CellPos::new((index / ncols) as u32, (index % ncols) as u32)
    }

    /// The cell containing `p`, or `None` if `p` lies outside the grid.
    ///
    /// Points on the right or bottom outer edge belong to no cell.
    pub fn cell_of(&self, p: WorldPoint) -> Option<CellPos> {
        let col = ((p.x - self.xll) / self.cell_size).floor();
        let row = ((self.y_top() - p.y) / self.cell_size).floor();
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        if col < 0.0 || row < 0.0 || col >= self.ncols as f64 || row >= self.nrows as f64 {
            return None;
        }
        Some(CellPos::new(row as u32, col as u32))
    }

    /// Centre of the cell at `pos`.
    pub fn center(&self, pos: CellPos) -> WorldPoint {
        WorldPoint::new(
            self.xll + (pos.col as f64 + 0.5) * self.cell_size,
            self.yll + (self.nrows as f64 - pos.row as f64 - 0.5) * self.cell_size,
        )
    }

    /// Window covering the whole grid.
    pub fn full_window(&self) -> GridWindow {
        GridWindow { row0: 0, col0: 0, nrows: self.nrows, ncols: self.ncols }
    }

    /// Window of whole cells covering `env`, snapped outward and clamped to
    /// the grid.  `None` if `env` does not overlap the grid.
    pub fn window_for(&self, env: &Envelope) -> Option<GridWindow> {
        let cs = self.cell_size;
        let col_start = ((env.min_x - self.xll) / cs).floor().max(0.0);
        let col_end = ((env.max_x - self.xll) / cs).ceil().min(self.ncols as f64);
        let row_start = ((self.y_top() - env.max_y) / cs).floor().max(0.0);
        let row_end = ((self.y_top() - env.min_y) / cs).ceil().min(self.nrows as f64);

        if !(col_start < col_end && row_start < row_end) {
            return None;
        }
        Some(GridWindow {
            row0:  row_start as u32,
            col0:  col_start as u32,
            nrows: (row_end - row_start) as u32,
            ncols: (col_end - col_start) as u32,
        })
    }

    /// Spec of the sub-grid covered by `window`.
    pub fn sub_spec(&self, window: &GridWindow) -> GridSpec {
        GridSpec {
            ncols:     window.ncols,
            nrows:     window.nrows,
            xll:       self.xll + window.col0 as f64 * self.cell_size,
            yll:       self.y_top() - (window.row0 + window.nrows) as f64 * self.cell_size,
            cell_size: self.cell_size,
        }
    }

    /// `true` if both grids have identical dimensions, origin and cell size.
    pub fn same_as(&self, other: &GridSpec) -> bool {
        self.ncols == other.ncols
            && self.nrows == other.nrows
            && approx_eq(self.xll, other.xll, self.cell_size)
            && approx_eq(self.yll, other.yll, self.cell_size)
            && approx_eq(self.cell_size, other.cell_size, self.cell_size)
    }
}

fn approx_eq(a: f64, b: f64, scale: f64) -> bool {
    (a - b).abs() <= ALIGN_EPS * scale.abs().max(1.0)
}

// ── GridWindow ────────────────────────────────────────────────────────────────

/// A rectangular block of cells inside a parent grid, in parent coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridWindow {
    pub row0:  u32,
    pub col0:  u32,
    pub nrows: u32,
    pub ncols: u32,
}

impl GridWindow {
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.nrows as usize * self.ncols as usize
    }

    /// Translate a parent-grid cell into window-local coordinates.
    pub fn to_local(&self, pos: CellPos) -> Option<CellPos> {
        if pos.row < self.row0
            || pos.col < self.col0
            || pos.row >= self.row0 + self.nrows
            || pos.col >= self.col0 + self.ncols
        {
            return None;
        }
        Some(CellPos::new(pos.row - self.row0, pos.col - self.col0))
    }

    /// Translate a window-local cell back into parent-grid coordinates.
    #[inline]
    pub fn to_parent(&self, local: CellPos) -> CellPos {
        CellPos::new(local.row + self.row0, local.col + self.col0)
    }
}
