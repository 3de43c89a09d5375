//! Single-band `f64` rasters and the two cost sheets.
//!
//! No-data is stored as NaN internally and never leaks out of the public
//! API: every accessor returns `Option<f64>`.

use std::fmt;

use crate::grid::{CellPos, GridSpec, GridWindow};
use crate::{SaError, SaResult};

const NO_DATA: f64 = f64::NAN;

// ── Raster ────────────────────────────────────────────────────────────────────

/// A row-major grid of optional `f64` values.
#[derive(Clone, Debug)]
pub struct Raster {
    spec:  GridSpec,
    cells: Vec<f64>,
}

impl Raster {
    /// A raster where every cell is no-data.
    pub fn empty(spec: GridSpec) -> Self {
        Self { cells: vec![NO_DATA; spec.cell_count()], spec }
    }

    /// Build from row-major optional values.
    ///
    /// # Errors
    ///
    /// [`SaError::Config`] if `values.len()` does not match the spec.
    pub fn from_values(spec: GridSpec, values: Vec<Option<f64>>) -> SaResult<Self> {
        if values.len() != spec.cell_count() {
            return Err(SaError::Config(format!(
                "raster has {} values but grid is {}x{}",
                values.len(),
                spec.ncols,
                spec.nrows
            )));
        }
        let cells = values
            .into_iter()
            .map(|v| match v {
                Some(x) if x.is_finite() => x,
                _ => NO_DATA,
            })
            .collect();
        Ok(Self { spec, cells })
    }

    /// Build a raster with every cell set to `value`.
    pub fn filled(spec: GridSpec, value: f64) -> Self {
        Self { cells: vec![value; spec.cell_count()], spec }
    }

    #[inline]
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, pos: CellPos) -> Option<f64> {
        self.get_index(self.spec.index(pos))
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> Option<f64> {
        let v = self.cells[index];
        if v.is_nan() { None } else { Some(v) }
    }

    #[inline]
    pub fn set(&mut self, pos: CellPos, value: Option<f64>) {
        let i = self.spec.index(pos);
        self.set_index(i, value);
    }

    #[inline]
    pub fn set_index(&mut self, index: usize, value: Option<f64>) {
        self.cells[index] = match value {
            Some(x) if x.is_finite() => x,
            _ => NO_DATA,
        };
    }

    /// Row-major iterator over every cell value.
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.cells.iter().map(|&v| if v.is_nan() { None } else { Some(v) })
    }

    /// Number of cells holding a value.
    pub fn defined_count(&self) -> usize {
        self.cells.iter().filter(|v| !v.is_nan()).count()
    }

    /// Largest defined value, or `None` if every cell is no-data.
    pub fn max_value(&self) -> Option<f64> {
        self.values().flatten().reduce(f64::max)
    }

    /// Apply `f` to every defined cell; no-data stays no-data.
    pub fn map_defined<F>(&self, mut f: F) -> Raster
    where
        F: FnMut(f64) -> Option<f64>,
    {
        let cells = self
            .cells
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    NO_DATA
                } else {
                    match f(v) {
                        Some(x) if x.is_finite() => x,
                        _ => NO_DATA,
                    }
                }
            })
            .collect();
        Raster { spec: self.spec, cells }
    }

    /// Copy the cells inside `window` into a new raster on the sub-grid.
    pub fn crop(&self, window: &GridWindow) -> Raster {
        let sub = self.spec.sub_spec(window);
        let mut cells = Vec::with_capacity(sub.cell_count());
        for r in 0..window.nrows {
            let start = self.spec.index(window.to_parent(CellPos::new(r, 0)));
            cells.extend_from_slice(&self.cells[start..start + window.ncols as usize]);
        }
        Raster { spec: sub, cells }
    }
}

impl PartialEq for Raster {
    /// Bit-identical comparison; two no-data cells compare equal.
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
            && self.cells.len() == other.cells.len()
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits())
    }
}

// ── Sheet ─────────────────────────────────────────────────────────────────────

/// Which of the two cost sheets a surface or pass belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sheet {
    /// Ordinary roads.
    Local,
    /// Limited-access highways, reachable only through connectors.
    Highway,
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sheet::Local => f.write_str("local"),
            Sheet::Highway => f.write_str("highway"),
        }
    }
}

// ── CostSurface ───────────────────────────────────────────────────────────────

/// An immutable cost-per-unit-distance raster for one sheet.
///
/// No-data cells are impassable.
#[derive(Clone, Debug)]
pub struct CostSurface {
    sheet:  Sheet,
    raster: Raster,
}

impl CostSurface {
    /// Wrap `raster` as the cost surface for `sheet`.
    ///
    /// # Errors
    ///
    /// [`SaError::Config`] if any defined cell is zero or negative.
    pub fn new(sheet: Sheet, raster: Raster) -> SaResult<Self> {
        if let Some(bad) = raster.values().flatten().find(|&v| v <= 0.0) {
            return Err(SaError::Config(format!(
                "{sheet} cost surface contains non-positive cost {bad}"
            )));
        }
        Ok(Self { sheet, raster })
    }

    #[inline]
    pub fn sheet(&self) -> Sheet {
        self.sheet
    }

    #[inline]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    #[inline]
    pub fn spec(&self) -> &GridSpec {
        self.raster.spec()
    }
}
