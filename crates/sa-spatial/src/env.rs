//! Explicit analysis context handed to every oracle call.
//!
//! There is no ambient "current extent" or "snap raster": each group builds
//! one immutable `AnalysisEnv` and passes it down, so concurrent groups
//! never observe each other's settings.

use sa_core::{Envelope, GridSpec, GridWindow, WorldPoint};

use crate::{SpatialError, SpatialResult};

/// Grid of the cost surfaces plus the window a group's computation is
/// restricted to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnalysisEnv {
    /// Grid shared by both cost surfaces.
    pub grid:   GridSpec,
    /// Block of `grid` that oracle outputs cover.
    pub window: GridWindow,
}

impl AnalysisEnv {
    /// Unrestricted context covering the whole grid.
    pub fn full(grid: GridSpec) -> Self {
        Self { grid, window: grid.full_window() }
    }

    /// Context restricted to `points` buffered by `radius` map units.
    ///
    /// With `radius == None` the whole grid is used.
    ///
    /// # Errors
    ///
    /// [`SpatialError::EmptyWindow`] if `points` is empty or the buffered
    /// extent does not overlap the grid.
    pub fn around(grid: GridSpec, points: &[WorldPoint], radius: Option<f64>) -> SpatialResult<Self> {
        let Some(radius) = radius else {
            return Ok(Self::full(grid));
        };
        let env = Envelope::from_points(points)
            .ok_or(SpatialError::EmptyWindow)?
            .buffered(radius);
        let window = grid.window_for(&env).ok_or(SpatialError::EmptyWindow)?;
        Ok(Self { grid, window })
    }

    /// Spec of rasters produced under this context.
    pub fn output_spec(&self) -> GridSpec {
        self.grid.sub_spec(&self.window)
    }

    /// Map extent of the window.
    pub fn extent(&self) -> Envelope {
        self.output_spec().envelope()
    }

    /// Row-major index into an output raster of the cell containing `p`.
    pub fn local_index(&self, p: WorldPoint) -> Option<usize> {
        let parent = self.grid.cell_of(p)?;
        let local = self.window.to_local(parent)?;
        Some(self.output_spec().index(local))
    }

    /// Fail unless `spec` is the analysis grid.
    pub fn check_grid(&self, spec: &GridSpec) -> SpatialResult<()> {
        if self.grid.same_as(spec) {
            Ok(())
        } else {
            Err(SpatialError::GridMismatch { expected: self.grid, got: *spec })
        }
    }
}
