//! Merge a group's passes into its service-area raster.

use sa_core::{Raster, ValuePolicy};
use sa_spatial::cellwise_minimum;

use crate::{PassRaster, SolverError, SolverResult};

/// Cellwise minimum of `passes`, then `policy` applied to every cell.
///
/// | Policy                  | Reached cell (cost ≤ cutoff)  | Other cells |
/// |-------------------------|-------------------------------|-------------|
/// | `Actual`                | minimum cost                  | no-data     |
/// | `Rounded`               | minimum cost, nearest integer | no-data     |
/// | `ConstantFromField(_)`  | `group_value`                 | no-data     |
/// | `ConstantValue(v)`      | `v`                           | no-data     |
///
/// `Rounded` rounds halves away from zero.  The passes are not modified.
///
/// # Errors
///
/// [`SolverError::Compose`] for an empty pass list, a constant policy
/// without a cutoff, or `ConstantFromField` without a `group_value`.
pub fn compose(
    passes:      &[PassRaster],
    cutoff:      Option<f64>,
    policy:      &ValuePolicy,
    group_value: Option<f64>,
) -> SolverResult<Raster> {
    if passes.is_empty() {
        return Err(SolverError::Compose("no passes to compose".into()));
    }
    let rasters: Vec<&Raster> = passes.iter().map(|p| &p.raster).collect();
    let merged = cellwise_minimum(&rasters)?;

    match policy {
        ValuePolicy::Actual => Ok(merged),
        ValuePolicy::Rounded => Ok(merged.map_defined(|v| Some(v.round()))),
        ValuePolicy::ConstantFromField(field) => {
            let value = group_value.ok_or_else(|| {
                SolverError::Compose(format!("no group value for constant field {field:?}"))
            })?;
            constant(&merged, cutoff, value)
        }
        ValuePolicy::ConstantValue(value) => constant(&merged, cutoff, *value),
    }
}

fn constant(merged: &Raster, cutoff: Option<f64>, value: f64) -> SolverResult<Raster> {
    let cutoff = cutoff.ok_or_else(|| {
        SolverError::Compose("a constant value policy needs a cutoff".into())
    })?;
    if !value.is_finite() {
        return Err(SolverError::Compose(format!("constant value {value} is not finite")));
    }
    Ok(merged.map_defined(|v| (v <= cutoff).then_some(value)))
}
