//! Cellwise raster operations.

use sa_core::Raster;

use crate::{SpatialError, SpatialResult};

/// Cellwise minimum over `rasters`.
///
/// A cell is no-data only if it is no-data in every input ("DATA" mode of
/// classic cell statistics).
///
/// # Errors
///
/// [`SpatialError::NoInputs`] for an empty slice,
/// [`SpatialError::GridMismatch`] if the inputs do not share one grid.
pub fn cellwise_minimum(rasters: &[&Raster]) -> SpatialResult<Raster> {
    let (first, rest) = rasters.split_first().ok_or(SpatialError::NoInputs)?;
    let spec = *first.spec();
    if let Some(other) = rest.iter().find(|r| !r.spec().same_as(&spec)) {
        return Err(SpatialError::GridMismatch { expected: spec, got: *other.spec() });
    }

    let mut out = (*first).clone();
    for r in rest {
        for (i, v) in r.values().enumerate() {
            let Some(v) = v else { continue };
            match out.get_index(i) {
                Some(cur) if cur <= v => {}
                _ => out.set_index(i, Some(v)),
            }
        }
    }
    Ok(out)
}
