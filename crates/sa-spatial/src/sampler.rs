//! Sampling rasters at connector locations.

use std::collections::BTreeMap;

use sa_core::{ConnectorId, ConnectorSet, Raster};

use crate::SpatialResult;

/// Pluggable "extract values to points" engine.
///
/// Returns one entry per connector id that has a value.  An id is absent
/// when every one of its points falls outside the raster or on no-data.
pub trait Sampler: Send + Sync {
    fn sample_at(
        &self,
        raster:     &Raster,
        connectors: &ConnectorSet,
    ) -> SpatialResult<BTreeMap<ConnectorId, f64>>;
}

/// Reads the value of the cell containing each point.
///
/// When several points share an id, the id's value is the smallest of its
/// points' values: a ramp is reached as soon as any of its snapped
/// locations is.
pub struct CellSampler;

impl Sampler for CellSampler {
    fn sample_at(
        &self,
        raster:     &Raster,
        connectors: &ConnectorSet,
    ) -> SpatialResult<BTreeMap<ConnectorId, f64>> {
        let spec = raster.spec();
        let mut out: BTreeMap<ConnectorId, f64> = BTreeMap::new();
        for c in connectors.points() {
            let Some(value) = spec.cell_of(c.point).and_then(|pos| raster.get(pos)) else {
                continue;
            };
            out.entry(c.id)
                .and_modify(|v| *v = v.min(value))
                .or_insert(value);
        }
        Ok(out)
    }
}
