//! The data a batch run operates on.

use std::sync::Arc;

use log::info;

use sa_core::{ConnectorSet, CostSurface, Origin, RunConfig, Sheet};
use sa_store::{load_connectors_csv, load_origins_csv, read_asc};

use crate::BatchResult;

/// Origins, both cost surfaces, and the connector points of one run.
///
/// Surfaces are behind `Arc` so callers can share one loaded pair between
/// several runners.
#[derive(Clone, Debug)]
pub struct BatchInputs {
    pub origins:    Vec<Origin>,
    pub local:      Arc<CostSurface>,
    pub highway:    Arc<CostSurface>,
    pub connectors: ConnectorSet,
}

impl BatchInputs {
    pub fn new(
        origins:    Vec<Origin>,
        local:      CostSurface,
        highway:    CostSurface,
        connectors: ConnectorSet,
    ) -> Self {
        Self {
            origins,
            local: Arc::new(local),
            highway: Arc::new(highway),
            connectors,
        }
    }

    /// Load every input named by `config`.
    pub fn load(config: &RunConfig) -> BatchResult<Self> {
        let origins = load_origins_csv(&config.origins)?;
        let local = CostSurface::new(Sheet::Local, read_asc(&config.local_surface)?)?;
        let highway = CostSurface::new(Sheet::Highway, read_asc(&config.highway_surface)?)?;
        let connectors = load_connectors_csv(&config.connectors, &config.connector_id_field)?;
        info!(
            "inputs: {} origins, {}x{} grid, {} connector points",
            origins.len(),
            local.spec().ncols,
            local.spec().nrows,
            connectors.len()
        );
        Ok(Self::new(origins, local, highway, connectors))
    }
}
