//! Best-known connector arrival costs, one record per sheet.
//!
//! Both records follow one update rule: a candidate cost is accepted for a
//! connector only if the connector has no entry yet, or the candidate is
//! lower than the stored cost by more than the tolerance.  Stored costs can
//! therefore only ever decrease.

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use sa_core::{ConnectorId, Sheet};

// ── ArrivalRecord ─────────────────────────────────────────────────────────────

/// `ConnectorId → best arrival cost` on one sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrivalRecord {
    costs:     BTreeMap<ConnectorId, f64>,
    tolerance: f64,
}

impl ArrivalRecord {
    pub fn new(tolerance: f64) -> Self {
        Self { costs: BTreeMap::new(), tolerance }
    }

    /// Offer `cost` for `id`.  Returns `true` if it was recorded.
    pub fn offer(&mut self, id: ConnectorId, cost: f64) -> bool {
        if !cost.is_finite() {
            return false;
        }
        match self.costs.get(&id) {
            Some(&stored) if cost >= stored - self.tolerance => false,
            _ => {
                self.costs.insert(id, cost);
                true
            }
        }
    }

    /// Offer every candidate in ascending id order and return the ids that
    /// improved.
    pub fn merge(&mut self, candidates: &BTreeMap<ConnectorId, f64>) -> BTreeSet<ConnectorId> {
        candidates
            .iter()
            .filter(|&(&id, &cost)| self.offer(id, cost))
            .map(|(&id, _)| id)
            .collect()
    }

    #[inline]
    pub fn get(&self, id: ConnectorId) -> Option<f64> {
        self.costs.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Recorded ids, ascending.
    pub fn ids(&self) -> BTreeSet<ConnectorId> {
        self.costs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConnectorId, f64)> + '_ {
        self.costs.iter().map(|(&id, &c)| (id, c))
    }
}

// ── RampTracker ───────────────────────────────────────────────────────────────

/// The pair of arrival records used during one group's solve.
#[derive(Clone, Debug, PartialEq)]
pub struct RampTracker {
    pub local:   ArrivalRecord,
    pub highway: ArrivalRecord,
}

impl RampTracker {
    pub fn new(tolerance: f64) -> Self {
        Self {
            local:   ArrivalRecord::new(tolerance),
            highway: ArrivalRecord::new(tolerance),
        }
    }

    pub fn record(&self, sheet: Sheet) -> &ArrivalRecord {
        match sheet {
            Sheet::Local => &self.local,
            Sheet::Highway => &self.highway,
        }
    }

    /// Merge sampled `candidates` into the record of `sheet`.
    pub fn update(
        &mut self,
        sheet:      Sheet,
        candidates: &BTreeMap<ConnectorId, f64>,
    ) -> BTreeSet<ConnectorId> {
        let record = match sheet {
            Sheet::Local => &mut self.local,
            Sheet::Highway => &mut self.highway,
        };
        let improved = record.merge(candidates);
        trace!(
            "{sheet} arrivals: {} candidates, {} improved, {} recorded",
            candidates.len(),
            improved.len(),
            record.len()
        );
        improved
    }
}
