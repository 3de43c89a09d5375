//! R-tree index over connector points.
//!
//! Built once per run from the full connector set and shared read-only by
//! every worker.  Each group asks it for the connectors inside its search
//! window, getting back a fresh [`ConnectorSet`]; the full set is never
//! filtered in place.

use rstar::{RTree, RTreeObject, AABB};

use sa_core::{Connector, ConnectorSet, Envelope};

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// Entry stored in the R-tree: a connector plus its position in the input
/// so query results can be returned in input order.
#[derive(Clone)]
struct ConnectorEntry {
    point:     [f64; 2],
    seq:       usize,
    connector: Connector,
}

impl RTreeObject for ConnectorEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

// ── ConnectorIndex ────────────────────────────────────────────────────────────

/// Spatial index over every connector point of a run.
pub struct ConnectorIndex {
    tree:  RTree<ConnectorEntry>,
    count: usize,
}

impl ConnectorIndex {
    /// Bulk-load the index.  O(N log N).
    pub fn new(connectors: &ConnectorSet) -> Self {
        let entries: Vec<ConnectorEntry> = connectors
            .points()
            .iter()
            .enumerate()
            .map(|(seq, c)| ConnectorEntry { point: [c.point.x, c.point.y], seq, connector: *c })
            .collect();
        Self { count: entries.len(), tree: RTree::bulk_load(entries) }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Connectors inside `env` (inclusive), in input order.
    pub fn within(&self, env: &Envelope) -> ConnectorSet {
        let bbox = AABB::from_corners([env.min_x, env.min_y], [env.max_x, env.max_y]);
        let mut hits: Vec<&ConnectorEntry> = self.tree.locate_in_envelope(&bbox).collect();
        hits.sort_unstable_by_key(|e| e.seq);
        ConnectorSet::new(hits.into_iter().map(|e| e.connector).collect())
    }
}
