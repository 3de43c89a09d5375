//! Origin and connector point features.

use std::collections::{BTreeMap, BTreeSet};

use crate::geo::WorldPoint;
use crate::ids::{ConnectorId, GroupKey};
use crate::{SaError, SaResult};

// ── AttrValue ─────────────────────────────────────────────────────────────────

/// One attribute cell of a point feature.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Parse a raw table cell: numbers become `Number`, anything else `Text`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => AttrValue::Number(n),
            _ => AttrValue::Text(trimmed.to_owned()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(_) => None,
        }
    }

    /// Group key for this value.  Integral numbers key as `Int`, so `12`
    /// and `12.0` land in the same group.
    pub fn to_group_key(&self) -> GroupKey {
        match self {
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                GroupKey::Int(*n as i64)
            }
            AttrValue::Number(n) => GroupKey::Text(n.to_string()),
            AttrValue::Text(s) => GroupKey::Text(s.clone()),
        }
    }
}

// ── Origin ────────────────────────────────────────────────────────────────────

/// An origin (access) point with its attribute row.
#[derive(Clone, Debug, PartialEq)]
pub struct Origin {
    pub point:      WorldPoint,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Origin {
    pub fn new(point: WorldPoint) -> Self {
        Self { point, attributes: BTreeMap::new() }
    }

    /// Builder-style attribute setter, mostly for tests and demos.
    pub fn with_attr(mut self, field: &str, value: AttrValue) -> Self {
        self.attributes.insert(field.to_owned(), value);
        self
    }

    pub fn attr(&self, field: &str) -> Option<&AttrValue> {
        self.attributes.get(field)
    }

    /// Numeric value of `field`.
    ///
    /// # Errors
    ///
    /// [`SaError::MissingField`] if the attribute is absent,
    /// [`SaError::Parse`] if it is not numeric.
    pub fn number(&self, field: &str) -> SaResult<f64> {
        match self.attributes.get(field) {
            None => Err(SaError::MissingField {
                field: field.to_owned(),
                what:  format!("origin at {}", self.point),
            }),
            Some(AttrValue::Number(n)) => Ok(*n),
            Some(AttrValue::Text(s)) => Err(SaError::Parse(format!(
                "field {field:?} of origin at {} is not numeric: {s:?}",
                self.point
            ))),
        }
    }
}

// ── Connectors ────────────────────────────────────────────────────────────────

/// One snapped location of a connector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Connector {
    pub id:    ConnectorId,
    pub point: WorldPoint,
}

/// An immutable collection of connector points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectorSet {
    points: Vec<Connector>,
}

impl ConnectorSet {
    pub fn new(points: Vec<Connector>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Connector] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct connector ids, ascending.
    pub fn ids(&self) -> BTreeSet<ConnectorId> {
        self.points.iter().map(|c| c.id).collect()
    }

    /// Snapped points grouped by id, each list in input order.
    pub fn by_id(&self) -> BTreeMap<ConnectorId, Vec<WorldPoint>> {
        let mut map: BTreeMap<ConnectorId, Vec<WorldPoint>> = BTreeMap::new();
        for c in &self.points {
            map.entry(c.id).or_default().push(c.point);
        }
        map
    }
}
