//! CSV loaders for origin and connector points.
//!
//! # Origins
//!
//! ```csv
//! x,y,trail_id,score,minutes
//! 512300.5,4101200.0,12,4.5,30
//! 512410.0,4101350.0,12,3.0,45
//! 530000.0,4120000.0,north loop,,60
//! ```
//!
//! `x` and `y` are required.  Every other column becomes an attribute:
//! numeric cells are stored as numbers, anything else as text, and empty
//! cells are omitted.
//!
//! # Connectors
//!
//! ```csv
//! x,y,ramp_id
//! 515000.0,4105000.0,7
//! 515030.0,4105010.0,7
//! ```
//!
//! The id column is named by the caller and must hold non-negative integers
//! (`7.0` is accepted as `7`).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use log::debug;

use sa_core::{AttrValue, Connector, ConnectorId, ConnectorSet, Origin, SaError, WorldPoint};

use crate::{StoreError, StoreResult};

/// One CSV row keyed by header.
type Row = BTreeMap<String, String>;

// ── Origins ───────────────────────────────────────────────────────────────────

pub fn load_origins_csv(path: &Path) -> StoreResult<Vec<Origin>> {
    let origins = load_origins_reader(std::fs::File::open(path)?)?;
    debug!("loaded {} origins from {}", origins.len(), path.display());
    Ok(origins)
}

/// Like [`load_origins_csv`] but accepts any `Read` source.
pub fn load_origins_reader<R: Read>(reader: R) -> StoreResult<Vec<Origin>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut origins = Vec::new();

    for (line, result) in csv_reader.deserialize::<Row>().enumerate() {
        let mut row = result?;
        let point = take_point(&mut row, "origins", line)?;
        let mut origin = Origin::new(point);
        for (field, raw) in row {
            if raw.trim().is_empty() {
                continue;
            }
            origin.attributes.insert(field, AttrValue::parse(&raw));
        }
        origins.push(origin);
    }
    Ok(origins)
}

// ── Connectors ────────────────────────────────────────────────────────────────

pub fn load_connectors_csv(path: &Path, id_field: &str) -> StoreResult<ConnectorSet> {
    let set = load_connectors_reader(std::fs::File::open(path)?, id_field)?;
    debug!(
        "loaded {} connector points ({} ids) from {}",
        set.len(),
        set.ids().len(),
        path.display()
    );
    Ok(set)
}

/// Like [`load_connectors_csv`] but accepts any `Read` source.
pub fn load_connectors_reader<R: Read>(reader: R, id_field: &str) -> StoreResult<ConnectorSet> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let has_id = csv_reader.headers()?.iter().any(|h| h == id_field);
    if !has_id {
        return Err(SaError::MissingField {
            field: id_field.to_owned(),
            what:  "connector table".into(),
        }
        .into());
    }

    let mut points = Vec::new();
    for (line, result) in csv_reader.deserialize::<Row>().enumerate() {
        let mut row = result?;
        let point = take_point(&mut row, "connectors", line)?;
        let raw = row.get(id_field).map(String::as_str).unwrap_or("");
        let id = parse_id(raw).ok_or_else(|| {
            StoreError::format(
                "connectors",
                format!("row {}: {id_field} {raw:?} is not a non-negative integer", line + 1),
            )
        })?;
        points.push(Connector { id, point });
    }
    Ok(ConnectorSet::new(points))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn take_point(row: &mut Row, what: &'static str, line: usize) -> StoreResult<WorldPoint> {
    let mut coord = |key: &str| -> StoreResult<f64> {
        let raw = row.remove(key).ok_or_else(|| {
            StoreError::Core(SaError::MissingField { field: key.to_owned(), what: what.into() })
        })?;
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| StoreError::format(what, format!("row {}: {key} {raw:?}", line + 1)))
    };
    let x = coord("x")?;
    let y = coord("y")?;
    Ok(WorldPoint::new(x, y))
}

fn parse_id(raw: &str) -> Option<ConnectorId> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Some(ConnectorId(n));
    }
    let f = raw.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f >= 0.0 && f < u32::MAX as f64).then(|| ConnectorId(f as u32))
}
