//! Partitioning origins into groups and resolving per-group parameters.
//!
//! Everything here is computed up front, before any solve starts, so a
//! missing attribute or an invalid cutoff fails the run with no output
//! written.

use std::collections::BTreeMap;

use sa_core::{GroupKey, MaxCost, Origin, RunConfig, SaError, SaResult, ValuePolicy, WorldPoint};

/// One group of origins with its resolved parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct OriginGroup {
    pub key:      GroupKey,
    /// Persisted output name, e.g. `grp_12_servArea`.
    pub name:     String,
    pub origins:  Vec<Origin>,
    /// Travel-cost cutoff; `None` when unbounded.
    pub cutoff:   Option<f64>,
    /// Constant written by `ConstantFromField`; `None` for other policies.
    pub constant: Option<f64>,
}

impl OriginGroup {
    pub fn points(&self) -> Vec<WorldPoint> {
        self.origins.iter().map(|o| o.point).collect()
    }
}

/// Split `origins` by the value of `group_field`, ordered by key.
///
/// `None` puts every origin in one [`GroupKey::Implicit`] group.
///
/// # Errors
///
/// [`SaError::MissingField`] if an origin lacks `group_field`.
pub fn partition(origins: &[Origin], group_field: Option<&str>) -> SaResult<BTreeMap<GroupKey, Vec<Origin>>> {
    let mut groups: BTreeMap<GroupKey, Vec<Origin>> = BTreeMap::new();
    for o in origins {
        let key = match group_field {
            None => GroupKey::Implicit,
            Some(field) => o
                .attr(field)
                .ok_or_else(|| SaError::MissingField {
                    field: field.to_owned(),
                    what:  format!("origin at {}", o.point),
                })?
                .to_group_key(),
        };
        groups.entry(key).or_default().push(o.clone());
    }
    Ok(groups)
}

/// Smallest per-origin cutoff of the group.
pub fn group_cutoff(max_cost: &MaxCost, origins: &[Origin]) -> SaResult<Option<f64>> {
    let mut best: Option<f64> = None;
    for o in origins {
        if let Some(c) = max_cost.origin_cost(o)? {
            best = Some(best.map_or(c, |b| b.min(c)));
        }
    }
    Ok(best)
}

/// Smallest value of the constant field among the group's origins.
pub fn group_constant(policy: &ValuePolicy, origins: &[Origin]) -> SaResult<Option<f64>> {
    let Some(field) = policy.field() else {
        return Ok(None);
    };
    let mut best: Option<f64> = None;
    for o in origins {
        let v = o.number(field)?;
        best = Some(best.map_or(v, |b| b.min(v)));
    }
    Ok(best)
}

/// Partition and resolve every group of a run.
///
/// # Errors
///
/// Any attribute problem, a constant policy without a group cutoff, or two
/// groups whose keys map to the same output name.
pub fn plan_groups(config: &RunConfig, origins: &[Origin]) -> SaResult<Vec<OriginGroup>> {
    let mut plans = Vec::new();
    let mut names: BTreeMap<String, GroupKey> = BTreeMap::new();

    for (key, members) in partition(origins, config.group_field.as_deref())? {
        let name = key.output_name();
        if let Some(prev) = names.insert(name.clone(), key.clone()) {
            return Err(SaError::Config(format!(
                "groups {prev} and {key} both map to output {name}"
            )));
        }
        let cutoff = group_cutoff(&config.max_cost, &members)?;
        if config.value_policy.needs_cutoff() && cutoff.is_none() {
            return Err(SaError::Config(format!("group {key} has no cutoff for a constant policy")));
        }
        let constant = group_constant(&config.value_policy, &members)?;
        plans.push(OriginGroup { key, name, origins: members, cutoff, constant });
    }
    Ok(plans)
}
