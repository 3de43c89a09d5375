//! Run configuration.
//!
//! Loaded from JSON by the application binary (feature `serde`) or built
//! directly in code.  Nothing here is global: the batch runner receives a
//! `&RunConfig` and passes what each stage needs explicitly.

use std::path::PathBuf;

use crate::features::Origin;
use crate::{SaError, SaResult};

// ── MaxCost ───────────────────────────────────────────────────────────────────

/// How the travel-cost cutoff of each group is determined.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MaxCost {
    /// Unbounded: every reachable cell is reported.
    #[default]
    None,
    /// The same cutoff for every group.
    Constant(f64),
    /// Per-origin cutoff read from a numeric attribute; a group uses the
    /// smallest value among its origins.
    Field(String),
    /// Per-origin cutoff derived from a score attribute:
    /// `min(round1(coefficient · log10(score + offset)), cap)`.
    ScoreCurve {
        field:       String,
        coefficient: f64,
        offset:      f64,
        cap:         f64,
    },
}

impl MaxCost {
    pub fn is_bounded(&self) -> bool {
        !matches!(self, MaxCost::None)
    }

    /// Attribute field this variant reads from each origin, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            MaxCost::Field(f) | MaxCost::ScoreCurve { field: f, .. } => Some(f),
            MaxCost::None | MaxCost::Constant(_) => None,
        }
    }

    /// Cutoff contributed by one origin, rounded to one decimal place.
    ///
    /// # Errors
    ///
    /// Missing or non-numeric attribute, or a result that is not a finite
    /// positive number.
    pub fn origin_cost(&self, origin: &Origin) -> SaResult<Option<f64>> {
        let cost = match self {
            MaxCost::None => return Ok(None),
            MaxCost::Constant(c) => *c,
            MaxCost::Field(field) => origin.number(field)?,
            MaxCost::ScoreCurve { field, coefficient, offset, cap } => {
                let score = origin.number(field)?;
                round1(coefficient * (score + offset).log10()).min(*cap)
            }
        };
        let cost = round1(cost);
        if !(cost.is_finite() && cost > 0.0) {
            return Err(SaError::Config(format!(
                "max cost resolves to {cost} for origin at {}; expected a positive number",
                origin.point
            )));
        }
        Ok(Some(cost))
    }
}

/// Round to one decimal place.
#[inline]
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ── ValuePolicy ───────────────────────────────────────────────────────────────

/// What the persisted service-area raster holds in each reached cell.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValuePolicy {
    /// The minimum accumulated cost.
    #[default]
    Actual,
    /// The minimum accumulated cost rounded to the nearest integer.
    Rounded,
    /// A per-group constant read from an origin attribute.
    ConstantFromField(String),
    /// A literal constant.
    ConstantValue(f64),
}

impl ValuePolicy {
    /// Constant policies only make sense inside a bounded service area.
    pub fn needs_cutoff(&self) -> bool {
        matches!(self, ValuePolicy::ConstantFromField(_) | ValuePolicy::ConstantValue(_))
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ValuePolicy::ConstantFromField(f) => Some(f),
            _ => None,
        }
    }
}

// ── SolverParams ──────────────────────────────────────────────────────────────

/// Tuning knobs of the convergence solver and extent restriction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverParams {
    /// A connector's arrival cost is only replaced by a value lower by more
    /// than this.  Default: 1.0 (one minute for minute-based surfaces).
    pub tolerance: f64,

    /// Fastest assumed travel speed in map units per cost unit.  The search
    /// extent of a group is its origins buffered by `cutoff × max_speed`.
    /// Default: 1900 (metres per minute, ~114 km/h).
    pub max_speed: f64,

    /// Optional hard cap on highway/local alternations.  `None` lets the
    /// loop run to its fixed point.
    pub max_iterations: Option<usize>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self { tolerance: 1.0, max_speed: 1900.0, max_iterations: None }
    }
}

// ── RunConfig ─────────────────────────────────────────────────────────────────

/// Top-level batch configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// Output store (a directory, or the SQLite database's directory).
    pub output: PathBuf,

    /// Origin features (CSV with `x`, `y` and attribute columns).
    pub origins: PathBuf,

    /// Local-road cost surface (ESRI ASCII grid).
    pub local_surface: PathBuf,

    /// Highway cost surface; must share the local surface's grid.
    pub highway_surface: PathBuf,

    /// Connector points (CSV with `x`, `y` and the id column).
    pub connectors: PathBuf,

    /// Column of `connectors` holding the connector id.
    pub connector_id_field: String,

    /// Grouping attribute of the origins.  `None` → one implicit group.
    #[cfg_attr(feature = "serde", serde(default))]
    pub group_field: Option<String>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub max_cost: MaxCost,

    #[cfg_attr(feature = "serde", serde(default))]
    pub value_policy: ValuePolicy,

    #[cfg_attr(feature = "serde", serde(default))]
    pub solver: SolverParams,

    /// Worker thread count passed to Rayon.  `None` uses all logical cores.
    #[cfg_attr(feature = "serde", serde(default))]
    pub num_threads: Option<usize>,
}

impl RunConfig {
    /// A configuration with default policy settings and the given paths.
    pub fn new(
        output:             impl Into<PathBuf>,
        origins:            impl Into<PathBuf>,
        local_surface:      impl Into<PathBuf>,
        highway_surface:    impl Into<PathBuf>,
        connectors:         impl Into<PathBuf>,
        connector_id_field: impl Into<String>,
    ) -> Self {
        Self {
            output:             output.into(),
            origins:            origins.into(),
            local_surface:      local_surface.into(),
            highway_surface:    highway_surface.into(),
            connectors:         connectors.into(),
            connector_id_field: connector_id_field.into(),
            group_field:        None,
            max_cost:           MaxCost::None,
            value_policy:       ValuePolicy::Actual,
            solver:             SolverParams::default(),
            num_threads:        None,
        }
    }

    /// Check option combinations that are invalid regardless of the data.
    ///
    /// # Errors
    ///
    /// [`SaError::Config`] describing the first problem found.
    pub fn validate(&self) -> SaResult<()> {
        if self.value_policy.needs_cutoff() && !self.max_cost.is_bounded() {
            return Err(SaError::Config(format!(
                "value policy {:?} requires a max cost",
                self.value_policy
            )));
        }
        if let MaxCost::Constant(c) = self.max_cost {
            if !(c.is_finite() && c > 0.0) {
                return Err(SaError::Config(format!("max cost must be positive, got {c}")));
            }
        }
        if let ValuePolicy::ConstantValue(v) = self.value_policy {
            if !v.is_finite() {
                return Err(SaError::Config(format!("constant value must be finite, got {v}")));
            }
        }
        let p = &self.solver;
        if !(p.tolerance.is_finite() && p.tolerance >= 0.0) {
            return Err(SaError::Config(format!(
                "solver tolerance must be non-negative, got {}",
                p.tolerance
            )));
        }
        if !(p.max_speed.is_finite() && p.max_speed > 0.0) {
            return Err(SaError::Config(format!(
                "max speed must be positive, got {}",
                p.max_speed
            )));
        }
        if self.num_threads == Some(0) {
            return Err(SaError::Config("num_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Canonical text of every option that affects a group's output.
    ///
    /// Paths are excluded: the batch runner fingerprints the loaded data
    /// itself, so moving an input file does not invalidate finished groups.
    pub fn canonical(&self) -> String {
        format!(
            "group_field={:?};max_cost={:?};value_policy={:?};tolerance={};max_speed={};max_iterations={:?}",
            self.group_field,
            self.max_cost,
            self.value_policy,
            self.solver.tolerance,
            self.solver.max_speed,
            self.solver.max_iterations,
        )
    }
}
