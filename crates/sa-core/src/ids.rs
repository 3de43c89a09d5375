//! Strongly typed identifier wrappers.
//!
//! Numeric IDs are `Copy + Ord + Hash` so they can be used as map keys and
//! sorted collection elements without ceremony.  `GroupKey` is the one
//! non-numeric id: origin groups may be keyed by integers or free text.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Stable id of one physical connector (ramp).  Several snapped points
    /// may share the same id.
    pub struct ConnectorId(u32);
}

typed_id! {
    /// Row-major index of a cell inside one grid or grid window.
    pub struct CellId(u32);
}

// ── GroupKey ──────────────────────────────────────────────────────────────────

/// Opaque key of an origin group.
///
/// Ordering is total: `Implicit` < every `Int` < every `Text`, so groups are
/// always processed in the same order for the same input.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum GroupKey {
    /// The single group used when no grouping field is configured.
    Implicit,
    Int(i64),
    Text(String),
}

impl GroupKey {
    /// Name of the persisted raster for this group, e.g. `grp_12_servArea`.
    ///
    /// Runs of characters outside `[A-Za-z0-9]` collapse into one `_` so the
    /// name is safe as a file or table name.
    pub fn output_name(&self) -> String {
        let key = match self {
            GroupKey::Implicit => "all".to_owned(),
            GroupKey::Int(n) => n.to_string(),
            GroupKey::Text(s) => sanitize(s),
        };
        format!("grp_{key}_servArea")
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Implicit => f.write_str("<all>"),
            GroupKey::Int(n) => write!(f, "{n}"),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

/// Replace every run of non-alphanumeric ASCII characters with a single `_`.
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}
