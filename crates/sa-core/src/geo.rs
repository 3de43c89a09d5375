//! Projected coordinate types.
//!
//! All coordinates are planar map units (typically metres) in the spatial
//! reference of the cost surfaces.  Reprojection happens outside the
//! framework; feature loaders expect points already in the grid's system.

/// A point in the cost surfaces' projected coordinate system.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box in map units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Smallest envelope containing every point, or `None` for an empty set.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a WorldPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut env = Envelope {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            env.min_x = env.min_x.min(p.x);
            env.min_y = env.min_y.min(p.y);
            env.max_x = env.max_x.max(p.x);
            env.max_y = env.max_y.max(p.y);
        }
        Some(env)
    }

    /// Grow the envelope by `distance` on every side.
    ///
    /// The bounding box of a point buffer equals the buffer of the points'
    /// bounding box, so this is the extent of "every cell within
    /// `distance` of any point".
    pub fn buffered(self, distance: f64) -> Self {
        Envelope {
            min_x: self.min_x - distance,
            min_y: self.min_y - distance,
            max_x: self.max_x + distance,
            max_y: self.max_y + distance,
        }
    }
}
