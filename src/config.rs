use glam::DVec2;

use crate::geometry::AABB;

/// Half-extent of the default square bounding region.
const DEFAULT_HALF_EXTENT: f64 = 1.3;

/// Squared distance under which two control points count as the same spot.
const DEFAULT_PICK_DISTANCE_SQ: f64 = 0.001;

/// Settings fixed when a [`Triangulation`](crate::Triangulation) is created.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriangulationConfig {
    /// Region tiled by the triangulation. Its corners become points 0-3.
    pub bounds: AABB<DVec2>,
    /// Insertions and moves closer than this to a live point are rejected.
    pub min_separation: f64,
    /// Relative tolerance of the geometric predicates.
    pub epsilon: f64,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            bounds: AABB::new(
                DVec2::splat(-DEFAULT_HALF_EXTENT),
                DVec2::splat(DEFAULT_HALF_EXTENT),
            ),
            min_separation: DEFAULT_PICK_DISTANCE_SQ.sqrt(),
            epsilon: 1e-10,
        }
    }
}

impl TriangulationConfig {
    pub fn with_bounds(mut self, min: DVec2, max: DVec2) -> Self {
        self.bounds = AABB::new(min, max);
        self
    }

    pub fn with_min_separation(mut self, min_separation: f64) -> Self {
        self.min_separation = min_separation;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Settings of an [`EditSession`](crate::EditSession).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    pub triangulation: TriangulationConfig,
    /// A pointer press within this distance of a control point grabs it.
    pub pick_radius: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            triangulation: TriangulationConfig::default(),
            pick_radius: DEFAULT_PICK_DISTANCE_SQ.sqrt(),
        }
    }
}

impl SessionConfig {
    pub fn with_triangulation(mut self, triangulation: TriangulationConfig) -> Self {
        self.triangulation = triangulation;
        self
    }

    pub fn with_pick_radius(mut self, pick_radius: f64) -> Self {
        self.pick_radius = pick_radius;
        self
    }
}
