//! Dynamic 2D Delaunay triangulation with point location, barycentric
//! weights and a piecewise-affine mesh warp between two index-aligned
//! triangulations.
//!
//! ```
//! use delaunay_warp::*;
//! use glam::DVec3;
//!
//! let mut rest = Triangulation::default();
//! let i = rest.insert_point(DVec3::ZERO).unwrap();
//!
//! let mut deformed = rest.clone();
//! deformed.move_point(i, DVec3::new(0.2, 0.0, 0.0)).unwrap();
//!
//! let warped = warp_positions(&rest, &deformed, &[DVec3::new(0.0, 0.0, 1.0)]).unwrap();
//! assert!(warped[0].abs_diff_eq(DVec3::new(0.2, 0.0, 1.0), 1e-12));
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod session;
pub mod triangulation;
pub mod warp;

pub use config::{SessionConfig, TriangulationConfig};
pub use error::{Error, IndexFault, Result};
pub use geometry::{
    barycentric_weights, circle_position, in_circle, orient2d, orientation, CirclePosition,
    Orientation, Triangle, TriangleIndex, AABB,
};
pub use session::{EditSession, PointerButton, PointerOutcome, Selection};
pub use triangulation::{Triangulation, CORNER_COUNT};
pub use warp::{check_alignment, warp_point, warp_positions, warp_positions_par};
