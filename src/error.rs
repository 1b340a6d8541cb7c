use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why an index was refused by a mutation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFault {
    /// One of the four permanent bounding corners.
    #[error("bounding corners are permanent")]
    BoundingCorner,
    /// The slot was retired by an earlier removal.
    #[error("the point was removed")]
    Retired,
    /// No point was ever assigned this index.
    #[error("no such point")]
    OutOfRange,
}

/// crate specific Error enum
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Location refuses points outside the closed region; insertions and
    /// moves also refuse the border itself.
    #[error("Point ({x}, {y}) is not inside the bounding region")]
    OutOfRegion { x: f64, y: f64 },
    #[error("Barycentric weights requested for a zero-area triangle")]
    DegenerateTriangle,
    #[error("Invalid point index {index}: {reason}")]
    InvalidIndex { index: usize, reason: IndexFault },
    #[error("Point is {distance} away from point {index}, closer than the minimum separation")]
    ProximityViolation { index: usize, distance: f64 },
    #[error("Triangulations are not index-aligned at point {index}")]
    Misaligned { index: usize },
}

// =============================================================================
