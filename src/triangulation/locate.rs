use glam::{DVec2, DVec3};

use super::Triangulation;
use crate::error::{Error, Result};
use crate::geometry::{orient2d, orientation, Orientation};

impl Triangulation {
    /// Find the triangle whose closed interior contains `point` (z is
    /// ignored). On a shared edge either neighbour may be returned.
    ///
    /// Points outside the closed bounding region are rejected with
    /// [`Error::OutOfRegion`].
    pub fn locate_triangle(&self, point: DVec3) -> Result<usize> {
        let p = point.truncate();

        if !self.bounds().contains(&p) {
            return Err(Error::OutOfRegion { x: p.x, y: p.y });
        }

        if let Some(t) = self.walk(p) {
            return Ok(t);
        }

        log::warn!("walk to ({}, {}) failed, scanning all triangles", p.x, p.y);
        self.scan(p).ok_or(Error::OutOfRegion { x: p.x, y: p.y })
    }

    /// Barycentric weights of `point` in the triangle containing it, together
    /// with that triangle's index.
    pub fn locate_weights(&self, point: DVec3) -> Result<(usize, DVec3)> {
        let t = self.locate_triangle(point)?;
        let weights = self.realize_triangle(self.face(t)).weights(point)?;
        Ok((t, weights))
    }

    /// Straight walk from a triangle next to the nearest point. Gives up
    /// after visiting as many triangles as exist, or when it steps off the
    /// region.
    fn walk(&self, p: DVec2) -> Option<usize> {
        let eps = self.tolerance().predicate;

        let (nearest, _) = self.nearest_point(p)?;
        let mut t = self.incident[nearest]?;

        for _ in 0..=self.triangle_count() {
            let face = self.face(t);
            let corners = face.vertices().map(|v| self.points[v].truncate());

            // step across the edge the query is most clearly outside of
            let exit = (0..3)
                .filter_map(|i| {
                    let (u, v) = (corners[(i + 1) % 3], corners[(i + 2) % 3]);
                    (orientation(u, v, p, eps) == Orientation::Clockwise)
                        .then(|| (i, orient2d(u, v, p) / u.distance(v)))
                })
                .min_by(|x, y| x.1.total_cmp(&y.1));

            match exit {
                None => return Some(t),
                Some((i, _)) => {
                    log::trace!("walk {t} -> {:?}", self.neighbors[t][i]);
                    t = self.neighbors[t][i]?;
                }
            }
        }

        None
    }

    fn scan(&self, p: DVec2) -> Option<usize> {
        let eps = self.tolerance().predicate;
        self.triangles()
            .find(|(_, face)| self.realize_triangle(face).contains(p, eps))
            .map(|(t, _)| t)
    }
}

// =============================================================================
