use glam::{DVec2, DVec3};

use super::{tree_point, IndexPoint, Triangulation, CORNER_COUNT};
use crate::error::{Error, IndexFault, Result};
use crate::geometry::{
    circle_position, in_circle, orient2d, orientation, CirclePosition, Orientation,
};

impl Triangulation {
    /// Insert a point and return its new, permanent index.
    ///
    /// The point must lie strictly inside the bounding region and keep the
    /// configured minimum separation from every live point. The border
    /// belongs to the corners: a point on it, or within the length tolerance
    /// of it, is refused with [`Error::OutOfRegion`] even though
    /// [`locate_triangle`](Self::locate_triangle) accepts it.
    pub fn insert_point(&mut self, point: DVec3) -> Result<usize> {
        self.validate_insert(point)?;

        let index = self.points.len();
        self.points.push(point);
        self.live.push(true);
        self.incident.push(None);

        self.attach(index);

        log::debug!("inserted point {index} at ({}, {})", point.x, point.y);
        Ok(index)
    }

    /// Insert points one at a time, stopping at the first rejected one.
    /// Points accepted before the failure stay inserted.
    pub fn insert_points<T: IntoIterator<Item = DVec3>>(&mut self, from: T) -> Result<Vec<usize>> {
        from.into_iter().map(|p| self.insert_point(p)).collect()
    }

    /// Check that [`insert_point`](Self::insert_point) would accept `point`,
    /// without changing anything.
    pub fn validate_insert(&self, point: DVec3) -> Result<()> {
        self.check_placement(point.truncate(), None)
    }

    /// Remove a point, retiring its index. Returns its last position.
    pub fn remove_point(&mut self, index: usize) -> Result<DVec3> {
        self.check_editable(index)?;

        self.detach(index);
        self.live[index] = false;

        log::debug!("removed point {index}");
        Ok(self.points[index])
    }

    /// Check that [`remove_point`](Self::remove_point) would accept `index`.
    pub fn validate_remove(&self, index: usize) -> Result<()> {
        self.check_editable(index)
    }

    /// Move a point to a new position, keeping its index. `z` is stored as
    /// given. The target is checked like an insertion, except that the
    /// point's own old position does not count as a neighbour.
    pub fn move_point(&mut self, index: usize, to: DVec3) -> Result<()> {
        self.validate_move(index, to)?;

        self.detach(index);
        self.points[index] = to;
        self.attach(index);

        log::debug!("moved point {index} to ({}, {})", to.x, to.y);
        Ok(())
    }

    /// Check that [`move_point`](Self::move_point) would accept the move,
    /// without changing anything.
    pub fn validate_move(&self, index: usize, to: DVec3) -> Result<()> {
        self.check_editable(index)?;
        self.check_placement(to.truncate(), Some(index))
    }

    // -------------------------------------------------------------------------

    fn check_editable(&self, index: usize) -> Result<()> {
        let reason = if index < CORNER_COUNT {
            IndexFault::BoundingCorner
        } else if index >= self.points.len() {
            IndexFault::OutOfRange
        } else if !self.live[index] {
            IndexFault::Retired
        } else {
            return Ok(());
        };
        Err(Error::InvalidIndex { index, reason })
    }

    fn check_placement(&self, p: DVec2, moving: Option<usize>) -> Result<()> {
        let tol = self.tolerance();

        if !p.is_finite() || !self.bounds().inset(tol.length).contains_strict(&p) {
            return Err(Error::OutOfRegion { x: p.x, y: p.y });
        }

        let nearest = match moving {
            Some(index) => self.nearest_point_except(p, index),
            None => self.nearest_point(p),
        };

        let limit = self.config.min_separation.max(tol.length);
        match nearest {
            Some((index, distance)) if distance < limit => {
                Err(Error::ProximityViolation { index, distance })
            }
            _ => Ok(()),
        }
    }

    /// Hook an unattached point into the triangulation by splitting the
    /// triangle (or edge) it falls on, then restore the Delaunay property.
    fn attach(&mut self, index: usize) {
        let point = self.points[index];
        let p = point.truncate();

        let t = match self.locate_triangle(point) {
            Ok(t) => t,
            Err(e) => panic!("validated point {index} could not be located: {e}"),
        };

        let face = *self.face(t);
        let corners = face.vertices().map(|v| self.points[v].truncate());
        let eps = self.tolerance().predicate;

        let on_edge = (0..3)
            .filter_map(|i| {
                let (u, v) = (corners[(i + 1) % 3], corners[(i + 2) % 3]);
                (orientation(u, v, p, eps) == Orientation::Collinear)
                    .then(|| (i, orient2d(u, v, p).abs() / u.distance(v)))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .and_then(|(i, _)| self.neighbors[t][i].map(|n| (i, n)));

        let created = match on_edge {
            Some((i, n)) => {
                let a = face.vertices()[i];
                let (u, v) = face.edge(i);
                let other = *self.face(n);
                let Some(j) = other.edge_slot(u, v) else {
                    panic!("triangles {t} and {n} do not share an edge");
                };
                let d = other.vertices()[j];

                self.replace_triangles(
                    &[t, n],
                    &[[a, u, index], [a, index, v], [d, v, index], [d, index, u]],
                )
            }
            None => {
                let [a, b, c] = face.vertices();
                self.replace_triangles(&[t], &[[index, b, c], [a, index, c], [a, b, index]])
            }
        };

        self.lookup_accel
            .insert(IndexPoint::new(tree_point(point), index));

        self.legalize(&created);
    }

    /// Take a point out of the triangulation, leaving its slot in place.
    /// The hole is filled by Delaunay ear clipping and then legalized.
    fn detach(&mut self, index: usize) {
        let star = self.walk_star(index);

        let removed: Vec<usize> = star.iter().map(|(t, _)| *t).collect();
        let ring: Vec<usize> = star
            .iter()
            .map(|&(t, slot)| self.face(t).vertices()[(slot + 1) % 3])
            .collect();

        let created = self.clip_ears(index, ring);

        let removed_entry = IndexPoint::new(tree_point(self.points[index]), index);
        if self.lookup_accel.remove(&removed_entry).is_none() {
            panic!("point {index} missing from the lookup tree");
        }
        self.incident[index] = None;

        let ids = self.replace_triangles(&removed, &created);
        self.legalize(&ids);
    }

    /// Triangulate the counter-clockwise hole `ring`, preferring ears whose
    /// circumcircle holds no other ring vertex.
    fn clip_ears(&self, center: usize, mut ring: Vec<usize>) -> Vec<[usize; 3]> {
        let eps = self.tolerance().predicate;
        let pos = |v: usize| self.points[v].truncate();

        let mut created = Vec::with_capacity(ring.len().saturating_sub(2));

        while ring.len() > 3 {
            let n = ring.len();

            // (ring position, worst in-circle value, convexity, convex)
            let mut delaunay_ear = None;
            let mut fallback: Option<(usize, f64, f64, bool)> = None;

            for k in 0..n {
                let ear = [ring[(k + n - 1) % n], ring[k], ring[(k + 1) % n]];
                let [a, b, c] = ear.map(pos);

                let convexity = orient2d(a, b, c);
                let convex = orientation(a, b, c, eps) == Orientation::CounterClockwise;
                let others = ring.iter().copied().filter(|v| !ear.contains(v));

                let blocked = others.clone().any(|v| {
                    let q = pos(v);
                    orientation(a, b, q, eps) == Orientation::CounterClockwise
                        && orientation(b, c, q, eps) == Orientation::CounterClockwise
                        && orientation(c, a, q, eps) != Orientation::Clockwise
                });
                if blocked {
                    continue;
                }

                let empty = others
                    .clone()
                    .all(|v| circle_position(a, b, c, pos(v), eps) != CirclePosition::Inside);
                if convex && empty {
                    delaunay_ear = Some(k);
                    break;
                }

                let worst = others
                    .map(|v| in_circle(a, b, c, pos(v)))
                    .fold(f64::NEG_INFINITY, f64::max);

                let better = match fallback {
                    None => true,
                    Some((_, best_worst, best_convexity, best_convex)) => {
                        (convex, -worst, convexity) > (best_convex, -best_worst, best_convexity)
                    }
                };
                if better {
                    fallback = Some((k, worst, convexity, convex));
                }
            }

            let k = match (delaunay_ear, fallback) {
                (Some(k), _) => k,
                (None, Some((k, worst, convexity, _))) => {
                    log::warn!(
                        "hole around point {center} has no empty-circle ear, \
                         clipping ear with in-circle {worst} and area {convexity}"
                    );
                    k
                }
                (None, None) => panic!("hole around point {center} has no ear: {ring:?}"),
            };

            created.push([ring[(k + n - 1) % n], ring[k], ring[(k + 1) % n]]);
            ring.remove(k);
        }

        created.push([ring[0], ring[1], ring[2]]);
        created
    }

    /// Flip edges of (and around) `seeds` until every edge is locally
    /// Delaunay. Edges are kept on an explicit work-list.
    fn legalize(&mut self, seeds: &[usize]) {
        let eps = self.tolerance().predicate;

        let mut stack: Vec<(usize, (usize, usize))> = seeds
            .iter()
            .flat_map(|&t| {
                let face = *self.face(t);
                (0..3).map(move |i| (t, face.edge(i)))
            })
            .collect();

        let cap = 8 * (self.triangle_count() + 4).pow(2);
        let mut steps = 0;

        while let Some((t, (u, v))) = stack.pop() {
            steps += 1;
            if steps > cap {
                log::warn!("legalization stopped after {cap} steps");
                break;
            }

            // the edge may have been flipped away since it was queued
            let Some(face) = self.triangle(t).copied() else {
                continue;
            };
            let Some(i) = (0..3).find(|&i| face.edge(i) == (u, v)) else {
                continue;
            };
            let Some(n) = self.neighbors[t][i] else {
                continue;
            };

            let other = *self.face(n);
            let Some(j) = other.edge_slot(u, v) else {
                panic!("triangles {t} and {n} do not share edge ({u}, {v})");
            };

            let a = face.vertices()[i];
            let d = other.vertices()[j];
            let [pa, pu, pv, pd] = [a, u, v, d].map(|x| self.points[x].truncate());

            if circle_position(pa, pu, pv, pd, eps) != CirclePosition::Inside {
                continue;
            }
            if orientation(pa, pu, pd, eps) != Orientation::CounterClockwise
                || orientation(pa, pd, pv, eps) != Orientation::CounterClockwise
            {
                continue;
            }

            log::trace!("flip ({u}, {v}) -> ({a}, {d})");
            let ids = self.replace_triangles(&[t, n], &[[a, u, d], [a, d, v]]);

            stack.push((ids[0], (u, d)));
            stack.push((ids[0], (a, u)));
            stack.push((ids[1], (d, v)));
            stack.push((ids[1], (v, a)));
        }
    }
}

// =============================================================================
