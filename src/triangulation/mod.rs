use std::collections::HashMap;

use glam::{DVec2, DVec3};
use rstar::{primitives::GeomWithData, RTree};

use crate::config::TriangulationConfig;
use crate::geometry::{Triangle, TriangleIndex, AABB};

mod locate;
mod update;

// =============================================================================

type TreePoint = [f64; 2];
type IndexPoint = GeomWithData<TreePoint, usize>;

fn tree_point(p: DVec3) -> TreePoint {
    [p.x, p.y]
}

/// Thresholds derived from the configured epsilon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Tolerance {
    /// Relative tolerance handed to [`orientation`](crate::geometry::orientation)
    /// and [`circle_position`](crate::geometry::circle_position).
    pub predicate: f64,
    /// For distances, scaled by the size of the bounding region.
    pub length: f64,
}

impl Tolerance {
    fn new(bounds: &AABB<DVec2>, epsilon: f64) -> Self {
        Self {
            predicate: epsilon,
            length: epsilon.sqrt() * bounds.extent().length(),
        }
    }
}

// =============================================================================

/// A dynamic 2D Delaunay triangulation over a fixed rectangular region.
///
/// Points keep their index for their whole lifetime. Removed indices are
/// retired and never handed out again, so two triangulations fed the same
/// sequence of insertions and removals stay index-aligned. Indices 0-3 are
/// the corners of the bounding region and cannot be removed or moved.
///
/// Triangle indices are only stable until the next mutation.
#[derive(Debug, Clone)]
pub struct Triangulation {
    config: TriangulationConfig,
    tolerance: Tolerance,
    points: Vec<DVec3>,
    live: Vec<bool>,
    /// One triangle touching each live point.
    incident: Vec<Option<usize>>,
    triangles: Vec<Option<TriangleIndex>>,
    /// `neighbors[t][i]` is across the edge opposite vertex `i` of `t`.
    neighbors: Vec<[Option<usize>; 3]>,
    free: Vec<usize>,
    lookup_accel: RTree<IndexPoint>,
}

/// Number of permanent corner points.
pub const CORNER_COUNT: usize = 4;

impl Default for Triangulation {
    fn default() -> Self {
        Self::new(TriangulationConfig::default())
    }
}

impl Triangulation {
    /// Create a triangulation holding only the four corners of
    /// `config.bounds`, split into two triangles.
    ///
    /// Panics if the bounds are empty or not finite.
    pub fn new(config: TriangulationConfig) -> Self {
        assert!(
            config.bounds.is_valid(),
            "invalid bounding region {:?}",
            config.bounds
        );

        let corners = config.bounds.corners().map(|c| c.extend(0.0));

        let mut ret = Self {
            config,
            tolerance: Tolerance::new(&config.bounds, config.epsilon),
            points: corners.to_vec(),
            live: vec![true; CORNER_COUNT],
            incident: vec![Some(0), Some(0), Some(0), Some(1)],
            triangles: vec![
                Some(TriangleIndex::new([0, 1, 2])),
                Some(TriangleIndex::new([0, 2, 3])),
            ],
            neighbors: vec![[None, Some(1), None], [None, None, Some(0)]],
            free: Default::default(),
            lookup_accel: Default::default(),
        };

        for (i, corner) in corners.into_iter().enumerate() {
            ret.lookup_accel
                .insert(IndexPoint::new(tree_point(corner), i));
        }

        ret
    }

    pub fn config(&self) -> &TriangulationConfig {
        &self.config
    }

    pub fn bounds(&self) -> &AABB<DVec2> {
        &self.config.bounds
    }

    pub(crate) fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// Live points, as `(index, position)` pairs in index order.
    pub fn points(&self) -> impl Iterator<Item = (usize, DVec3)> + '_ {
        self.points
            .iter()
            .zip(&self.live)
            .enumerate()
            .filter_map(|(i, (p, live))| live.then_some((i, *p)))
    }

    /// Every point slot, retired ones included (they keep their last position).
    pub fn positions(&self) -> &[DVec3] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<DVec3> {
        self.is_live(index).then(|| self.points[index])
    }

    pub fn is_live(&self, index: usize) -> bool {
        self.live.get(index).copied().unwrap_or(false)
    }

    /// Number of indices handed out so far, retired ones included.
    pub fn slot_count(&self) -> usize {
        self.points.len()
    }

    pub fn live_point_count(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    /// Live triangles, as `(index, triangle)` pairs.
    pub fn triangles(&self) -> impl Iterator<Item = (usize, &TriangleIndex)> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (i, t)))
    }

    pub fn triangle(&self, index: usize) -> Option<&TriangleIndex> {
        self.triangles.get(index).and_then(|t| t.as_ref())
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() - self.free.len()
    }

    /// Neighbours of a live triangle; entry `i` is across the edge opposite
    /// vertex `i`, `None` on the border of the region.
    pub fn neighbors(&self, index: usize) -> Option<[Option<usize>; 3]> {
        self.triangle(index).map(|_| self.neighbors[index])
    }

    pub fn realize(&self, index: usize) -> Option<Triangle> {
        self.triangle(index).map(|t| self.realize_triangle(t))
    }

    fn realize_triangle(&self, tri: &TriangleIndex) -> Triangle {
        Triangle::new(tri.vertices().map(|v| self.points[v]))
    }

    /// Summed area of all triangles. Equals the area of the bounding region
    /// up to rounding.
    pub fn total_area(&self) -> f64 {
        self.triangles()
            .map(|(_, t)| self.realize_triangle(t).area())
            .sum()
    }

    /// Triangles around a live point, counter-clockwise.
    pub fn star(&self, index: usize) -> Option<Vec<usize>> {
        if !self.is_live(index) {
            return None;
        }
        Some(self.walk_star(index).into_iter().map(|(t, _)| t).collect())
    }

    /// Nearest live point to `p` in the plane, with its distance.
    pub fn nearest_point(&self, p: DVec2) -> Option<(usize, f64)> {
        self.lookup_accel
            .nearest_neighbor(&[p.x, p.y])
            .map(|e| (e.data, self.points[e.data].truncate().distance(p)))
    }

    /// Nearest live point to `p` other than `exclude`, with its distance.
    pub fn nearest_point_except(&self, p: DVec2, exclude: usize) -> Option<(usize, f64)> {
        self.lookup_accel
            .nearest_neighbor_iter(&[p.x, p.y])
            .find(|e| e.data != exclude)
            .map(|e| (e.data, self.points[e.data].truncate().distance(p)))
    }

    // -------------------------------------------------------------------------

    /// A live triangle. Panics on a dangling reference, which means the
    /// adjacency is corrupt.
    fn face(&self, index: usize) -> &TriangleIndex {
        match self.triangles.get(index) {
            Some(Some(t)) => t,
            _ => panic!("dangling triangle reference {index}"),
        }
    }

    /// Walk around a live interior point, returning each triangle with the
    /// slot the point occupies in it.
    fn walk_star(&self, index: usize) -> Vec<(usize, usize)> {
        let Some(start) = self.incident[index] else {
            panic!("live point {index} has no incident triangle");
        };

        let mut star = Vec::new();
        let mut t = start;
        loop {
            let Some(slot) = self.face(t).position(index) else {
                panic!("triangle {t} does not touch point {index}");
            };
            star.push((t, slot));

            // the next triangle counter-clockwise shares the edge (index, next)
            match self.neighbors[t][(slot + 1) % 3] {
                Some(next) if next == start => break,
                Some(next) => t = next,
                None => {
                    // on the border: rewind clockwise to the first triangle
                    return self.walk_star_from_border(index, start);
                }
            }

            assert!(
                star.len() <= self.triangle_count(),
                "star of point {index} does not close"
            );
        }
        star
    }

    fn walk_star_from_border(&self, index: usize, start: usize) -> Vec<(usize, usize)> {
        let mut t = start;
        loop {
            let slot = self.face(t).position(index).unwrap_or_else(|| {
                panic!("triangle {t} does not touch point {index}");
            });
            match self.neighbors[t][(slot + 2) % 3] {
                Some(prev) => t = prev,
                None => break,
            }
        }

        let mut star = Vec::new();
        loop {
            let slot = self.face(t).position(index).unwrap_or_else(|| {
                panic!("triangle {t} does not touch point {index}");
            });
            star.push((t, slot));
            match self.neighbors[t][(slot + 1) % 3] {
                Some(next) => t = next,
                None => break,
            }
            assert!(
                star.len() <= self.triangle_count(),
                "star of point {index} does not close"
            );
        }
        star
    }

    fn alloc_triangle(&mut self, tri: TriangleIndex) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.triangles[slot] = Some(tri);
                self.neighbors[slot] = [None; 3];
                slot
            }
            None => {
                self.triangles.push(Some(tri));
                self.neighbors.push([None; 3]);
                self.triangles.len() - 1
            }
        }
    }

    fn free_triangle(&mut self, index: usize) {
        self.triangles[index] = None;
        self.neighbors[index] = [None; 3];
        self.free.push(index);
    }

    /// Replace the triangles `removed` by `created`, which must tile the same
    /// region. Adjacency is rebuilt from shared edges; edges on the border of
    /// the patch are stitched to whatever was across them before.
    ///
    /// Returns the indices of the created triangles, in order.
    fn replace_triangles(&mut self, removed: &[usize], created: &[[usize; 3]]) -> Vec<usize> {
        // directed border edge -> triangle on the other side
        let mut border: HashMap<(usize, usize), Option<usize>> = HashMap::new();
        for &t in removed {
            let face = *self.face(t);
            for i in 0..3 {
                let outside = self.neighbors[t][i];
                if outside.map_or(true, |n| !removed.contains(&n)) {
                    border.insert(face.edge(i), outside);
                }
            }
        }

        for &t in removed {
            self.free_triangle(t);
        }

        let ids: Vec<usize> = created
            .iter()
            .map(|v| self.alloc_triangle(TriangleIndex::new(*v)))
            .collect();

        let mut inner: HashMap<(usize, usize), usize> = HashMap::new();
        for &id in &ids {
            let face = *self.face(id);
            for i in 0..3 {
                inner.insert(face.edge(i), id);
            }
        }

        for &id in &ids {
            let face = *self.face(id);
            for i in 0..3 {
                let (u, v) = face.edge(i);
                let across = if let Some(&twin) = inner.get(&(v, u)) {
                    Some(twin)
                } else if let Some(&outside) = border.get(&(u, v)) {
                    if let Some(n) = outside {
                        let Some(slot) = self.face(n).edge_slot(u, v) else {
                            panic!("triangle {n} lost edge ({u}, {v})");
                        };
                        self.neighbors[n][slot] = Some(id);
                    }
                    outside
                } else {
                    panic!("retriangulation left edge ({u}, {v}) open");
                };
                self.neighbors[id][i] = across;
            }

            for v in face.vertices() {
                self.incident[v] = Some(id);
            }
        }

        ids
    }
}

// =============================================================================
