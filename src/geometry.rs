use std::ops::{Add, Sub};

use glam::{DVec2, DVec3};

use crate::error::{Error, Result};

// =============================================================================

/// Twice the signed area of `abc`: `(b - a) × (c - a)`.
///
/// Positive when `c` is to the left of `a -> b`.
pub fn orient2d(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

/// Lifted in-circle determinant. Positive when `d` lies inside the
/// circumcircle of the counter-clockwise triangle `abc`.
pub fn in_circle(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> f64 {
    in_circle_terms(a, b, c, d).0
}

/// The in-circle determinant and the summed magnitude of its terms, which
/// bounds the rounding error of the determinant.
fn in_circle_terms(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> (f64, f64) {
    let ad = a - d;
    let bd = b - d;
    let cd = c - d;

    let ad2 = ad.length_squared();
    let bd2 = bd.length_squared();
    let cd2 = cd.length_squared();

    let bc = bd.perp_dot(cd);
    let ac = ad.perp_dot(cd);
    let ab = ad.perp_dot(bd);

    let det = ad2 * bc - bd2 * ac + cd2 * ab;
    let magnitude = ad2 * bc.abs() + bd2 * ac.abs() + cd2 * ab.abs();
    (det, magnitude)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    CounterClockwise,
    Clockwise,
    Collinear,
}

/// Classify [`orient2d`]. Results within `eps` times `|b - a| * |c - a|` of
/// zero count as collinear, so `eps` bounds the sine of the angle at `a`
/// and does not depend on the size of the input.
pub fn orientation(a: DVec2, b: DVec2, c: DVec2, eps: f64) -> Orientation {
    let det = orient2d(a, b, c);
    let tol = eps * (b - a).length() * (c - a).length();
    if det > tol {
        Orientation::CounterClockwise
    } else if det < -tol {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CirclePosition {
    Inside,
    On,
    Outside,
}

/// Classify [`in_circle`]. `abc` must be counter-clockwise. The tolerance is
/// `eps` relative to the magnitude of the determinant's terms.
pub fn circle_position(a: DVec2, b: DVec2, c: DVec2, d: DVec2, eps: f64) -> CirclePosition {
    let (det, magnitude) = in_circle_terms(a, b, c, d);
    let tol = eps * magnitude;
    if det > tol {
        CirclePosition::Inside
    } else if det < -tol {
        CirclePosition::Outside
    } else {
        CirclePosition::On
    }
}

/// Barycentric weights of `p` with respect to `v0, v1, v2`, using only the
/// planar components.
///
/// The returned weights sum to one and satisfy `p = w0*v0 + w1*v1 + w2*v2` in
/// `(x, y)`. They may be negative when `p` lies outside the triangle. A
/// triangle whose area vanishes relative to its edge lengths is rejected with
/// [`Error::DegenerateTriangle`].
pub fn barycentric_weights(v0: DVec3, v1: DVec3, v2: DVec3, p: DVec3) -> Result<DVec3> {
    let a = v0.truncate();
    let e1 = v1.truncate() - a;
    let e2 = v2.truncate() - a;
    let ap = p.truncate() - a;

    let det = e1.perp_dot(e2);
    let scale = e1.length() * e2.length();

    if !det.is_finite() || scale == 0.0 || det.abs() <= DEGENERATE_RATIO * scale {
        return Err(Error::DegenerateTriangle);
    }

    let w1 = ap.perp_dot(e2) / det;
    let w2 = e1.perp_dot(ap) / det;

    Ok(DVec3::new(1.0 - w1 - w2, w1, w2))
}

/// Smallest accepted `|sin|` of the angle between two triangle edges.
const DEGENERATE_RATIO: f64 = 1e-12;

// =============================================================================

/// A triangle, represented as 3x 3D points. Only the planar components take
/// part in the predicates; `z` is carried along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    vertices: [DVec3; 3],
}

impl Triangle {
    pub fn new(vertices: [DVec3; 3]) -> Triangle {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[DVec3; 3] {
        &self.vertices
    }

    fn planar(&self) -> [DVec2; 3] {
        self.vertices.map(|v| v.truncate())
    }

    /// Signed area of this [`Triangle`] in the plane. Positive when
    /// counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let [a, b, c] = self.planar();
        orient2d(a, b, c) * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Returns the circumcircle of this [`Triangle`], as a center and radius,
    /// or `None` if the vertices are collinear.
    pub fn compute_circumcircle(&self) -> Option<(DVec2, f64)> {
        let [a, b, c] = self.planar();
        let ab = b - a;
        let ac = c - a;

        let d = 2.0 * ab.perp_dot(ac);
        if d == 0.0 {
            return None;
        }

        let ab2 = ab.length_squared();
        let ac2 = ac.length_squared();

        let offset = DVec2::new(
            ac.y * ab2 - ab.y * ac2,
            ab.x * ac2 - ac.x * ab2,
        ) / d;

        Some((a + offset, offset.length()))
    }

    /// Check if a point lies inside the circumcircle of this [`Triangle`],
    /// beyond the relative tolerance `eps` of [`circle_position`].
    pub fn in_circumcircle(&self, point: DVec2, eps: f64) -> bool {
        let [a, b, c] = self.planar();
        let position = if orient2d(a, b, c) >= 0.0 {
            circle_position(a, b, c, point, eps)
        } else {
            circle_position(a, c, b, point, eps)
        };
        position == CirclePosition::Inside
    }

    /// Barycentric weights of `point` against this [`Triangle`].
    pub fn weights(&self, point: DVec3) -> Result<DVec3> {
        let [v0, v1, v2] = self.vertices;
        barycentric_weights(v0, v1, v2, point)
    }

    /// Test if a point is inside this counter-clockwise [`Triangle`], edges
    /// included. No edge may see `point` clockwise under [`orientation`]
    /// with tolerance `eps`.
    pub fn contains(&self, point: DVec2, eps: f64) -> bool {
        let [a, b, c] = self.planar();
        [(a, b), (b, c), (c, a)]
            .into_iter()
            .all(|(u, v)| orientation(u, v, point, eps) != Orientation::Clockwise)
    }

    /// Apply barycentric weights to the vertices of this [`Triangle`].
    pub fn interpolate(&self, weights: DVec3) -> DVec3 {
        let [v0, v1, v2] = self.vertices;
        v0 * weights.x + v1 * weights.y + v2 * weights.z
    }
}

// =============================================================================

/// A triangle, represented as 3x indices into a point array, in
/// counter-clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriangleIndex {
    vertices: [usize; 3],
}

impl TriangleIndex {
    pub fn new(vertices: [usize; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    pub fn contains(&self, vertex: usize) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Slot of `vertex` in this triangle.
    pub fn position(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    /// The directed edge opposite vertex slot `i`.
    pub fn edge(&self, i: usize) -> (usize, usize) {
        (self.vertices[(i + 1) % 3], self.vertices[(i + 2) % 3])
    }

    /// Slot opposite the edge `a`-`b`, in either direction.
    pub fn edge_slot(&self, a: usize, b: usize) -> Option<usize> {
        (0..3).find(|&i| {
            let (u, v) = self.edge(i);
            (u == a && v == b) || (u == b && v == a)
        })
    }

    /// Vertex set, sorted. Two triangles covering the same vertices compare
    /// equal under this key regardless of rotation.
    pub fn sorted(&self) -> [usize; 3] {
        let mut idx = self.vertices;
        idx.sort();
        idx
    }
}

// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AABB<T> {
    pub min: T,
    pub max: T,
}

impl<T> AABB<T>
where
    T: Sub<Output = T> + Copy + Add<Output = T>,
    T: StrictBound,
{
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Closed containment.
    pub fn contains(&self, point: &T) -> bool {
        self.min.all_less_eq_than(point) && point.all_less_eq_than(&self.max)
    }

    /// Open containment.
    pub fn contains_strict(&self, point: &T) -> bool {
        self.min.all_less_than(point) && point.all_less_than(&self.max)
    }

    pub fn extent(&self) -> T {
        self.max - self.min
    }
}

impl AABB<DVec2> {
    /// Shrink (positive) or grow (negative) the box by `margin` on every side.
    pub fn inset(&self, margin: f64) -> Self {
        Self::new(self.min + margin, self.max - margin)
    }

    pub fn area(&self) -> f64 {
        let e = self.extent();
        e.x * e.y
    }

    /// The four corners, counter-clockwise starting at `min`.
    pub fn corners(&self) -> [DVec2; 4] {
        [
            [false, false], //0
            [true, false],  //1
            [true, true],   //2
            [false, true],  //3
        ]
        .map(|f| {
            let mask = f.into();
            DVec2::select(mask, self.max, self.min)
        })
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.all_less_than(&self.max)
    }
}

pub trait StrictBound {
    fn all_less_than(&self, other: &Self) -> bool;
    fn all_less_eq_than(&self, other: &Self) -> bool;
}

impl StrictBound for DVec2 {
    fn all_less_than(&self, other: &Self) -> bool {
        self.cmplt(*other).all()
    }
    fn all_less_eq_than(&self, other: &Self) -> bool {
        self.cmple(*other).all()
    }
}

// =============================================================================

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng};

    use super::*;

    trait AlmostEqual {
        fn almost_equal(&self, other: Self, epsilon: Self) -> bool;
    }

    impl AlmostEqual for f64 {
        fn almost_equal(&self, other: Self, epsilon: Self) -> bool {
            (self - other).abs() < epsilon
        }
    }

    fn unit_triangle() -> Triangle {
        Triangle::new([
            (0.0, 0.0, 0.0).into(),
            (1.0, 0.0, 0.0).into(),
            (0.0, 1.0, 0.0).into(),
        ])
    }

    #[test]
    fn test_orientation() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(1.0, 0.0);

        assert_eq!(
            orientation(a, b, DVec2::new(0.5, 1.0), 1e-12),
            Orientation::CounterClockwise
        );
        assert_eq!(
            orientation(a, b, DVec2::new(0.5, -1.0), 1e-12),
            Orientation::Clockwise
        );
        assert_eq!(
            orientation(a, b, DVec2::new(0.5, 1e-15), 1e-12),
            Orientation::Collinear
        );
    }

    #[test]
    fn test_in_circle() {
        let t = unit_triangle();
        let [a, b, c] = t.planar();

        // circumcenter of the unit right triangle is the hypotenuse midpoint
        let (center, radius) = t.compute_circumcircle().unwrap();
        assert!(center.abs_diff_eq(DVec2::new(0.5, 0.5), 1e-12));
        assert!(radius.almost_equal(0.5f64.sqrt(), 1e-12));

        let inside = center + DVec2::X * (radius * 0.99);
        let outside = center + DVec2::X * (radius * 1.01);
        assert_eq!(circle_position(a, b, c, inside, 1e-12), CirclePosition::Inside);
        assert_eq!(circle_position(a, b, c, outside, 1e-12), CirclePosition::Outside);
        assert_eq!(
            circle_position(a, b, c, DVec2::new(1.0, 1.0), 1e-12),
            CirclePosition::On
        );

        assert!(t.in_circumcircle(inside, 1e-12));
        assert!(!t.in_circumcircle(outside, 1e-12));
    }

    #[test]
    fn test_in_circumcircle_ignores_winding() {
        let t = Triangle::new([
            (0.0, 0.0, 0.0).into(),
            (0.0, 1.0, 0.0).into(),
            (1.0, 0.0, 0.0).into(),
        ]);
        assert!(t.signed_area() < 0.0);
        assert!(t.in_circumcircle(DVec2::new(0.4, 0.4), 1e-12));
        assert!(!t.in_circumcircle(DVec2::new(2.0, 2.0), 1e-12));
    }

    #[test]
    fn test_predicates_ignore_scale() {
        // the same configuration must classify the same at any size
        for scale in [1e-6, 1e-3, 1.0, 1e3] {
            let [a, b, c] = unit_triangle().planar().map(|p| p * scale);
            let center = DVec2::splat(0.5 * scale);
            let radius = 0.5f64.sqrt() * scale;

            let halfway = center + DVec2::X * (radius * 0.5);
            let near_rim = center + DVec2::X * (radius * 0.999);
            let beyond = center + DVec2::X * (radius * 1.001);
            assert_eq!(circle_position(a, b, c, halfway, 1e-10), CirclePosition::Inside);
            assert_eq!(circle_position(a, b, c, near_rim, 1e-10), CirclePosition::Inside);
            assert_eq!(circle_position(a, b, c, beyond, 1e-10), CirclePosition::Outside);

            let above = DVec2::new(0.5, 1e-6) * scale;
            assert_eq!(orientation(a, b, above, 1e-10), Orientation::CounterClockwise);
            assert_eq!(orientation(a, b, -above, 1e-10), Orientation::Clockwise);
            assert_eq!(
                orientation(a, b, DVec2::new(0.5 * scale, 0.0), 1e-10),
                Orientation::Collinear
            );
        }
    }

    #[test]
    fn test_weights_at_vertices() {
        let t = Triangle::new([
            (-0.3, 0.2, 4.0).into(),
            (1.1, -0.4, -2.0).into(),
            (0.5, 0.9, 0.5).into(),
        ]);

        let expected = [DVec3::X, DVec3::Y, DVec3::Z];
        for (v, e) in t.vertices().iter().zip(expected) {
            let w = t.weights(*v).unwrap();
            assert!(w.abs_diff_eq(e, 1e-12), "{w} vs {e}");
        }
    }

    #[test]
    fn test_weights_reconstruct() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let t = Triangle::new([0, 1, 2].map(|_| {
                DVec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), 0.0)
            }));
            if t.area() < 1e-3 {
                continue;
            }

            let p = DVec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), 3.0);
            let w = t.weights(p).unwrap();

            assert!(w.element_sum().almost_equal(1.0, 1e-9));
            let back = t.interpolate(w);
            assert!(back.truncate().abs_diff_eq(p.truncate(), 1e-9));
        }
    }

    #[test]
    fn test_weights_outside_are_negative() {
        let w = unit_triangle().weights(DVec3::new(2.0, 2.0, 0.0)).unwrap();
        assert!(w.x < 0.0);
        assert!(w.element_sum().almost_equal(1.0, 1e-12));
    }

    #[test]
    fn test_degenerate_weights() {
        let flat = Triangle::new([
            (0.0, 0.0, 0.0).into(),
            (1.0, 1.0, 0.0).into(),
            (2.0, 2.0, 0.0).into(),
        ]);
        assert_eq!(flat.weights(DVec3::ZERO), Err(Error::DegenerateTriangle));

        let collapsed = Triangle::new([DVec3::ONE; 3]);
        assert_eq!(collapsed.weights(DVec3::ZERO), Err(Error::DegenerateTriangle));
        assert!(collapsed.compute_circumcircle().is_none());
    }

    #[test]
    fn test_contains() {
        let t = unit_triangle();
        assert!(t.contains(DVec2::new(0.2, 0.2), 0.0));
        assert!(t.contains(DVec2::new(0.5, 0.0), 0.0));
        assert!(!t.contains(DVec2::new(0.6, 0.6), 0.0));
    }

    #[test]
    fn test_triangle_index_edges() {
        let t = TriangleIndex::new([4, 7, 9]);
        assert_eq!(t.edge(0), (7, 9));
        assert_eq!(t.edge(1), (9, 4));
        assert_eq!(t.edge(2), (4, 7));
        assert_eq!(t.edge_slot(9, 7), Some(0));
        assert_eq!(t.edge_slot(4, 9), Some(1));
        assert_eq!(t.edge_slot(4, 5), None);
        assert_eq!(t.sorted(), [4, 7, 9]);
        assert_eq!(TriangleIndex::new([9, 4, 7]).sorted(), t.sorted());
    }

    #[test]
    fn test_aabb() {
        let bb = AABB::new(DVec2::splat(-1.0), DVec2::splat(2.0));
        assert!(bb.contains(&DVec2::new(2.0, 0.0)));
        assert!(!bb.contains_strict(&DVec2::new(2.0, 0.0)));
        assert!(!bb.contains(&DVec2::new(2.1, 0.0)));
        assert!(bb.area().almost_equal(9.0, 1e-12));
        assert!(bb.is_valid());

        let corners = bb.corners();
        assert_eq!(corners[0], DVec2::new(-1.0, -1.0));
        assert_eq!(corners[1], DVec2::new(2.0, -1.0));
        assert_eq!(corners[2], DVec2::new(2.0, 2.0));
        assert_eq!(corners[3], DVec2::new(-1.0, 2.0));

        let inner = bb.inset(0.5);
        assert_eq!(inner.min, DVec2::splat(-0.5));
        assert_eq!(inner.max, DVec2::splat(1.5));
    }
}
