//! Piecewise-affine warp of arbitrary geometry between two index-aligned
//! triangulations.
//!
//! Weights are always taken in the `rest` triangulation and applied to the
//! `deformed` one, so `rest` is the frame used for point location. The third
//! coordinate of every warped position is copied from the input unchanged.

use glam::DVec3;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::triangulation::Triangulation;

/// Warp one point from `rest` space into `deformed` space.
///
/// Fails with [`Error::OutOfRegion`] if `p` is outside the rest region and
/// with [`Error::DegenerateTriangle`] if the containing rest triangle has no
/// area. Alignment of the two triangulations is the caller's responsibility
/// here; see [`check_alignment`].
pub fn warp_point(rest: &Triangulation, deformed: &Triangulation, p: DVec3) -> Result<DVec3> {
    let (t, weights) = rest.locate_weights(p)?;

    let Some(tri) = rest.triangle(t) else {
        panic!("located triangle {t} is not live");
    };

    let [i0, i1, i2] = tri.vertices();
    let (Some(v0), Some(v1), Some(v2)) = (deformed.point(i0), deformed.point(i1), deformed.point(i2))
    else {
        return Err(Error::Misaligned {
            index: tri
                .vertices()
                .into_iter()
                .find(|&v| !deformed.is_live(v))
                .unwrap_or(i0),
        });
    };

    let warped = v0 * weights.x + v1 * weights.y + v2 * weights.z;
    Ok(warped.truncate().extend(p.z))
}

/// Check that two triangulations use the same live point indices.
pub fn check_alignment(rest: &Triangulation, deformed: &Triangulation) -> Result<()> {
    let slots = rest.slot_count().max(deformed.slot_count());
    match (0..slots).find(|&i| rest.is_live(i) != deformed.is_live(i)) {
        Some(index) => Err(Error::Misaligned { index }),
        None if rest.slot_count() != deformed.slot_count() => Err(Error::Misaligned {
            index: rest.slot_count().min(deformed.slot_count()),
        }),
        None => Ok(()),
    }
}

/// Warp every position, in order. Positions that cannot be warped (outside
/// the region, degenerate triangle) keep their input value.
pub fn warp_positions(
    rest: &Triangulation,
    deformed: &Triangulation,
    positions: &[DVec3],
) -> Result<Vec<DVec3>> {
    check_alignment(rest, deformed)?;

    let warped: Vec<(DVec3, bool)> = positions
        .iter()
        .map(|&p| warp_or_hold(rest, deformed, p))
        .collect();

    Ok(finish(warped))
}

/// [`warp_positions`], spread over the rayon thread pool.
pub fn warp_positions_par(
    rest: &Triangulation,
    deformed: &Triangulation,
    positions: &[DVec3],
) -> Result<Vec<DVec3>> {
    check_alignment(rest, deformed)?;

    let warped: Vec<(DVec3, bool)> = positions
        .par_iter()
        .map(|&p| warp_or_hold(rest, deformed, p))
        .collect();

    Ok(finish(warped))
}

fn warp_or_hold(rest: &Triangulation, deformed: &Triangulation, p: DVec3) -> (DVec3, bool) {
    match warp_point(rest, deformed, p) {
        Ok(q) => (q, false),
        Err(_) => (p, true),
    }
}

fn finish(warped: Vec<(DVec3, bool)>) -> Vec<DVec3> {
    let held = warped.iter().filter(|(_, held)| *held).count();
    if held > 0 {
        log::warn!("{held} of {} positions could not be warped and were held", warped.len());
    }
    warped.into_iter().map(|(p, _)| p).collect()
}

// =============================================================================

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng};

    use super::*;

    trait AlmostEqual {
        fn almost_equal(&self, other: Self, epsilon: f64) -> bool;
    }

    impl AlmostEqual for DVec3 {
        fn almost_equal(&self, other: Self, epsilon: f64) -> bool {
            self.abs_diff_eq(other, epsilon)
        }
    }

    fn random_pair(n: usize, seed: u64) -> (Triangulation, Triangulation) {
        let mut rest = Triangulation::default();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        while rest.live_point_count() < n + 4 {
            let p = DVec3::new(rng.gen_range(-1.2..1.2), rng.gen_range(-1.2..1.2), 0.0);
            let _ = rest.insert_point(p);
        }
        let deformed = rest.clone();
        (rest, deformed)
    }

    fn random_mesh(n: usize, seed: u64) -> Vec<DVec3> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                DVec3::new(
                    rng.gen_range(-1.3..1.3),
                    rng.gen_range(-1.3..1.3),
                    rng.gen_range(-2.0..2.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_identity_warp() {
        let (rest, deformed) = random_pair(40, 1);
        let mesh = random_mesh(300, 2);

        let warped = warp_positions(&rest, &deformed, &mesh).unwrap();
        assert_eq!(warped.len(), mesh.len());
        for (w, p) in warped.iter().zip(&mesh) {
            assert!(w.almost_equal(*p, 1e-9), "{w} vs {p}");
            assert_eq!(w.z, p.z);
        }
    }

    #[test]
    fn test_single_point_scenario() {
        let mut rest = Triangulation::default();
        let mut deformed = Triangulation::default();
        let i = rest.insert_point(DVec3::ZERO).unwrap();
        let j = deformed.insert_point(DVec3::ZERO).unwrap();
        assert_eq!(i, j);

        deformed.move_point(i, DVec3::new(0.0, 0.0, 1.0)).unwrap();

        // xy follows the weights, depth comes from the input vertex
        let warped = warp_point(&rest, &deformed, DVec3::ZERO).unwrap();
        assert!(warped.almost_equal(DVec3::ZERO, 1e-12));

        let shifted = warp_point(&rest, &deformed, DVec3::new(0.0, 0.0, 0.7)).unwrap();
        assert_eq!(shifted.z, 0.7);
    }

    #[test]
    fn test_translation_of_control_point() {
        let mut rest = Triangulation::default();
        let i = rest.insert_point(DVec3::ZERO).unwrap();
        let mut deformed = rest.clone();
        deformed.move_point(i, DVec3::new(0.2, 0.1, 0.0)).unwrap();

        // the control point itself maps onto its moved twin
        let warped = warp_point(&rest, &deformed, DVec3::new(0.0, 0.0, 3.0)).unwrap();
        assert!(warped.almost_equal(DVec3::new(0.2, 0.1, 3.0), 1e-12));

        // the corners never move
        for c in 0..4 {
            let p = rest.point(c).unwrap();
            assert!(warp_point(&rest, &deformed, p).unwrap().almost_equal(p, 1e-12));
        }

        // halfway to a corner the displacement is halved
        let corner = rest.point(2).unwrap();
        let half = warp_point(&rest, &deformed, corner * 0.5).unwrap();
        assert!(half.almost_equal(corner * 0.5 + DVec3::new(0.1, 0.05, 0.0), 1e-12));
    }

    #[test]
    fn test_warp_is_continuous_across_edges() {
        let (rest, mut deformed) = random_pair(20, 4);
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let ids: Vec<usize> = rest.points().map(|(i, _)| i).filter(|i| *i >= 4).collect();
        for i in ids {
            let p = deformed.point(i).unwrap();
            let to = p + DVec3::new(rng.gen_range(-0.01..0.01), rng.gen_range(-0.01..0.01), 0.0);
            let _ = deformed.move_point(i, to);
        }

        // every shared edge midpoint warps to the same place from both sides
        for (t, face) in rest.triangles() {
            for (k, n) in rest.neighbors(t).unwrap().iter().enumerate() {
                if n.is_none() {
                    continue;
                }
                let (u, v) = face.edge(k);
                let mid = (rest.point(u).unwrap() + rest.point(v).unwrap()) * 0.5;
                let expected =
                    (deformed.point(u).unwrap() + deformed.point(v).unwrap()) * 0.5;
                let warped = warp_point(&rest, &deformed, mid).unwrap();
                assert!(warped.truncate().abs_diff_eq(expected.truncate(), 1e-9));
            }
        }
    }

    #[test]
    fn test_out_of_region_is_held() {
        let (rest, deformed) = random_pair(5, 6);
        let outside = DVec3::new(4.0, -4.0, 1.0);
        assert!(matches!(
            warp_point(&rest, &deformed, outside),
            Err(Error::OutOfRegion { .. })
        ));

        let warped = warp_positions(&rest, &deformed, &[outside, DVec3::ZERO]).unwrap();
        assert_eq!(warped[0], outside);
    }

    #[test]
    fn test_misaligned() {
        let (rest, mut deformed) = random_pair(5, 7);
        let extra = (0..100)
            .map(|k| DVec3::new(-1.0 + 0.02 * k as f64, 0.5, 0.0))
            .find(|p| deformed.validate_insert(*p).is_ok())
            .unwrap();
        deformed.insert_point(extra).unwrap();

        assert!(matches!(
            warp_positions(&rest, &deformed, &[DVec3::ZERO]),
            Err(Error::Misaligned { .. })
        ));

        let (rest, mut deformed) = random_pair(5, 7);
        deformed.remove_point(6).unwrap();
        assert_eq!(
            check_alignment(&rest, &deformed),
            Err(Error::Misaligned { index: 6 })
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (rest, mut deformed) = random_pair(30, 8);
        let ids: Vec<usize> = rest.points().map(|(i, _)| i).filter(|i| *i >= 4).collect();
        for (k, i) in ids.into_iter().enumerate() {
            let p = deformed.point(i).unwrap();
            let _ = deformed.move_point(i, p * if k % 2 == 0 { 0.95 } else { 1.02 });
        }
        let mesh = random_mesh(2000, 9);

        let seq = warp_positions(&rest, &deformed, &mesh).unwrap();
        let par = warp_positions_par(&rest, &deformed, &mesh).unwrap();
        assert_eq!(seq, par);
    }
}
