//! Contour overlap semantics (spec §4.7): the authoritative interior test for a
//! point against a contour collection, and how collection-level results combine
//! when more than one collection is in play (the voxel mutator's "aggregate" knob).

use crate::contour::{Contour, ContourCollection, Orientation};
use dicomaton_world::{Plane, Vec3};

/// Which of several overlapping contour collections determines interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    First,
    Last,
    Any,
}

/// How overlapping contours within one collection combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourOverlap {
    Ignore,
    HonourOppositeOrientations,
    ImplicitOrientations,
}

/// The inclusivity test applied to a voxel footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusivity {
    Centre,
    PlanarCornerInclusive,
    PlanarCornerExclusive,
}

/// A point-in-polygon test for `point` against `contour`, projecting both onto
/// the contour's own best-fit plane basis via ray casting in 2-D.
pub fn contour_contains_point(contour: &Contour, point: Vec3) -> bool {
    let Ok(plane) = contour.plane() else { return false };
    let Some((u, v)) = plane_basis(&plane) else { return false };

    let to_2d = |p: Vec3| -> (f64, f64) {
        let d = p - plane.point;
        (d.dot(&u), d.dot(&v))
    };

    let poly: Vec<(f64, f64)> = contour.points().iter().map(|&p| to_2d(p)).collect();
    if poly.len() < 3 {
        return false;
    }
    let (px, py) = to_2d(point);
    point_in_polygon(px, py, &poly)
}

fn plane_basis(plane: &Plane) -> Option<(Vec3, Vec3)> {
    let mut u = if plane.normal.cross(&Vec3::new(1.0, 0.0, 0.0)).length() > 1e-6 {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    let mut v = plane.normal.cross(&u);
    plane.normal.gram_schmidt_orthogonalize(&mut u, &mut v).ok()?;
    Some((u, v))
}

fn point_in_polygon(px: f64, py: f64, poly: &[(f64, f64)]) -> bool {
    let n = poly.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = poly[i];
        let (xj, yj) = poly[j];
        let crosses = (yi > py) != (yj > py);
        if crosses {
            let x_at_y = xi + (py - yi) * (xj - xi) / (yj - yi);
            if px < x_at_y {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether `point` is interior to `collection` under `overlap`, testing each
/// contour's footprint with `test_point` (usually the voxel centre, or one of
/// its projected corners — callers combine corner results per [`Inclusivity`]).
pub fn collection_interior(point: Vec3, collection: &ContourCollection, overlap: ContourOverlap) -> bool {
    match overlap {
        ContourOverlap::Ignore => collection.contours().iter().any(|c| contour_contains_point(c, point)),
        ContourOverlap::HonourOppositeOrientations => {
            let mut pos = 0i32;
            let mut neg = 0i32;
            for c in collection.contours() {
                if !contour_contains_point(c, point) {
                    continue;
                }
                let Ok(normal) = c.average_normal() else { continue };
                match c.orientation(&normal) {
                    Orientation::CounterClockwise => pos += 1,
                    Orientation::Clockwise => neg += 1,
                }
            }
            pos > neg
        }
        ContourOverlap::ImplicitOrientations => {
            let count = collection.contours().iter().filter(|c| contour_contains_point(c, point)).count();
            count % 2 == 1
        }
    }
}

/// Combines per-collection interior results per `aggregate`.
pub fn aggregate_interior(results: &[bool], aggregate: Aggregate) -> bool {
    match aggregate {
        Aggregate::Any => results.iter().any(|&b| b),
        Aggregate::First => results.first().copied().unwrap_or(false),
        Aggregate::Last => results.last().copied().unwrap_or(false),
    }
}

/// Evaluates whether `point` is interior across all of `collections`, per
/// `overlap` within each collection and `aggregate` across collections.
pub fn voxel_interior(point: Vec3, collections: &[&ContourCollection], overlap: ContourOverlap, aggregate: Aggregate) -> bool {
    let results: Vec<bool> = collections.iter().map(|c| collection_interior(point, c, overlap)).collect();
    aggregate_interior(&results, aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64, half: f64, centre: (f64, f64)) -> Contour {
        Contour::new(
            vec![
                Vec3::new(centre.0 - half, centre.1 - half, z),
                Vec3::new(centre.0 + half, centre.1 - half, z),
                Vec3::new(centre.0 + half, centre.1 + half, z),
                Vec3::new(centre.0 - half, centre.1 + half, z),
            ],
            true,
        )
    }

    #[test]
    fn contains_centre_not_outside() {
        let c = square(0.0, 1.0, (0.0, 0.0));
        assert!(contour_contains_point(&c, Vec3::ZERO));
        assert!(!contour_contains_point(&c, Vec3::new(5.0, 5.0, 0.0)));
    }

    #[test]
    fn concentric_opposite_orientation_annulus() {
        // Outer CCW square, area 4x4; inner CW square, area 2x2: annulus interior.
        let outer = square(0.0, 2.0, (0.0, 0.0));
        let mut inner = square(0.0, 1.0, (0.0, 0.0));
        inner.points_mut().reverse();
        let collection = ContourCollection::new(vec![outer, inner]);

        // Inside the annulus (between the two squares): interior under
        // honour-opposite-orientations and implicit-orientations, but not excluded by ignore.
        let annulus_pt = Vec3::new(1.5, 0.0, 0.0);
        assert!(collection_interior(annulus_pt, &collection, ContourOverlap::HonourOppositeOrientations));
        assert!(collection_interior(annulus_pt, &collection, ContourOverlap::ImplicitOrientations));
        assert!(collection_interior(annulus_pt, &collection, ContourOverlap::Ignore));

        // Inside the inner hole: not interior under honour/implicit, but interior under ignore.
        let hole_pt = Vec3::ZERO;
        assert!(!collection_interior(hole_pt, &collection, ContourOverlap::HonourOppositeOrientations));
        assert!(!collection_interior(hole_pt, &collection, ContourOverlap::ImplicitOrientations));
        assert!(collection_interior(hole_pt, &collection, ContourOverlap::Ignore));
    }
}
