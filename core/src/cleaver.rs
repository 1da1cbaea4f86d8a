//! Plane-based contour splitting and area bisection (spec §4.8).

use crate::contour::ContourCollection;
use crate::error::{CoreError, Result};
use dicomaton_world::{Plane, Vec3};

/// The result of a successful or best-effort bisection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectionResult {
    pub plane: Plane,
    pub achieved_fraction: f64,
    pub iterations: usize,
}

/// Finds a plane with normal `normal` such that the fraction of `collection`'s
/// total planar area above the plane is within `tol` of `target_fraction`, via
/// bisection seeded from the projections of every contour vertex onto `normal`.
///
/// # Errors
/// Returns [`CoreError::EmptyCollection`] if `collection` has no vertices, or
/// [`CoreError::NonConvergent`] if `max_iters` is reached without meeting `tol`
/// (the last plane and achieved fraction are still reported via the error).
pub fn total_area_bisection_along_plane(
    collection: &ContourCollection,
    normal: Vec3,
    target_fraction: f64,
    tol: f64,
    max_iters: usize,
) -> Result<BisectionResult> {
    let normal = normal.unit().map_err(|e| CoreError::DegenerateInput(e.to_string()))?;

    let projections: Vec<f64> = collection
        .contours()
        .iter()
        .flat_map(|c| c.points().iter().map(|p| p.dot(&normal)))
        .collect();
    if projections.is_empty() {
        return Err(CoreError::EmptyCollection(
            "contour collection has no vertices to bisect".into(),
        ));
    }

    let total_area = collection.total_area(&normal);
    if total_area <= 0.0 {
        return Err(CoreError::EmptyCollection(
            "contour collection encloses zero area".into(),
        ));
    }

    let mut lo = *projections.iter().min_by(|a, b| a.partial_cmp(b).unwrap()).unwrap();
    let mut hi = *projections.iter().max_by(|a, b| a.partial_cmp(b).unwrap()).unwrap();

    let area_above = |offset: f64| -> Result<f64> {
        let plane = Plane::new(normal, normal * offset)?;
        let (_below, above) = collection.split_along_plane(&plane)?;
        Ok(above.total_area(&normal))
    };

    let mut mid = 0.5 * (lo + hi);
    let mut achieved = area_above(mid)? / total_area;
    let mut iterations = 0;
    while (achieved - target_fraction).abs() > tol && iterations < max_iters {
        // Larger offset => plane moves toward +normal => less area remains "above".
        if achieved > target_fraction {
            lo = mid;
        } else {
            hi = mid;
        }
        mid = 0.5 * (lo + hi);
        achieved = area_above(mid)? / total_area;
        iterations += 1;
    }

    let plane = Plane::new(normal, normal * mid)?;
    if (achieved - target_fraction).abs() > tol {
        return Err(CoreError::NonConvergent { iterations, achieved });
    }
    Ok(BisectionResult { plane, achieved_fraction: achieved, iterations })
}

/// Axis order for [`subsegment_nested`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::new(1.0, 0.0, 0.0),
            Axis::Y => Vec3::new(0.0, 1.0, 0.0),
            Axis::Z => Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

/// The lower and upper bounding planes for the sub-segment of `collection`
/// between `offset_from_bottom` and `offset_from_bottom + thickness` (both
/// fractions in `[0, 1]`) along `axis`, via two bisector invocations.
fn axis_bounding_planes(
    collection: &ContourCollection,
    axis: Axis,
    thickness: f64,
    offset_from_bottom: f64,
    tol: f64,
    max_iters: usize,
) -> Result<(Plane, Plane)> {
    let normal = axis.unit();
    let lower = 1.0 - offset_from_bottom;
    let upper = lower - thickness;
    let lower_plane = total_area_bisection_along_plane(collection, normal, lower, tol, max_iters)?.plane;
    let upper_plane = total_area_bisection_along_plane(collection, normal, upper, tol, max_iters)?.plane;
    Ok((lower_plane, upper_plane))
}

/// Intersects "above lower" and "below upper" for one axis, applied to
/// whatever collection is passed in (the original, for compound; the
/// previous axis's output, for nested).
fn intersect_bounding_planes(collection: &ContourCollection, lower: &Plane, upper: &Plane) -> Result<ContourCollection> {
    let (_, above_lower) = collection.split_along_plane(lower)?;
    let (below_upper, _) = above_lower.split_along_plane(upper)?;
    Ok(below_upper)
}

/// **Compound** strategy: bisects all three axes against the *original*
/// collection, then intersects all six half-spaces. May produce sub-segments
/// of inconsistent area.
pub fn subsegment_compound(
    collection: &ContourCollection,
    thickness: (f64, f64, f64),
    offset_from_bottom: (f64, f64, f64),
    tol: f64,
    max_iters: usize,
) -> Result<ContourCollection> {
    let (lx, ux) = axis_bounding_planes(collection, Axis::X, thickness.0, offset_from_bottom.0, tol, max_iters)?;
    let (ly, uy) = axis_bounding_planes(collection, Axis::Y, thickness.1, offset_from_bottom.1, tol, max_iters)?;
    let (lz, uz) = axis_bounding_planes(collection, Axis::Z, thickness.2, offset_from_bottom.2, tol, max_iters)?;

    let mut current = collection.clone();
    current = intersect_bounding_planes(&current, &lx, &ux)?;
    current = intersect_bounding_planes(&current, &ly, &uy)?;
    current = intersect_bounding_planes(&current, &lz, &uz)?;
    Ok(current)
}

/// **Nested** strategy (preferred default): applies axes in the order given;
/// each axis bisects the output of the previous, producing sub-segments of
/// approximately equal area.
pub fn subsegment_nested(
    collection: &ContourCollection,
    axes: &[(Axis, f64, f64)],
    tol: f64,
    max_iters: usize,
) -> Result<ContourCollection> {
    if axes.is_empty() {
        return Err(CoreError::InvalidArgument(
            "subsegment_nested requires a non-empty axis sequence".into(),
        ));
    }
    let mut current = collection.clone();
    for &(axis, thickness, offset_from_bottom) in axes {
        let (lower, upper) = axis_bounding_planes(&current, axis, thickness, offset_from_bottom, tol, max_iters)?;
        current = intersect_bounding_planes(&current, &lower, &upper)?;
    }
    Ok(current)
}
