//! The volumetric neighbourhood sampler (spec §4.9): for each voxel inside a
//! contour collection, collect values from a local 3-D neighbourhood, reduce to
//! a scalar, and write back — the engine behind convolution, gamma comparison,
//! morphology, and isolated-voxel filtering.

use crate::adjacency::ImageAdjacency;
use crate::contour::ContourCollection;
use crate::error::{CoreError, Result};
use crate::image::{GridRegime, ImageArray};
use crate::overlap::{self, Aggregate, ContourOverlap};
use dicomaton_world::Vec3;
use rayon::prelude::*;

/// The three neighbourhood kinds a sampler can be configured with.
#[derive(Debug, Clone, PartialEq)]
pub enum Neighbourhood {
    /// Grow an outward cubic wavefront in voxel coordinates, keeping voxels
    /// whose in-space distance from the centre is `<= r_max`.
    Spherical { r_max: f64 },
    /// All voxels within an axis-aligned box of half-extent `r_max / pxl_*` in
    /// each direction. Requires a regular grid.
    Cubic { r_max: f64 },
    /// Explicit `(dr, dc, dz)` offsets relative to the centre voxel; a
    /// non-existent offset contributes `NaN` at the matching index.
    Selection(Vec<(i64, i64, i64)>),
}

/// Collects values from `neighbourhood` around `(r, c)` of image index
/// `img_index` in `snapshot` (accessed via `adjacency`), on `channel`.
fn gather<T: Copy + Into<f64> + From<f64>>(
    adjacency: &ImageAdjacency<T>,
    img_index: i64,
    r: usize,
    c: usize,
    channel: usize,
    neighbourhood: &Neighbourhood,
) -> Vec<T> {
    match neighbourhood {
        Neighbourhood::Spherical { r_max } => {
            let centre_img = adjacency.index_to_image(img_index).expect("valid centre image index");
            let centre_pos = centre_img.position(r, c);
            let mut collected = Vec::new();
            let mut shell: i64 = 0;
            loop {
                let mut any_within = false;
                for dk in -shell..=shell {
                    let candidate_index = img_index + dk;
                    if !adjacency.index_present(candidate_index) {
                        continue;
                    }
                    let img = adjacency.index_to_image(candidate_index).unwrap();
                    for dr in -shell..=shell {
                        for dc in -shell..=shell {
                            // Only the outer shell of this wavefront (the interior was
                            // already visited at a smaller shell radius).
                            if dr.abs().max(dc.abs()).max(dk.abs()) != shell {
                                continue;
                            }
                            let rr = r as i64 + dr;
                            let cc = c as i64 + dc;
                            if rr < 0 || cc < 0 || rr as usize >= img.rows() || cc as usize >= img.columns() {
                                continue;
                            }
                            let pos = img.position(rr as usize, cc as usize);
                            let dist = pos.distance_to(&centre_pos);
                            if dist <= *r_max {
                                if let Ok(v) = img.value(rr as usize, cc as usize, channel) {
                                    collected.push(v);
                                    any_within = true;
                                }
                            }
                        }
                    }
                }
                if !any_within {
                    break;
                }
                shell += 1;
                if shell > 10_000 {
                    break;
                }
            }
            collected
        }
        Neighbourhood::Cubic { r_max } => {
            let centre_img = adjacency.index_to_image(img_index).expect("valid centre image index");
            let half_r = (*r_max / centre_img.pxl_dx()).floor() as i64;
            let half_c = (*r_max / centre_img.pxl_dy()).floor() as i64;
            let half_k = (*r_max / centre_img.pxl_dz()).floor() as i64;
            let mut collected = Vec::new();
            for dk in -half_k..=half_k {
                let candidate_index = img_index + dk;
                if !adjacency.index_present(candidate_index) {
                    continue;
                }
                let img = adjacency.index_to_image(candidate_index).unwrap();
                for dr in -half_r..=half_r {
                    for dc in -half_c..=half_c {
                        let rr = r as i64 + dr;
                        let cc = c as i64 + dc;
                        if rr < 0 || cc < 0 || rr as usize >= img.rows() || cc as usize >= img.columns() {
                            continue;
                        }
                        if let Ok(v) = img.value(rr as usize, cc as usize, channel) {
                            collected.push(v);
                        }
                    }
                }
            }
            collected
        }
        Neighbourhood::Selection(triplets) => triplets
            .iter()
            .map(|&(dr, dc, dk)| {
                let candidate_index = img_index + dk;
                if !adjacency.index_present(candidate_index) {
                    return T::from(f64::NAN);
                }
                let img = adjacency.index_to_image(candidate_index).unwrap();
                let rr = r as i64 + dr;
                let cc = c as i64 + dc;
                if rr < 0 || cc < 0 || rr as usize >= img.rows() || cc as usize >= img.columns() {
                    return T::from(f64::NAN);
                }
                img.value(rr as usize, cc as usize, channel).unwrap_or(T::from(f64::NAN))
            })
            .collect(),
    }
}

/// Samples and reduces every channel-`channel` voxel of `target` that is
/// interior to `collections`, writing the reduction output back in place. The
/// sampler takes a read-only snapshot of `target` before editing so that
/// reductions see the unchanged neighbourhood even while the target is
/// overwritten; data-parallel across target images.
///
/// # Errors
/// Returns [`CoreError::InvalidGrid`] if `target` is not rectilinear (or, for
/// [`Neighbourhood::Cubic`], not regular).
pub fn sample_and_reduce<T, F>(
    target: &mut ImageArray<T>,
    collections: &[&ContourCollection],
    neighbourhood: &Neighbourhood,
    channel: usize,
    reduce: F,
) -> Result<()>
where
    T: Copy + Into<f64> + From<f64> + Send + Sync,
    F: Fn(T, &[T], Vec3) -> T + Sync,
{
    match target.regime() {
        GridRegime::Irregular => {
            return Err(CoreError::InvalidGrid("image array is not rectilinear".into()));
        }
        GridRegime::Rectilinear if matches!(neighbourhood, Neighbourhood::Cubic { .. }) => {
            return Err(CoreError::InvalidGrid(
                "Cubic neighbourhoods require a regular grid".into(),
            ));
        }
        _ => {}
    }

    tracing::debug!(images = target.len(), ?neighbourhood, channel, "sampling neighbourhood");
    let snapshot = target.clone();
    let normal = snapshot
        .images()
        .first()
        .map(|img| img.normal())
        .unwrap_or(Vec3::new(0.0, 0.0, 1.0));
    let adjacency = ImageAdjacency::new(vec![&snapshot], normal)?;

    let errors: Vec<CoreError> = target
        .images_mut()
        .par_iter_mut()
        .enumerate()
        .filter_map(|(img_idx, img)| -> Option<CoreError> {
            let z = adjacency.image_to_index(&snapshot.images()[img_idx])?;
            for r in 0..img.rows() {
                for c in 0..img.columns() {
                    let pos = img.position(r, c);
                    let interior = overlap::voxel_interior(pos, collections, ContourOverlap::Ignore, Aggregate::Any);
                    if !interior {
                        continue;
                    }
                    let centre_value = match snapshot.images()[img_idx].value(r, c, channel) {
                        Ok(v) => v,
                        Err(e) => return Some(e),
                    };
                    let neighbours = gather(&adjacency, z, r, c, channel, neighbourhood);
                    let new_value = reduce(centre_value, &neighbours, pos);
                    match img.reference(r, c, channel) {
                        Ok(slot) => *slot = new_value,
                        Err(e) => return Some(e),
                    }
                }
            }
            None
        })
        .collect();

    if let Some(e) = errors.into_iter().next() {
        return Err(e);
    }
    Ok(())
}

/// Ready-made reduction callbacks so operations don't each hand-roll them.
pub mod reduce {
    use super::*;

    /// The arithmetic mean of the gathered neighbourhood (which includes the
    /// centre voxel itself whenever it falls within the neighbourhood, e.g. for
    /// `Spherical` at shell zero).
    pub fn mean<T: Copy + Into<f64> + From<f64>>(_centre: T, values: &[T], _position: Vec3) -> T {
        if values.is_empty() {
            return T::from(f64::NAN);
        }
        let sum: f64 = values.iter().map(|&v| v.into()).sum();
        T::from(sum / values.len() as f64)
    }

    /// Flags (`1.0`/`0.0`) a voxel whose value disagrees with its neighbourhood
    /// mean by more than `threshold`.
    pub fn isolated_voxel<T: Copy + Into<f64> + From<f64>>(
        threshold: f64,
    ) -> impl Fn(T, &[T], Vec3) -> T {
        move |centre: T, values: &[T], position: Vec3| {
            let m: f64 = mean(centre, values, position).into();
            let c: f64 = centre.into();
            T::from(if (c - m).abs() > threshold { 1.0 } else { 0.0 })
        }
    }

    /// Counts voxels of `candidate` that pass a gamma-index comparison against
    /// `reference`: `candidate`'s value agrees with some voxel of `reference`
    /// within `dta_mm` spatially and `dose_pct` percent in value.
    ///
    /// This performs its own neighbourhood search (reusing the `Spherical`
    /// growth pattern) rather than going through [`sample_and_reduce`], since
    /// gamma comparison cross-references two distinct image arrays rather than
    /// reducing one array's own local window.
    pub fn gamma_pass_count<T>(
        reference: &ImageArray<T>,
        candidate: &ImageArray<T>,
        dta_mm: f64,
        dose_pct: f64,
        channel: usize,
    ) -> Result<usize>
    where
        T: Copy + Into<f64> + From<f64> + Send + Sync,
    {
        let normal = reference
            .images()
            .first()
            .map(|img| img.normal())
            .unwrap_or(Vec3::new(0.0, 0.0, 1.0));
        let ref_adjacency = ImageAdjacency::new(vec![reference], normal)?;

        let passed: usize = candidate
            .images()
            .par_iter()
            .enumerate()
            .map(|(img_idx, img)| {
                let mut local_passed = 0usize;
                let Some(z) = ref_adjacency.image_to_index(&reference.images()[img_idx.min(reference.len().saturating_sub(1))]) else {
                    return 0usize;
                };
                for r in 0..img.rows() {
                    for c in 0..img.columns() {
                        let Ok(cand_value) = img.value(r, c, channel) else { continue };
                        let cand_value: f64 = cand_value.into();
                        let neighbourhood = Neighbourhood::Spherical { r_max: dta_mm };
                        let values = gather(&ref_adjacency, z, r, c, channel, &neighbourhood);
                        let any_match = values.iter().any(|&v| {
                            let v: f64 = v.into();
                            if v.abs() < f64::EPSILON {
                                (cand_value - v).abs() <= dose_pct / 100.0
                            } else {
                                ((cand_value - v) / v).abs() * 100.0 <= dose_pct
                            }
                        });
                        if any_match {
                            local_passed += 1;
                        }
                    }
                }
                local_passed
            })
            .sum();
        Ok(passed)
    }
}
