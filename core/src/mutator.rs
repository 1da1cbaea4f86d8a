//! Traversal of an image's voxels restricted to the interior of a contour
//! collection, invoking a user callback to read or mutate (spec §4.6).

use crate::contour::ContourCollection;
use crate::error::{CoreError, Result};
use crate::image::PlanarImage;
use crate::overlap::{self, Aggregate, ContourOverlap, Inclusivity};
use dicomaton_world::Vec3;
use rayon::prelude::*;
use std::sync::Mutex;

/// How the callback is expected to behave: mutate the target in place, or only
/// produce an interior mask without touching voxel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStyle {
    InPlace,
    CopyMask,
}

/// How many voxels the callback is handed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacencyMode {
    SingleVoxel,
    /// A cubic window of half-extent `radius` voxels in each in-plane direction.
    Neighbourhood { radius: usize },
}

/// A post-processing step applied to a freshly computed boolean interior mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMod {
    Noop,
    Invert,
    Dilate1,
    Erode1,
}

#[derive(Debug, Clone, Copy)]
pub struct MutateVoxelsOpts {
    pub edit_style: EditStyle,
    pub aggregate: Aggregate,
    pub adjacency: AdjacencyMode,
    pub mask_mod: MaskMod,
    pub contour_overlap: ContourOverlap,
    pub inclusivity: Inclusivity,
}

/// The four corners of voxel `(r, c)`'s in-plane footprint, in image-local units.
fn voxel_corners<T: Copy + Into<f64> + From<f64>>(img: &PlanarImage<T>, r: usize, c: usize) -> [Vec3; 4] {
    let centre = img.position(r, c);
    let dr = img.row_unit() * (0.5 * img.pxl_dx());
    let dc = img.col_unit() * (0.5 * img.pxl_dy());
    [centre - dr - dc, centre + dr - dc, centre + dr + dc, centre - dr + dc]
}

fn point_interior(point: Vec3, collections: &[&ContourCollection], opts: &MutateVoxelsOpts) -> bool {
    overlap::voxel_interior(point, collections, opts.contour_overlap, opts.aggregate)
}

/// Whether voxel `(r, c)` of `img` passes the configured inclusivity test
/// against `collections`.
fn voxel_interior<T: Copy + Into<f64> + From<f64>>(
    img: &PlanarImage<T>,
    r: usize,
    c: usize,
    collections: &[&ContourCollection],
    opts: &MutateVoxelsOpts,
) -> bool {
    match opts.inclusivity {
        Inclusivity::Centre => point_interior(img.position(r, c), collections, opts),
        Inclusivity::PlanarCornerInclusive => voxel_corners(img, r, c)
            .iter()
            .any(|&p| point_interior(p, collections, opts)),
        Inclusivity::PlanarCornerExclusive => voxel_corners(img, r, c)
            .iter()
            .all(|&p| point_interior(p, collections, opts)),
    }
}

/// Computes the boolean interior mask for every voxel position `(r, c)` of
/// `img`, row-major, applying `opts.mask_mod` as a post-process.
pub fn compute_mask<T: Copy + Into<f64> + From<f64> + Send + Sync>(
    img: &PlanarImage<T>,
    collections: &[&ContourCollection],
    opts: &MutateVoxelsOpts,
) -> Vec<bool> {
    let rows = img.rows();
    let columns = img.columns();
    let mut mask: Vec<bool> = (0..rows * columns)
        .into_par_iter()
        .map(|i| {
            let r = i / columns;
            let c = i % columns;
            voxel_interior(img, r, c, collections, opts)
        })
        .collect();

    apply_mask_mod(&mut mask, rows, columns, opts.mask_mod);
    mask
}

fn apply_mask_mod(mask: &mut [bool], rows: usize, columns: usize, mode: MaskMod) {
    match mode {
        MaskMod::Noop => {}
        MaskMod::Invert => mask.iter_mut().for_each(|b| *b = !*b),
        MaskMod::Dilate1 => morphology(mask, rows, columns, true),
        MaskMod::Erode1 => morphology(mask, rows, columns, false),
    }
}

/// 4-connected binary dilation (`grow = true`) or erosion (`grow = false`).
fn morphology(mask: &mut [bool], rows: usize, columns: usize, grow: bool) {
    let original = mask.to_vec();
    let at = |r: i64, c: i64| -> bool {
        if r < 0 || c < 0 || r as usize >= rows || c as usize >= columns {
            !grow
        } else {
            original[r as usize * columns + c as usize]
        }
    };
    for r in 0..rows {
        for c in 0..columns {
            let (ri, ci) = (r as i64, c as i64);
            let neighbours = [at(ri - 1, ci), at(ri + 1, ci), at(ri, ci - 1), at(ri, ci + 1)];
            let self_val = original[r * columns + c];
            mask[r * columns + c] = if grow {
                self_val || neighbours.iter().any(|&b| b)
            } else {
                self_val && neighbours.iter().all(|&b| b)
            };
        }
    }
}

/// The voxel at `(r, c, k)` of `img` paired with every voxel `opts.adjacency`
/// says the callback should also see, centre first. Under `SingleVoxel` this
/// is always a single-element slice; under `Neighbourhood { radius }` it also
/// contains every voxel within `radius` rows/columns, clipped at the image
/// boundary, in row-major order.
fn voxel_window<T: Copy + Into<f64> + From<f64>>(
    img: &PlanarImage<T>,
    r: usize,
    c: usize,
    k: usize,
    adjacency: AdjacencyMode,
) -> Vec<(T, Vec3)> {
    let centre = (
        img.value(r, c, k).expect("(r, c, k) was validated in-bounds by the caller"),
        img.position(r, c),
    );
    let radius = match adjacency {
        AdjacencyMode::SingleVoxel => return vec![centre],
        AdjacencyMode::Neighbourhood { radius } => radius,
    };
    let mut window = vec![centre];
    let r_lo = r.saturating_sub(radius);
    let r_hi = (r + radius).min(img.rows().saturating_sub(1));
    let c_lo = c.saturating_sub(radius);
    let c_hi = (c + radius).min(img.columns().saturating_sub(1));
    for rr in r_lo..=r_hi {
        for cc in c_lo..=c_hi {
            if rr == r && cc == c {
                continue;
            }
            if let Ok(v) = img.value(rr, cc, k) {
                window.push((v, img.position(rr, cc)));
            }
        }
    }
    window
}

/// Mutates every voxel of `target` that passes the inclusivity test, invoking
/// `f(window) -> new_value` where `window[0]` is always `(current_value,
/// position)` of the voxel being visited and, under `AdjacencyMode::Neighbourhood`,
/// the rest of `window` is its local neighbourhood (see [`voxel_window`]).
/// Visits exactly one voxel per interior position.
pub fn mutate_voxels<T, F>(
    target: &mut PlanarImage<T>,
    collections: &[&ContourCollection],
    opts: &MutateVoxelsOpts,
    f: F,
) -> Result<()>
where
    T: Copy + Into<f64> + From<f64> + Send + Sync,
    F: Fn(&[(T, Vec3)]) -> T + Sync,
{
    if opts.edit_style != EditStyle::InPlace {
        return Err(CoreError::InvalidArgument(
            "mutate_voxels requires EditStyle::InPlace; use compute_mask for CopyMask".into(),
        ));
    }
    let rows = target.rows();
    let columns = target.columns();
    let channels = target.channels();
    let mask = compute_mask(target, collections, opts);
    tracing::trace!(interior_voxels = mask.iter().filter(|&&b| b).count(), rows, columns, "computed mask");

    let error: Mutex<Option<CoreError>> = Mutex::new(None);
    let positions: Vec<(usize, usize)> = (0..rows * columns)
        .filter(|&i| mask[i])
        .map(|i| (i / columns, i % columns))
        .collect();

    for (r, c) in positions {
        for k in 0..channels {
            let window = voxel_window(target, r, c, k, opts.adjacency);
            let updated = f(&window);
            match target.reference(r, c, k) {
                Ok(slot) => *slot = updated,
                Err(e) => {
                    *error.lock().unwrap() = Some(e);
                }
            }
        }
    }

    if let Some(e) = error.into_inner().unwrap() {
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::Contour;

    fn make_image() -> PlanarImage<f64> {
        PlanarImage::new(
            4,
            4,
            1,
            1.0,
            1.0,
            1.0,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            vec![0.0; 16],
        )
        .unwrap()
    }

    fn default_opts() -> MutateVoxelsOpts {
        MutateVoxelsOpts {
            edit_style: EditStyle::InPlace,
            aggregate: Aggregate::Any,
            adjacency: AdjacencyMode::SingleVoxel,
            mask_mod: MaskMod::Noop,
            contour_overlap: ContourOverlap::Ignore,
            inclusivity: Inclusivity::Centre,
        }
    }

    #[test]
    fn mutates_exactly_the_interior_voxels() {
        let mut img = make_image();
        let square = Contour::new(
            vec![
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(2.5, 0.5, 0.0),
                Vec3::new(2.5, 2.5, 0.0),
                Vec3::new(0.5, 2.5, 0.0),
            ],
            true,
        );
        let collection = ContourCollection::new(vec![square]);
        mutate_voxels(&mut img, &[&collection], &default_opts(), |_window| 1.0).unwrap();

        let mut touched = 0;
        for r in 0..4 {
            for c in 0..4 {
                let v = img.value(r, c, 0).unwrap();
                if v == 1.0 {
                    touched += 1;
                    assert!(r >= 1 && r <= 2 && c >= 1 && c <= 2);
                }
            }
        }
        assert_eq!(touched, 4);
    }

    #[test]
    fn copy_mask_does_not_mutate_target() {
        let img = make_image();
        let square = Contour::new(
            vec![
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(2.5, 0.5, 0.0),
                Vec3::new(2.5, 2.5, 0.0),
                Vec3::new(0.5, 2.5, 0.0),
            ],
            true,
        );
        let collection = ContourCollection::new(vec![square]);
        let mask = compute_mask(&img, &[&collection], &default_opts());
        assert_eq!(mask.iter().filter(|&&b| b).count(), 4);
        for v in img.as_slice() {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn neighbourhood_window_includes_clipped_radius_and_centre_first() {
        let mut img = make_image();
        for i in 0..16 {
            img.as_mut_slice()[i] = i as f64;
        }
        let corner = Contour::new(
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            true,
        );
        let collection = ContourCollection::new(vec![corner]);
        let mut opts = default_opts();
        opts.adjacency = AdjacencyMode::Neighbourhood { radius: 1 };

        let seen_window_len = std::sync::atomic::AtomicUsize::new(0);
        mutate_voxels(&mut img, &[&collection], &opts, |window| {
            seen_window_len.store(window.len(), std::sync::atomic::Ordering::Relaxed);
            window[0].0
        })
        .unwrap();

        // voxel (0, 0) has only three in-bounds neighbours within radius 1
        // (itself plus (0,1), (1,0), (1,1)): clipped at the top-left corner.
        assert_eq!(seen_window_len.load(std::sync::atomic::Ordering::Relaxed), 4);
    }
}
