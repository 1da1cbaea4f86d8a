use crate::error::{CoreError, Result};
use crate::image::{GridRegime, ImageArray, PlanarImage};
use dicomaton_world::Vec3;
use std::collections::HashMap;

/// An integer indexing of images along a normal such that adjacent integers
/// correspond to physically adjacent planes. Valid only while the underlying
/// images are unmodified in geometry; voxel value updates are permitted.
///
/// Grounded on the common single-group case: construction takes one or more
/// image-array groups and flattens their images into one z-index.
pub struct ImageAdjacency<'a, T> {
    normal: Vec3,
    /// `(group index, image index within group)` ordered by position along `normal`.
    order: Vec<(usize, usize)>,
    index_of: HashMap<(usize, usize), i64>,
    groups: Vec<&'a ImageArray<T>>,
}

impl<'a, T: Copy + Into<f64> + From<f64>> ImageAdjacency<'a, T> {
    /// Builds a z-index over `groups` along `normal`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidGrid`] if any group is not (at least)
    /// rectilinear.
    pub fn new(groups: Vec<&'a ImageArray<T>>, normal: Vec3) -> Result<Self> {
        for group in &groups {
            if matches!(group.regime(), GridRegime::Irregular) {
                return Err(CoreError::InvalidGrid(
                    "image set does not form a rectilinear grid".into(),
                ));
            }
        }
        let normal = normal
            .unit()
            .map_err(|e| CoreError::DegenerateInput(e.to_string()))?;

        let mut positioned: Vec<((usize, usize), f64)> = Vec::new();
        for (g, group) in groups.iter().enumerate() {
            for (i, img) in group.images().iter().enumerate() {
                let pos = (img.anchor() + img.offset()).dot(&normal);
                positioned.push(((g, i), pos));
            }
        }
        // O(N log N): the dominant cost of construction.
        positioned.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let order: Vec<(usize, usize)> = positioned.iter().map(|(key, _)| *key).collect();
        let index_of = order
            .iter()
            .enumerate()
            .map(|(z, key)| (*key, z as i64))
            .collect();

        Ok(Self { normal, order, index_of, groups })
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    fn key_of(&self, img: &PlanarImage<T>) -> Option<(usize, usize)> {
        for (g, group) in self.groups.iter().enumerate() {
            for (i, candidate) in group.images().iter().enumerate() {
                if std::ptr::eq(candidate, img) {
                    return Some((g, i));
                }
            }
        }
        None
    }

    pub fn image_present(&self, img: &PlanarImage<T>) -> bool {
        self.key_of(img).is_some()
    }

    pub fn index_present(&self, i: i64) -> bool {
        i >= 0 && (i as usize) < self.order.len()
    }

    pub fn index_to_image(&self, i: i64) -> Option<&'a PlanarImage<T>> {
        if !self.index_present(i) {
            return None;
        }
        let (g, img_idx) = self.order[i as usize];
        self.groups[g].images().get(img_idx)
    }

    pub fn image_to_index(&self, img: &PlanarImage<T>) -> Option<i64> {
        let key = self.key_of(img)?;
        self.index_of.get(&key).copied()
    }

    /// The images whose in-plane footprint wholly overlaps `img`'s footprint:
    /// same row/column axes, pitch, row/column counts, and anchor projected onto
    /// the in-plane axes.
    pub fn get_wholly_overlapping_images(&self, img: &PlanarImage<T>) -> Vec<&'a PlanarImage<T>> {
        let mut out = Vec::new();
        for group in &self.groups {
            for candidate in group.images() {
                if std::ptr::eq(candidate, img) {
                    continue;
                }
                let same_axes = candidate.row_unit().distance_to(&img.row_unit()) < 1e-9
                    && candidate.col_unit().distance_to(&img.col_unit()) < 1e-9
                    && (candidate.pxl_dx() - img.pxl_dx()).abs() < 1e-9
                    && (candidate.pxl_dy() - img.pxl_dy()).abs() < 1e-9
                    && candidate.rows() == img.rows()
                    && candidate.columns() == img.columns();
                if !same_axes {
                    continue;
                }
                let lateral = candidate.anchor() + candidate.offset() - (img.anchor() + img.offset());
                let row_component = lateral.dot(&img.row_unit());
                let col_component = lateral.dot(&img.col_unit());
                if row_component.abs() < 1e-6 && col_component.abs() < 1e-6 {
                    out.push(candidate);
                }
            }
        }
        out
    }
}
