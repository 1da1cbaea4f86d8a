use crate::error::{CoreError, Result};
use dicomaton_threed::index::row_major;
use dicomaton_world::Vec3;
use std::collections::HashMap;

/// A rectangular pixel grid of one or more numeric channels sharing one scalar
/// element type. Voxel storage is dense and channel-major-within-position: for a
/// fixed `(r, c)` the `K` channels are contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarImage<T> {
    rows: usize,
    columns: usize,
    channels: usize,
    pxl_dx: f64,
    pxl_dy: f64,
    pxl_dz: f64,
    row_unit: Vec3,
    col_unit: Vec3,
    anchor: Vec3,
    offset: Vec3,
    data: Vec<T>,
    metadata: HashMap<String, String>,
}

impl<T: Copy + Into<f64> + From<f64>> PlanarImage<T> {
    /// Builds a planar image, validating the invariants in the data model: finite,
    /// orthogonal, unit-length in-plane axes; strictly positive pitches; a storage
    /// buffer holding exactly `rows * columns * channels` values.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rows: usize,
        columns: usize,
        channels: usize,
        pxl_dx: f64,
        pxl_dy: f64,
        pxl_dz: f64,
        row_unit: Vec3,
        col_unit: Vec3,
        anchor: Vec3,
        offset: Vec3,
        data: Vec<T>,
    ) -> Result<Self> {
        if rows == 0 || columns == 0 || channels == 0 {
            return Err(CoreError::InvalidArgument(
                "rows, columns, and channels must all be >= 1".into(),
            ));
        }
        if pxl_dx <= 0.0 || pxl_dy <= 0.0 || pxl_dz <= 0.0 {
            return Err(CoreError::InvalidArgument(
                "pixel pitches and through-plane thickness must be strictly positive".into(),
            ));
        }
        let row_unit = row_unit
            .unit()
            .map_err(|e| CoreError::DegenerateInput(e.to_string()))?;
        let col_unit = col_unit
            .unit()
            .map_err(|e| CoreError::DegenerateInput(e.to_string()))?;
        if row_unit.cross(&col_unit).length() < 1e-12 {
            return Err(CoreError::DegenerateInput(
                "row- and column-axis unit vectors must not be parallel".into(),
            ));
        }
        if row_unit.dot(&col_unit).abs() > 1e-9 {
            return Err(CoreError::DegenerateInput(
                "row- and column-axis unit vectors must be orthogonal".into(),
            ));
        }
        if data.len() != rows * columns * channels {
            return Err(CoreError::InvalidArgument(format!(
                "storage holds {} values, expected rows*columns*channels = {}",
                data.len(),
                rows * columns * channels
            )));
        }
        Ok(Self {
            rows,
            columns,
            channels,
            pxl_dx,
            pxl_dy,
            pxl_dz,
            row_unit,
            col_unit,
            anchor,
            offset,
            data,
            metadata: HashMap::new(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn pxl_dx(&self) -> f64 {
        self.pxl_dx
    }

    pub fn pxl_dy(&self) -> f64 {
        self.pxl_dy
    }

    pub fn pxl_dz(&self) -> f64 {
        self.pxl_dz
    }

    pub fn row_unit(&self) -> Vec3 {
        self.row_unit
    }

    pub fn col_unit(&self) -> Vec3 {
        self.col_unit
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    /// The in-plane normal: the cross of the row- and column-axis unit vectors.
    pub fn normal(&self) -> Vec3 {
        self.row_unit
            .cross(&self.col_unit)
            .unit()
            .expect("row_unit and col_unit are validated non-parallel at construction")
    }

    fn linear_index(&self, r: usize, c: usize, k: usize) -> Result<usize> {
        Ok(row_major(&[r, c, k], &[self.rows, self.columns, self.channels])?)
    }

    /// Reads voxel `(r, c, k)`. Bounds failures are signalled separately from data
    /// via `CoreError::InvalidGrid`.
    pub fn value(&self, r: usize, c: usize, k: usize) -> Result<T> {
        Ok(self.data[self.linear_index(r, c, k)?])
    }

    /// A mutable handle to voxel `(r, c, k)`.
    pub fn reference(&mut self, r: usize, c: usize, k: usize) -> Result<&mut T> {
        let idx = self.linear_index(r, c, k)?;
        Ok(&mut self.data[idx])
    }

    /// The in-space position of the centre of voxel `(r, c)`.
    pub fn position(&self, r: usize, c: usize) -> Vec3 {
        self.anchor
            + self.offset
            + self.row_unit * (self.pxl_dx * r as f64)
            + self.col_unit * (self.pxl_dy * c as f64)
    }

    /// The linear voxel index containing `point` on channel `channel`, or `None`
    /// when `point` lies outside the image's footprint (in-plane or out-of-plane).
    pub fn index(&self, point: Vec3, channel: usize) -> Option<usize> {
        if channel >= self.channels {
            return None;
        }
        let rel = point - (self.anchor + self.offset);
        let out_of_plane = rel.dot(&self.normal());
        if out_of_plane.abs() > 0.5 * self.pxl_dz {
            return None;
        }
        let r_coord = rel.dot(&self.row_unit) / self.pxl_dx;
        let c_coord = rel.dot(&self.col_unit) / self.pxl_dy;
        let r = r_coord.round();
        let c = c_coord.round();
        if r < 0.0 || c < 0.0 {
            return None;
        }
        let (r, c) = (r as usize, c as usize);
        if r >= self.rows || c >= self.columns {
            return None;
        }
        self.linear_index(r, c, channel).ok()
    }

    pub fn metadata_get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn metadata_set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata_erase(&mut self, key: &str) -> Option<String> {
        self.metadata.remove(key)
    }

    pub fn metadata_keys(&self) -> impl Iterator<Item = &String> {
        self.metadata.keys()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// The two regimes an image array's in-plane/through-plane geometry may satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRegime {
    /// Images share row/column axes and in-plane pitch; image-to-image step is any
    /// constant vector.
    Rectilinear,
    /// Rectilinear, and additionally uniformly spaced along the common normal at
    /// the through-plane pitch, with equal row/column counts.
    Regular,
    /// Neither regime holds.
    Irregular,
}

/// An ordered sequence of planar images sharing a coordinate system.
#[derive(Debug, Clone, Default)]
pub struct ImageArray<T> {
    images: Vec<PlanarImage<T>>,
}

impl<T: Copy + Into<f64> + From<f64>> ImageArray<T> {
    pub fn new(images: Vec<PlanarImage<T>>) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &[PlanarImage<T>] {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut [PlanarImage<T>] {
        &mut self.images
    }

    pub fn push(&mut self, image: PlanarImage<T>) {
        self.images.push(image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The derived grid regime: computed on demand, not cached, since regularity
    /// is a derived invariant rather than stored state.
    pub fn regime(&self) -> GridRegime {
        if self.images.len() < 2 {
            return GridRegime::Regular;
        }
        let first = &self.images[0];
        let rectilinear = self.images.iter().all(|img| {
            img.row_unit().distance_to(&first.row_unit()) < 1e-9
                && img.col_unit().distance_to(&first.col_unit()) < 1e-9
                && (img.pxl_dx() - first.pxl_dx()).abs() < 1e-9
                && (img.pxl_dy() - first.pxl_dy()).abs() < 1e-9
        });
        if !rectilinear {
            return GridRegime::Irregular;
        }

        let normal = first.normal();
        let mut positions: Vec<f64> = self
            .images
            .iter()
            .map(|img| (img.anchor() + img.offset()).dot(&normal))
            .collect();
        positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let equal_extent = self
            .images
            .iter()
            .all(|img| img.rows() == first.rows() && img.columns() == first.columns());
        let uniform_spacing = positions.windows(2).all(|w| {
            (w[1] - w[0] - first.pxl_dz()).abs() < 1e-6 * first.pxl_dz().max(1.0)
        });
        if equal_extent && uniform_spacing {
            GridRegime::Regular
        } else {
            GridRegime::Rectilinear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_image(offset_z: f64, value: f64) -> PlanarImage<f64> {
        PlanarImage::new(
            2,
            2,
            1,
            1.0,
            1.0,
            1.0,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, offset_z),
            vec![value; 4],
        )
        .unwrap()
    }

    #[test]
    fn position_is_linear_and_round_trips_through_index() {
        let img = unit_image(0.0, 0.0);
        for r in 0..2 {
            for c in 0..2 {
                let p = img.position(r, c);
                let idx = img.index(p, 0).unwrap();
                assert_eq!(idx, row_major(&[r, c, 0], &[2, 2, 1]).unwrap());
            }
        }
    }

    #[test]
    fn rejects_parallel_axes() {
        let result = PlanarImage::<f64>::new(
            2,
            2,
            1,
            1.0,
            1.0,
            1.0,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            vec![0.0; 4],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_bad_storage_length() {
        let result = PlanarImage::<f64>::new(
            2,
            2,
            1,
            1.0,
            1.0,
            1.0,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            vec![0.0; 3],
        );
        assert!(result.is_err());
    }

    #[test]
    fn regime_detects_regular_stack() {
        let stack = ImageArray::new(vec![unit_image(0.0, 0.0), unit_image(1.0, 1.0), unit_image(2.0, 2.0)]);
        assert_eq!(stack.regime(), GridRegime::Regular);
    }

    #[test]
    fn regime_detects_rectilinear_but_irregular_spacing() {
        let stack = ImageArray::new(vec![unit_image(0.0, 0.0), unit_image(1.0, 1.0), unit_image(3.0, 2.0)]);
        assert_eq!(stack.regime(), GridRegime::Rectilinear);
    }
}
