use crate::error::{GeomError, Result};
use crate::vec3::Vec3;
use nalgebra::{Matrix4, Point3};

/// An affine spatial transform, represented as a 4x4 homogeneous matrix plus its cached
/// inverse. Backs the "spatial transform" payload kind on the Drover (§3/§4.9).
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

impl Transform {
    /// Builds a transform from an arbitrary 4x4 matrix.
    ///
    /// # Errors
    /// Returns [`GeomError::NonInvertibleTransform`] if the matrix has no inverse.
    pub fn new(matrix: Matrix4<f64>) -> Result<Self> {
        let inverse = matrix.try_inverse().ok_or(GeomError::NonInvertibleTransform)?;
        Ok(Self { matrix, inverse })
    }

    pub fn identity() -> Self {
        let matrix = Matrix4::identity();
        Self { matrix, inverse: matrix }
    }

    pub fn translation(v: Vec3) -> Self {
        let mut matrix = Matrix4::identity();
        matrix[(0, 3)] = v.x;
        matrix[(1, 3)] = v.y;
        matrix[(2, 3)] = v.z;

        let mut inverse = Matrix4::identity();
        inverse[(0, 3)] = -v.x;
        inverse[(1, 3)] = -v.y;
        inverse[(2, 3)] = -v.z;

        Self { matrix, inverse }
    }

    /// # Errors
    /// Returns [`GeomError::NonInvertibleTransform`] if any scale component is (near) zero.
    pub fn scale(v: Vec3) -> Result<Self> {
        if v.x.abs() < f64::EPSILON || v.y.abs() < f64::EPSILON || v.z.abs() < f64::EPSILON {
            return Err(GeomError::NonInvertibleTransform);
        }
        let mut matrix = Matrix4::identity();
        matrix[(0, 0)] = v.x;
        matrix[(1, 1)] = v.y;
        matrix[(2, 2)] = v.z;

        let mut inverse = Matrix4::identity();
        inverse[(0, 0)] = 1.0 / v.x;
        inverse[(1, 1)] = 1.0 / v.y;
        inverse[(2, 2)] = 1.0 / v.z;

        Ok(Self { matrix, inverse })
    }

    pub fn apply(&self, p: Vec3) -> Vec3 {
        let point = Point3::new(p.x, p.y, p.z);
        let t = self.matrix.transform_point(&point);
        Vec3::new(t.x, t.y, t.z)
    }

    pub fn apply_inverse(&self, p: Vec3) -> Vec3 {
        let point = Point3::new(p.x, p.y, p.z);
        let t = self.inverse.transform_point(&point);
        Vec3::new(t.x, t.y, t.z)
    }

    /// Composes `self` followed by `other`: `(self.then(other)).apply(p) == other.apply(self.apply(p))`.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            matrix: other.matrix * self.matrix,
            inverse: self.inverse * other.inverse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_round_trips() {
        let t = Transform::translation(Vec3::new(10.0, 20.0, 30.0));
        let p = Vec3::new(5.0, 6.0, 7.0);
        let moved = t.apply(p);
        assert_eq!(moved, Vec3::new(15.0, 26.0, 37.0));
        let back = t.apply_inverse(moved);
        assert!((back.distance_to(&p)) < 1e-9);
    }

    #[test]
    fn scale_rejects_zero_component() {
        assert_eq!(
            Transform::scale(Vec3::new(1.0, 0.0, 1.0)),
            Err(GeomError::NonInvertibleTransform)
        );
    }

    #[test]
    fn composition_order() {
        let t1 = Transform::translation(Vec3::new(1.0, 0.0, 0.0));
        let t2 = Transform::translation(Vec3::new(0.0, 2.0, 0.0));
        let composed = t1.then(&t2);
        let p = Vec3::ZERO;
        assert_eq!(composed.apply(p), Vec3::new(1.0, 2.0, 0.0));
    }
}
