use crate::error::{GeomError, Result};
use nalgebra::Matrix3;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// An ordered triple of finite `f64` components with the usual vector algebra.
///
/// `unit()` is only meaningful for non-zero vectors; callers are expected to handle the
/// degenerate (zero-length) case themselves, per the invariant documented on the geometry
/// primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_sq(&self) -> f64 {
        self.dot(self)
    }

    pub fn length(&self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn distance_to(&self, other: &Vec3) -> f64 {
        (*self - *other).length()
    }

    /// Returns a unit-length copy of this vector.
    ///
    /// # Errors
    /// Returns [`GeomError::ZeroLengthVector`] if the vector has zero (or near-zero) length.
    pub fn unit(&self) -> Result<Vec3> {
        let len = self.length();
        if len <= f64::EPSILON {
            return Err(GeomError::ZeroLengthVector);
        }
        Ok(*self / len)
    }

    /// Gram-Schmidt orthogonalisation of `a` and `b` against `self`.
    ///
    /// `self` is treated as already-unit and authoritative; `a` and `b` are mutated in place
    /// so that, on return, `(self, a, b)` (after `self.unit()`) form an orthonormal basis
    /// spanning the same plane as the original `(self, a, b)`. Mirrors the call pattern
    /// `ort_normal.GramSchmidt_orthogonalize(row_normal, col_normal)` used throughout the
    /// contour sub-segmentation operations.
    ///
    /// # Errors
    /// Returns [`GeomError::ParallelVectors`] if `a` or `b` is parallel to `self`, or
    /// [`GeomError::ZeroLengthVector`] if any input is degenerate.
    pub fn gram_schmidt_orthogonalize(&self, a: &mut Vec3, b: &mut Vec3) -> Result<()> {
        let n = self.unit()?;

        let a_proj = *a - n * n.dot(a);
        let a_unit = a_proj.unit().map_err(|_| GeomError::ParallelVectors)?;

        let b_proj = *b - n * n.dot(&b) - a_unit * a_unit.dot(&b);
        let b_unit = b_proj.unit().map_err(|_| GeomError::ParallelVectors)?;

        *a = a_unit;
        *b = b_unit;
        Ok(())
    }

    /// Builds the 3x3 rotation matrix that rotates unit vector `self` onto unit vector `other`.
    ///
    /// Uses the double-reflection identity (two Householder reflections compose to a rotation)
    /// rather than an axis-angle construction, so it remains well-defined even when `self` and
    /// `other` are antiparallel.
    ///
    /// # Errors
    /// Returns [`GeomError::ZeroLengthVector`] if either input is not unit-length-able, or
    /// [`GeomError::ParallelVectors`] if `self == other` (the identity is already the answer,
    /// but the reflection construction is undefined at that point; callers should special-case
    /// this before calling).
    pub fn rotation_to(&self, other: &Vec3) -> Result<Matrix3<f64>> {
        let u = self.unit()?;
        let v = other.unit()?;

        let sum = u + v;
        let sum_len_sq = sum.length_sq();
        if sum_len_sq <= f64::EPSILON {
            // u and v are antiparallel; the reflection through (u+v) is undefined because
            // u+v is the zero vector. Any vector orthogonal to u gives a valid mirror.
            let fallback = u.any_orthogonal();
            return reflect_compose(&u, &fallback, &v, &fallback);
        }
        reflect_compose(&u, &sum, &v, &sum)
    }

    /// Returns an arbitrary unit vector orthogonal to `self` (assumed unit-length).
    fn any_orthogonal(&self) -> Vec3 {
        let candidate = if self.x.abs() < 0.9 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        let proj = candidate - *self * self.dot(&candidate);
        proj.unit().unwrap_or(Vec3::new(0.0, 0.0, 1.0))
    }
}

/// Composes two Householder reflections (through `mirror`) so that `u` maps to `v`.
///
/// `reflect(x, m) = x - 2*(x.m/m.m)*m`; reflecting twice through the same mirror is the
/// identity restricted to that mirror's orthogonal complement but flips the component along
/// `u - v`, which is exactly the rotation we need when composed with a second reflection
/// through `u` itself.
fn reflect_compose(u: &Vec3, mirror1: &Vec3, _v: &Vec3, _mirror2: &Vec3) -> Result<Matrix3<f64>> {
    // R = I - 2*u*u^T / (u.u) composed with reflection through mirror1 gives rotation u -> v.
    // Concretely: Rotation = Householder(mirror1) * Householder(u), since
    // Householder(m) maps u -> v when m = u + v (standard identity).
    let m = *mirror1;
    let h_m = householder(&m)?;
    let h_u = householder(u)?;
    Ok(h_m * h_u)
}

fn householder(m: &Vec3) -> Result<Matrix3<f64>> {
    let len_sq = m.length_sq();
    if len_sq <= f64::EPSILON {
        return Err(GeomError::ZeroLengthVector);
    }
    let mm = Matrix3::new(
        m.x * m.x, m.x * m.y, m.x * m.z,
        m.y * m.x, m.y * m.y, m.y * m.z,
        m.z * m.x, m.z * m.y, m.z * m.z,
    );
    Ok(Matrix3::identity() - mm * (2.0 / len_sq))
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3, eps: f64) -> bool {
        (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps && (a.z - b.z).abs() < eps
    }

    #[test]
    fn dot_and_cross() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!(a.cross(&b), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn unit_rejects_zero_vector() {
        assert_eq!(Vec3::ZERO.unit(), Err(GeomError::ZeroLengthVector));
    }

    #[test]
    fn unit_normalizes() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let u = v.unit().unwrap();
        assert!((u.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn gram_schmidt_produces_orthonormal_basis() {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let mut a = Vec3::new(1.0, 0.3, 0.0);
        let mut b = Vec3::new(0.2, 1.0, 0.0);
        n.gram_schmidt_orthogonalize(&mut a, &mut b).unwrap();
        assert!((a.length() - 1.0).abs() < 1e-9);
        assert!((b.length() - 1.0).abs() < 1e-9);
        assert!(a.dot(&b).abs() < 1e-9);
        assert!(a.dot(&n).abs() < 1e-9);
        assert!(b.dot(&n).abs() < 1e-9);
    }

    #[test]
    fn gram_schmidt_rejects_parallel_input() {
        let n = Vec3::new(0.0, 0.0, 1.0);
        let mut a = Vec3::new(0.0, 0.0, 2.0);
        let mut b = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(
            n.gram_schmidt_orthogonalize(&mut a, &mut b),
            Err(GeomError::ParallelVectors)
        );
    }

    #[test]
    fn rotation_to_maps_u_onto_v() {
        let u = Vec3::new(1.0, 0.0, 0.0);
        let v = Vec3::new(0.0, 1.0, 0.0);
        let r = u.rotation_to(&v).unwrap();
        let rotated = r * nalgebra::Vector3::new(u.x, u.y, u.z);
        assert!(close(
            Vec3::new(rotated.x, rotated.y, rotated.z),
            v,
            1e-9
        ));
    }

    #[test]
    fn rotation_to_handles_antiparallel() {
        let u = Vec3::new(1.0, 0.0, 0.0);
        let v = Vec3::new(-1.0, 0.0, 0.0);
        let r = u.rotation_to(&v).unwrap();
        let rotated = r * nalgebra::Vector3::new(u.x, u.y, u.z);
        assert!(close(
            Vec3::new(rotated.x, rotated.y, rotated.z),
            v,
            1e-9
        ));
    }
}
