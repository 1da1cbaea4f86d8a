use crate::error::{GeomError, Result};
use crate::vec3::Vec3;
use nalgebra::{Matrix3, SymmetricEigen};

/// Which side of a plane a point falls on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Below,
    On,
    Above,
}

/// A plane defined by a unit normal and a point lying on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub point: Vec3,
}

impl Plane {
    /// Constructs a plane from a normal (normalized internally) and a point on it.
    ///
    /// # Errors
    /// Returns [`GeomError::ZeroLengthVector`] if `normal` is zero-length.
    pub fn new(normal: Vec3, point: Vec3) -> Result<Plane> {
        Ok(Plane {
            normal: normal.unit()?,
            point,
        })
    }

    /// The signed distance from `p` to this plane, positive on the side the normal points to.
    pub fn signed_distance(&self, p: &Vec3) -> f64 {
        self.normal.dot(&(*p - self.point))
    }

    /// Classifies `p` against this plane, `on` within `tol` of zero signed distance.
    pub fn classify(&self, p: &Vec3, tol: f64) -> Side {
        let d = self.signed_distance(p);
        if d.abs() <= tol {
            Side::On
        } else if d > 0.0 {
            Side::Above
        } else {
            Side::Below
        }
    }

    /// Fits a plane to a point set by orthogonal regression (total least squares): the
    /// centroid is the plane's point, and the normal is the eigenvector of the smallest
    /// eigenvalue of the points' covariance matrix.
    ///
    /// # Errors
    /// Returns [`GeomError::TooFewPoints`] if fewer than 3 points are given, or
    /// [`GeomError::CollinearPoints`] if the points are (numerically) collinear, in which
    /// case no unique best-fit plane normal exists.
    pub fn fit(points: &[Vec3]) -> Result<Plane> {
        if points.len() < 3 {
            return Err(GeomError::TooFewPoints(points.len()));
        }

        let n = points.len() as f64;
        let mut centroid = Vec3::ZERO;
        for p in points {
            centroid = centroid + *p;
        }
        centroid = centroid / n;

        let mut cov = Matrix3::zeros();
        for p in points {
            let d = *p - centroid;
            cov[(0, 0)] += d.x * d.x;
            cov[(0, 1)] += d.x * d.y;
            cov[(0, 2)] += d.x * d.z;
            cov[(1, 0)] += d.y * d.x;
            cov[(1, 1)] += d.y * d.y;
            cov[(1, 2)] += d.y * d.z;
            cov[(2, 0)] += d.z * d.x;
            cov[(2, 1)] += d.z * d.y;
            cov[(2, 2)] += d.z * d.z;
        }
        cov /= n;

        let eigen = SymmetricEigen::new(cov);
        // Smallest eigenvalue's eigenvector is the best-fit normal.
        let mut min_idx = 0usize;
        for i in 1..3 {
            if eigen.eigenvalues[i] < eigen.eigenvalues[min_idx] {
                min_idx = i;
            }
        }

        // If the two largest eigenvalues are both ~0, the points are collinear (or a single
        // point repeated) and no unique plane normal exists.
        let mut sorted = [eigen.eigenvalues[0], eigen.eigenvalues[1], eigen.eigenvalues[2]];
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        if sorted[2] <= f64::EPSILON || sorted[1] <= 1e-9 * sorted[2].max(1.0) {
            return Err(GeomError::CollinearPoints);
        }

        let v = eigen.eigenvectors.column(min_idx);
        let normal = Vec3::new(v[0], v[1], v[2]).unit()?;
        Ok(Plane { normal, point: centroid })
    }
}
