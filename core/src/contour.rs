use crate::error::{CoreError, Result};
use dicomaton_common::Validate;
use dicomaton_world::{Plane, Vec3};
use std::collections::HashMap;

/// The point along segment `a`-`b` where `plane`'s signed distance crosses
/// zero, found by linear interpolation of the (linear) signed-distance field.
fn intersect_edge(plane: &Plane, a: &Vec3, b: &Vec3) -> Vec3 {
    let da = plane.signed_distance(a);
    let db = plane.signed_distance(b);
    let t = da / (da - db);
    *a + (*b - *a) * t
}

/// Which way a closed contour winds about its plane's normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Clockwise,
    CounterClockwise,
}

/// An ordered sequence of 3-vectors, closed or open, with free-form metadata.
/// Closed contours are oriented polygons, treated as planar.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Vec3>,
    closed: bool,
    metadata: HashMap<String, String>,
}

impl Contour {
    pub fn new(points: Vec<Vec3>, closed: bool) -> Self {
        Self { points, closed, metadata: HashMap::new() }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut Vec<Vec3> {
        &mut self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
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

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn centroid(&self) -> Vec3 {
        let n = self.points.len().max(1) as f64;
        let mut sum = Vec3::ZERO;
        for p in &self.points {
            sum = sum + *p;
        }
        sum / n
    }

    /// The average-normal estimate used to treat this contour as planar: the
    /// cross-product sum of consecutive edges about the centroid, normalized.
    pub fn average_normal(&self) -> Result<Vec3> {
        if self.points.len() < 3 {
            return Err(CoreError::DegenerateInput(
                "at least 3 points are required to estimate a contour normal".into(),
            ));
        }
        let centroid = self.centroid();
        let mut accum = Vec3::ZERO;
        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i] - centroid;
            let b = self.points[(i + 1) % n] - centroid;
            accum = accum + a.cross(&b);
        }
        accum.unit().map_err(|e| CoreError::DegenerateInput(e.to_string()))
    }

    /// The plane this contour is treated as lying on: average normal plus centroid.
    pub fn plane(&self) -> Result<Plane> {
        match self.average_normal() {
            Ok(normal) => Ok(Plane::new(normal, self.centroid())?),
            Err(_) => Ok(Plane::fit(&self.points)?),
        }
    }

    /// Signed area about `normal`: the half-magnitude of the cross-product sum,
    /// signed by agreement with `normal`.
    pub fn signed_area(&self, normal: &Vec3) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let centroid = self.centroid();
        let mut accum = Vec3::ZERO;
        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i] - centroid;
            let b = self.points[(i + 1) % n] - centroid;
            accum = accum + a.cross(&b);
        }
        0.5 * accum.dot(normal)
    }

    pub fn area(&self) -> f64 {
        self.average_normal().map(|n| self.signed_area(&n).abs()).unwrap_or(0.0)
    }

    pub fn orientation(&self, about: &Vec3) -> Orientation {
        if self.signed_area(about) >= 0.0 {
            Orientation::CounterClockwise
        } else {
            Orientation::Clockwise
        }
    }

    /// Axis-aligned bounds as `(min, max)`. Degenerate (both equal to the origin
    /// translated by nothing) for an empty contour.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.points.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        let mut min = self.points[0];
        let mut max = self.points[0];
        for p in &self.points[1..] {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        (min, max)
    }

    /// Splits this contour by `plane` into `(below, above)`. Vertices exactly on
    /// the plane are assigned to `above`. Every edge crossing the plane
    /// contributes the edge/plane intersection point to both sides, so a
    /// convex polygon cut strictly between its vertices still yields two
    /// real, non-degenerate boundaries rather than two disjoint vertex
    /// subsets. A fully-one-sided contour yields an empty collection on the
    /// other side.
    pub fn split_along_plane(&self, plane: &Plane) -> (Vec<Vec3>, Vec<Vec3>) {
        let n = self.points.len();
        if n == 0 {
            return (Vec::new(), Vec::new());
        }
        let is_below = |p: &Vec3| plane.signed_distance(p) < 0.0;
        let edge_count = if self.closed { n } else { n - 1 };

        let mut below = Vec::new();
        let mut above = Vec::new();
        for i in 0..n {
            let cur = self.points[i];
            if is_below(&cur) {
                below.push(cur);
            } else {
                above.push(cur);
            }
            if i >= edge_count {
                continue;
            }
            let next = self.points[(i + 1) % n];
            if is_below(&cur) != is_below(&next) {
                let intersection = intersect_edge(plane, &cur, &next);
                below.push(intersection);
                above.push(intersection);
            }
        }
        (below, above)
    }
}

/// A contour is well-formed when it has enough points to be meaningfully
/// planar: at least 3 for a closed polygon, at least 2 for an open polyline.
impl Validate<bool> for Contour {
    fn validate(&self) -> bool {
        if self.closed {
            self.points.len() >= 3
        } else {
            self.points.len() >= 2
        }
    }
}

/// An unordered set of contours sharing a logical ROI identity.
#[derive(Debug, Clone, Default)]
pub struct ContourCollection {
    contours: Vec<Contour>,
    metadata: HashMap<String, String>,
}

impl ContourCollection {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self { contours, metadata: HashMap::new() }
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn contours_mut(&mut self) -> &mut Vec<Contour> {
        &mut self.contours
    }

    pub fn push(&mut self, contour: Contour) {
        self.contours.push(contour);
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn metadata_get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn metadata_set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn total_area(&self, normal: &Vec3) -> f64 {
        self.contours.iter().map(|c| c.signed_area(normal).abs()).sum()
    }

    pub fn total_vertex_count(&self) -> usize {
        self.contours.iter().map(|c| c.points().len()).sum()
    }

    /// Splits every contour in the collection by `plane`, preserving ROI metadata
    /// on both halves. Contours contributing no vertices to a side are omitted
    /// from that side.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyCollection`] if the collection has no vertices.
    pub fn split_along_plane(&self, plane: &Plane) -> Result<(ContourCollection, ContourCollection)> {
        if self.total_vertex_count() == 0 {
            return Err(CoreError::EmptyCollection(
                "contour collection has no vertices to split".into(),
            ));
        }
        let mut below = ContourCollection { contours: Vec::new(), metadata: self.metadata.clone() };
        let mut above = ContourCollection { contours: Vec::new(), metadata: self.metadata.clone() };
        for contour in &self.contours {
            let (b, a) = contour.split_along_plane(plane);
            let mut nc = Contour::new(b, contour.is_closed());
            nc.metadata = contour.metadata.clone();
            if nc.validate() {
                below.push(nc);
            }
            let mut nc = Contour::new(a, contour.is_closed());
            nc.metadata = contour.metadata.clone();
            if nc.validate() {
                above.push(nc);
            }
        }
        Ok((below, above))
    }
}

/// An ordered list of contour collections.
#[derive(Debug, Clone, Default)]
pub struct ContourData {
    collections: Vec<ContourCollection>,
}

impl ContourData {
    pub fn new(collections: Vec<ContourCollection>) -> Self {
        Self { collections }
    }

    pub fn collections(&self) -> &[ContourCollection] {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut Vec<ContourCollection> {
        &mut self.collections
    }

    pub fn push(&mut self, collection: ContourCollection) {
        self.collections.push(collection);
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Selects collections whose `ROIName` metadata key equals `name`.
    pub fn by_roi_name(&self, name: &str) -> Vec<&ContourCollection> {
        self.collections
            .iter()
            .filter(|c| c.metadata_get("ROIName") == Some(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square(z: f64) -> Contour {
        Contour::new(
            vec![
                Vec3::new(0.0, 0.0, z),
                Vec3::new(1.0, 0.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(0.0, 1.0, z),
            ],
            true,
        )
    }

    #[test]
    fn area_of_unit_square_is_one() {
        let c = unit_square(0.0);
        assert!((c.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ccw_square_has_positive_signed_area_about_plus_z() {
        let c = unit_square(0.0);
        assert!(c.signed_area(&Vec3::new(0.0, 0.0, 1.0)) > 0.0);
        assert_eq!(c.orientation(&Vec3::new(0.0, 0.0, 1.0)), Orientation::CounterClockwise);
    }

    #[test]
    fn split_along_plane_preserves_metadata_on_both_halves() {
        let mut collection = ContourCollection::new(vec![unit_square(0.0)]);
        collection.contours_mut()[0].metadata_set("ROIName", "PTV");
        let plane = Plane::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)).unwrap();
        let (below, above) = collection.split_along_plane(&plane).unwrap();
        assert_eq!(below.contours()[0].metadata_get("ROIName"), Some("PTV"));
        assert_eq!(above.contours()[0].metadata_get("ROIName"), Some("PTV"));
    }

    #[test]
    fn split_along_plane_clips_edges_instead_of_dropping_them() {
        let square = unit_square(0.0);
        let plane = Plane::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)).unwrap();
        let (below, above) = square.split_along_plane(&plane);

        assert_eq!(below.len(), 4);
        assert_eq!(above.len(), 4);

        let below_area = Contour::new(below, true).signed_area(&Vec3::new(0.0, 0.0, 1.0));
        let above_area = Contour::new(above, true).signed_area(&Vec3::new(0.0, 0.0, 1.0));
        assert!((below_area - 0.5).abs() < 1e-9);
        assert!((above_area - 0.5).abs() < 1e-9);
    }

    #[test]
    fn split_along_plane_rejects_empty_collection() {
        let collection = ContourCollection::default();
        let plane = Plane::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO).unwrap();
        assert!(collection.split_along_plane(&plane).is_err());
    }
}
