//! The smaller payload kinds held on the Drover alongside images and contours.

use dicomaton_world::{Transform, Vec3};
use std::collections::HashMap;

/// An unordered set of 3-D points with free-form metadata.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub points: Vec<Vec3>,
    pub metadata: HashMap<String, String>,
}

impl PointCloud {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points, metadata: HashMap::new() }
    }
}

/// A triangulated surface: a vertex buffer plus triangles of vertex indices.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[usize; 3]>,
    pub metadata: HashMap<String, String>,
}

impl SurfaceMesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces, metadata: HashMap::new() }
    }

    /// Checks that every face references only in-bounds vertex indices.
    pub fn is_well_formed(&self) -> bool {
        self.faces.iter().all(|f| f.iter().all(|&i| i < self.vertices.len()))
    }
}

/// An ordered sequence of `(abscissa, ordinate)` samples, e.g. a dose-volume curve.
#[derive(Debug, Clone, Default)]
pub struct LineSample {
    pub samples: Vec<(f64, f64)>,
    pub metadata: HashMap<String, String>,
}

impl LineSample {
    pub fn new(samples: Vec<(f64, f64)>) -> Self {
        Self { samples, metadata: HashMap::new() }
    }
}

/// One static beam state within a dynamic state of a treatment plan: its
/// cumulative-meterset-weight must be strictly monotonically increasing within
/// the owning dynamic state.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticState {
    pub cumulative_meterset_weight: f64,
    pub metadata: HashMap<String, String>,
}

/// An ordered list of static states delivered as one continuous arc/segment.
#[derive(Debug, Clone, Default)]
pub struct DynamicState {
    pub static_states: Vec<StaticState>,
}

impl DynamicState {
    /// Verifies the strictly-monotonic cumulative-meterset-weight invariant.
    pub fn is_monotonic(&self) -> bool {
        self.static_states
            .windows(2)
            .all(|w| w[1].cumulative_meterset_weight > w[0].cumulative_meterset_weight)
    }
}

/// A treatment plan: an ordered sequence of dynamic states.
#[derive(Debug, Clone, Default)]
pub struct TreatmentPlan {
    pub dynamic_states: Vec<DynamicState>,
    pub metadata: HashMap<String, String>,
}

/// A named affine spatial transform payload, cross-referenced by metadata key
/// rather than pointer.
#[derive(Debug, Clone)]
pub struct SpatialTransform {
    pub transform: Transform,
    pub metadata: HashMap<String, String>,
}

impl SpatialTransform {
    pub fn new(transform: Transform) -> Self {
        Self { transform, metadata: HashMap::new() }
    }
}
