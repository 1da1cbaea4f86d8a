use crate::contour::ContourData;
use crate::error::{CoreError, Result};
use crate::image::ImageArray;
use crate::payload::{LineSample, PointCloud, SpatialTransform, SurfaceMesh, TreatmentPlan};
use std::cell::RefCell;
use std::rc::Rc;

/// A shared, interior-mutable handle to a payload. Multiple operations may
/// observe the same payload through clones of this handle; `Rc::clone` is the
/// shallow-copy the data model calls for.
pub type Handle<T> = Rc<RefCell<T>>;

/// The typed aggregate container holding zero or one contour-data list and any
/// number of each other payload kind. Cross-references among payloads are by
/// metadata string key, never by raw pointer.
#[derive(Clone, Default)]
pub struct Drover<T> {
    contour_data: Option<Handle<ContourData>>,
    image_arrays: Vec<Handle<ImageArray<T>>>,
    point_clouds: Vec<Handle<PointCloud>>,
    surface_meshes: Vec<Handle<SurfaceMesh>>,
    treatment_plans: Vec<Handle<TreatmentPlan>>,
    line_samples: Vec<Handle<LineSample>>,
    spatial_transforms: Vec<Handle<SpatialTransform>>,
}

macro_rules! payload_list_accessors {
    ($field:ident, $ty:ty, $has:ident, $push:ident, $get:ident) => {
        pub fn $has(&self) -> bool {
            !self.$field.is_empty()
        }

        pub fn $push(&mut self, payload: $ty) -> Handle<$ty> {
            let handle = Rc::new(RefCell::new(payload));
            self.$field.push(Rc::clone(&handle));
            handle
        }

        /// Fetches the payload at `index`.
        ///
        /// # Errors
        /// Returns [`CoreError::NoMatch`] if `index` is out of bounds.
        pub fn $get(&self, index: usize) -> Result<Handle<$ty>> {
            self.$field
                .get(index)
                .cloned()
                .ok_or_else(|| CoreError::NoMatch(format!("no {} at index {index}", stringify!($field))))
        }
    };
}

impl<T: Copy + Into<f64> + From<f64>> Drover<T> {
    pub fn new() -> Self {
        Self {
            contour_data: None,
            image_arrays: Vec::new(),
            point_clouds: Vec::new(),
            surface_meshes: Vec::new(),
            treatment_plans: Vec::new(),
            line_samples: Vec::new(),
            spatial_transforms: Vec::new(),
        }
    }

    pub fn has_contour_data(&self) -> bool {
        self.contour_data.is_some()
    }

    pub fn contour_data(&self) -> Option<Handle<ContourData>> {
        self.contour_data.clone()
    }

    /// Lazily creates an empty contour-data list if none exists yet, and returns
    /// a handle to it.
    pub fn ensure_contour_data_allocated(&mut self) -> Handle<ContourData> {
        self.contour_data
            .get_or_insert_with(|| Rc::new(RefCell::new(ContourData::default())))
            .clone()
    }

    /// Replaces the contour-data list outright (only one exists at a time).
    pub fn set_contour_data(&mut self, data: ContourData) -> Handle<ContourData> {
        let handle = Rc::new(RefCell::new(data));
        self.contour_data = Some(Rc::clone(&handle));
        handle
    }

    payload_list_accessors!(image_arrays, ImageArray<T>, has_image_data, push_image_array, image_array);
    payload_list_accessors!(point_clouds, PointCloud, has_point_data, push_point_cloud, point_cloud);
    payload_list_accessors!(surface_meshes, SurfaceMesh, has_mesh_data, push_surface_mesh, surface_mesh);
    payload_list_accessors!(treatment_plans, TreatmentPlan, has_tplan_data, push_treatment_plan, treatment_plan);
    payload_list_accessors!(line_samples, LineSample, has_lsamp_data, push_line_sample, line_sample);
    payload_list_accessors!(spatial_transforms, SpatialTransform, has_transform_data, push_spatial_transform, spatial_transform);

    pub fn image_arrays(&self) -> &[Handle<ImageArray<T>>] {
        &self.image_arrays
    }

    /// A shallow copy: payload storage is shared via `Rc::clone`, matching `Clone`.
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }

    /// A deep copy: every payload's storage is independently cloned so mutation
    /// on one Drover is never observed by the other.
    pub fn deep_copy(&self) -> Self {
        Self {
            contour_data: self.contour_data.as_ref().map(|h| Rc::new(RefCell::new(h.borrow().clone()))),
            image_arrays: self.image_arrays.iter().map(|h| Rc::new(RefCell::new(h.borrow().clone()))).collect(),
            point_clouds: self.point_clouds.iter().map(|h| Rc::new(RefCell::new(h.borrow().clone()))).collect(),
            surface_meshes: self.surface_meshes.iter().map(|h| Rc::new(RefCell::new(h.borrow().clone()))).collect(),
            treatment_plans: self.treatment_plans.iter().map(|h| Rc::new(RefCell::new(h.borrow().clone()))).collect(),
            line_samples: self.line_samples.iter().map(|h| Rc::new(RefCell::new(h.borrow().clone()))).collect(),
            spatial_transforms: self
                .spatial_transforms
                .iter()
                .map(|h| Rc::new(RefCell::new(h.borrow().clone())))
                .collect(),
        }
    }

    /// Moves all payload lists from `other` into `self` without copying. Contour
    /// data is consumed exactly once: if `self` already has a contour-data list,
    /// `other`'s is dropped rather than overwriting it (matching the source's
    /// special-cased single-owner contour-data slot).
    pub fn consume(&mut self, mut other: Self) {
        if self.contour_data.is_none() {
            self.contour_data = other.contour_data.take();
        }
        self.image_arrays.append(&mut other.image_arrays);
        self.point_clouds.append(&mut other.point_clouds);
        self.surface_meshes.append(&mut other.surface_meshes);
        self.treatment_plans.append(&mut other.treatment_plans);
        self.line_samples.append(&mut other.line_samples);
        self.spatial_transforms.append(&mut other.spatial_transforms);
    }

    /// Like [`Drover::consume`], but never touches contour data: appends only the
    /// other payload lists.
    pub fn concatenate(&mut self, mut other: Self) {
        self.image_arrays.append(&mut other.image_arrays);
        self.point_clouds.append(&mut other.point_clouds);
        self.surface_meshes.append(&mut other.surface_meshes);
        self.treatment_plans.append(&mut other.treatment_plans);
        self.line_samples.append(&mut other.line_samples);
        self.spatial_transforms.append(&mut other.spatial_transforms);
    }
}
