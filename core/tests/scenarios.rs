//! End-to-end scenarios exercising several modules together, as opposed to the
//! per-module unit tests living alongside each source file.

use dicomaton_core::contour::{Contour, ContourCollection};
use dicomaton_core::drover::Drover;
use dicomaton_core::error::CoreError;
use dicomaton_core::image::{ImageArray, PlanarImage};
use dicomaton_core::operation::{FilenameLex, InvocationMetadata, Operation, OperationArgPkg};
use dicomaton_core::overlap::{self, ContourOverlap};
use dicomaton_core::pipeline::{self, Step};
use dicomaton_core::{cleaver, dvh, sampler};
use dicomaton_world::Vec3;

fn whole_plane_square(half: f64) -> ContourCollection {
    ContourCollection::new(vec![Contour::new(
        vec![
            Vec3::new(-half, -half, 0.0),
            Vec3::new(half, -half, 0.0),
            Vec3::new(half, half, 0.0),
            Vec3::new(-half, half, 0.0),
        ],
        true,
    )])
}

/// A 4x4x3 stack with values equal to the flattened voxel index
/// `k*16 + r*4 + c`; a spherical sampler with `r_max` equal to the pitch picks
/// up exactly the centre voxel and its six face-adjacent neighbours.
#[test]
fn mean_neighbourhood_sampler_matches_face_adjacent_average() {
    let mut images = Vec::new();
    for k in 0..3 {
        let values: Vec<f64> = (0..16).map(|i| (k * 16 + i) as f64).collect();
        images.push(
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
                Vec3::new(0.0, 0.0, k as f64),
                values,
            )
            .unwrap(),
        );
    }
    let mut stack = ImageArray::new(images);
    let collection = whole_plane_square(10.0);

    sampler::sample_and_reduce(
        &mut stack,
        &[&collection],
        &sampler::Neighbourhood::Spherical { r_max: 1.0 },
        0,
        sampler::reduce::mean,
    )
    .unwrap();

    let centre = stack.images()[1].value(1, 1, 0).unwrap();
    assert_eq!(centre, 21.0);
}

/// A unit square at z=0 bisected along +x at f=0.5 lands on the square's
/// centroid (x = 0.5) within the requested tolerance.
#[test]
fn bisection_of_unit_square_lands_on_centroid() {
    let collection = ContourCollection::new(vec![Contour::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ],
        true,
    )]);
    let result =
        cleaver::total_area_bisection_along_plane(&collection, Vec3::new(1.0, 0.0, 0.0), 0.5, 1e-6, 50)
            .unwrap();
    assert!((result.plane.point.x - 0.5).abs() < 1e-6);
    assert!((result.achieved_fraction - 0.5).abs() < 1e-6);
}

/// Two identical image arrays gamma-compared at 1mm/1% pass every voxel.
#[test]
fn gamma_comparison_of_identical_arrays_passes_every_voxel() {
    let make = || {
        let values: Vec<f64> = (0..9).map(|i| i as f64 * 10.0).collect();
        ImageArray::new(vec![PlanarImage::new(
            3,
            3,
            1,
            1.0,
            1.0,
            1.0,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            values,
        )
        .unwrap()])
    };
    let reference = make();
    let candidate = make();
    let passed = sampler::reduce::gamma_pass_count(&reference, &candidate, 1.0, 1.0, 0).unwrap();
    assert_eq!(passed, 9);
}

/// Two oppositely-oriented concentric squares: the annulus is interior under
/// both orientation-aware rules, the inner hole only under `Ignore`.
#[test]
fn concentric_oppositely_oriented_squares_define_an_annulus() {
    let outer = Contour::new(
        vec![
            Vec3::new(-2.0, -2.0, 0.0),
            Vec3::new(2.0, -2.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
            Vec3::new(-2.0, 2.0, 0.0),
        ],
        true,
    );
    let mut inner = Contour::new(
        vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ],
        true,
    );
    inner.points_mut().reverse();
    let collection = ContourCollection::new(vec![outer, inner]);

    let annulus_pt = Vec3::new(1.5, 0.0, 0.0);
    let hole_pt = Vec3::ZERO;

    for mode in [ContourOverlap::HonourOppositeOrientations, ContourOverlap::ImplicitOrientations] {
        assert!(overlap::collection_interior(annulus_pt, &collection, mode));
        assert!(!overlap::collection_interior(hole_pt, &collection, mode));
    }
    assert!(overlap::collection_interior(annulus_pt, &collection, ContourOverlap::Ignore));
    assert!(overlap::collection_interior(hole_pt, &collection, ContourOverlap::Ignore));
}

fn load_virtual_image(rotate_90: bool) -> Operation<f64> {
    Operation {
        name: "LoadVirtualImage".to_string(),
        aliases: vec![],
        args: vec![],
        tags: vec![],
        children: vec![],
        invoke: if rotate_90 {
            |drover, _args, _meta, _lex| {
                let values: Vec<f64> = (0..9).map(|i| i as f64).collect();
                let img = PlanarImage::new(
                    3,
                    3,
                    1,
                    1.0,
                    1.0,
                    1.0,
                    Vec3::new(0.0, 1.0, 0.0),
                    Vec3::new(-1.0, 0.0, 0.0),
                    Vec3::ZERO,
                    Vec3::ZERO,
                    values,
                )
                .unwrap();
                drover.push_image_array(ImageArray::new(vec![img]));
                Ok(())
            }
        } else {
            |drover, _args, _meta, _lex| {
                let values: Vec<f64> = (0..9).map(|i| i as f64).collect();
                let img = PlanarImage::new(
                    3,
                    3,
                    1,
                    1.0,
                    1.0,
                    1.0,
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                    Vec3::ZERO,
                    Vec3::ZERO,
                    values,
                )
                .unwrap();
                drover.push_image_array(ImageArray::new(vec![img]));
                Ok(())
            }
        },
    }
}

fn reduce_neighbourhood_mean() -> Operation<f64> {
    Operation {
        name: "ReduceNeighbourhoodMean".to_string(),
        aliases: vec![],
        args: vec![],
        tags: vec![],
        children: vec![],
        invoke: |drover, _args, _meta, _lex| {
            let handle = drover.image_array(0)?;
            let mut array = handle.borrow_mut();
            let collection = whole_plane_square(10.0);
            sampler::sample_and_reduce(
                &mut array,
                &[&collection],
                &sampler::Neighbourhood::Spherical { r_max: 1.0 },
                0,
                sampler::reduce::mean,
            )
        },
    }
}

fn export_to_memory() -> Operation<f64> {
    Operation {
        name: "ExportToMemory".to_string(),
        aliases: vec![],
        args: vec![],
        tags: vec![],
        children: vec![],
        invoke: |drover, _args, meta, _lex| {
            let handle = drover.image_array(0)?;
            let sum: f64 = handle.borrow().images()[0].as_slice().iter().sum();
            meta.write("total_sum", sum.to_string());
            Ok(())
        },
    }
}

fn run_three_step_pipeline(rotate_90: bool) -> f64 {
    let catalogue = vec![load_virtual_image(rotate_90), reduce_neighbourhood_mean(), export_to_memory()];
    let steps = vec![
        Step::Invoke { name: "LoadVirtualImage".into(), args: OperationArgPkg::default() },
        Step::Invoke { name: "ReduceNeighbourhoodMean".into(), args: OperationArgPkg::default() },
        Step::Invoke { name: "ExportToMemory".into(), args: OperationArgPkg::default() },
    ];
    let mut drover: Drover<f64> = Drover::new();
    let mut metadata = InvocationMetadata::default();
    let lex = FilenameLex::default();
    pipeline::run(&mut drover, &catalogue, &steps, &mut metadata, &lex).unwrap();
    metadata.get("total_sum").unwrap().parse().unwrap()
}

/// A three-step pipeline's output is finite and its total sum is invariant
/// under a 90-degree rotation of the row/column axes applied before the
/// reduction step.
#[test]
fn three_step_pipeline_is_rotation_invariant() {
    let sum_upright = run_three_step_pipeline(false);
    let sum_rotated = run_three_step_pipeline(true);
    assert!(sum_upright.is_finite());
    assert!(sum_rotated.is_finite());
    assert!((sum_upright - sum_rotated).abs() < 1e-9);
}

/// `--operation A --start-children --operation B` with no closing
/// `--stop-children` must fail with `invalid-scope` before any operation that
/// would follow the missing bracket runs.
#[test]
fn unclosed_start_children_fails_scope_balance_before_running_anything() {
    let op_a = Operation {
        name: "A".to_string(),
        aliases: vec![],
        args: vec![],
        tags: vec![],
        children: vec![],
        invoke: |_d, _a, meta, _l| {
            meta.write("ran", "A");
            Ok(())
        },
    };
    let op_b = Operation {
        name: "B".to_string(),
        aliases: vec![],
        args: vec![],
        tags: vec![],
        children: vec![],
        invoke: |_d, _a, meta, _l| {
            meta.write("ran", "B");
            Ok(())
        },
    };
    let catalogue = vec![op_a, op_b];
    let steps = vec![
        Step::Invoke { name: "A".into(), args: OperationArgPkg::default() },
        Step::StartChildren,
        Step::Invoke { name: "B".into(), args: OperationArgPkg::default() },
    ];
    let mut drover: Drover<f64> = Drover::new();
    let mut metadata = InvocationMetadata::default();
    let lex = FilenameLex::default();
    let result = pipeline::run(&mut drover, &catalogue, &steps, &mut metadata, &lex);
    assert!(matches!(result, Err(CoreError::InvalidScope(_))));
    assert_eq!(metadata.get("ran"), None, "no operation should have been dispatched");
}

/// Tabular-DVH round-trip: dose values in cGy in the input equal reported
/// values in Gy divided by 100, to within double-precision tolerance.
#[test]
fn tabular_dvh_round_trip_converts_cgy_to_gy() {
    let text = concat!(
        "Patient Name : Test^Patient\n",
        "Type : Cumulative Dose Volume Histogram\n",
        "\n",
        "Plan : Plan1\n",
        "Total dose [cGy] : 7000\n",
        "\n",
        "Structure : PTV\n",
        "Volume [cm³] : 1.0\n",
        "\n",
        "Dose [cGy] Relative dose [%] Structure Volume [cm³]\n",
        "0 0 1.0\n",
        "2100 30 0.8\n",
        "4900 70 0.3\n",
        "7000 100 0.0\n",
        "\n",
    );
    let samples = dvh::parse(text.as_bytes()).unwrap();
    assert_eq!(samples.len(), 1);

    let input_cgy = [0.0, 2100.0, 4900.0, 7000.0];
    for ((reported_gy, _), cgy) in samples[0].samples.iter().zip(input_cgy) {
        assert!((reported_gy - cgy / 100.0).abs() < 1e-9);
    }
}
