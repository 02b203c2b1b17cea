use super::*;
use crate::curve::{CurveSet, FnCurves};

fn square(n: u32) -> (PieceGeometry, Roi) {
    (PieceGeometry::new(n, n), Roi::new(n, n))
}

fn planner() -> ScalePlanner {
    ScalePlanner::new(PlannerOpts::default()).unwrap()
}

#[test]
fn default_opts_validate_and_reject_bad_values() {
    PlannerOpts::default().validate().unwrap();
    let bad = [
        PlannerOpts {
            max_scales: 0,
            ..PlannerOpts::default()
        },
        PlannerOpts {
            max_scales: 13,
            ..PlannerOpts::default()
        },
        PlannerOpts {
            support_fraction: 0.0,
            ..PlannerOpts::default()
        },
        PlannerOpts {
            sharpen_gain: f32::NAN,
            ..PlannerOpts::default()
        },
        PlannerOpts {
            luma_threshold_gain: -1.0,
            ..PlannerOpts::default()
        },
    ];
    for opts in bad {
        assert!(ScalePlanner::new(opts).is_err(), "{opts:?}");
    }
}

#[test]
fn small_square_gets_three_scales() {
    let (geo, roi) = square(64);
    let t = planner().sample(&geo, &roi).unwrap();
    assert_eq!(t.len(), 3);
    let i0 = (5.9f32).log2();
    for (i, &ti) in t.iter().enumerate() {
        let expected = 1.0 - (i as f32 + 0.5) / i0;
        assert!((ti - expected).abs() < 1e-5, "scale {i}: {ti} vs {expected}");
    }
}

#[test]
fn large_image_hits_the_scale_cap() {
    let geo = PieceGeometry::new(4000, 3000);
    let roi = Roi::new(4000, 3000);
    assert_eq!(planner().sample(&geo, &roi).unwrap().len(), 8);

    let capped = ScalePlanner::new(PlannerOpts {
        max_scales: 5,
        ..PlannerOpts::default()
    })
    .unwrap();
    assert_eq!(capped.sample(&geo, &roi).unwrap().len(), 5);
}

#[test]
fn tiny_images_degenerate_to_zero_scales() {
    for n in [1, 4, 8, 16] {
        let (geo, roi) = square(n);
        assert!(planner().sample(&geo, &roi).unwrap().is_empty(), "n={n}");
    }
}

#[test]
fn filter_must_fit_inside_the_tile() {
    let geo = PieceGeometry::new(4000, 3000);
    let cases = [
        (31, 2),
        (32, 3),
        (33, 3),
        (40, 3),
        (63, 3),
        (64, 4),
        (65, 4),
        (128, 5),
    ];
    for (n, expected) in cases {
        let roi = Roi::new(n, n);
        assert_eq!(planner().sample(&geo, &roi).unwrap().len(), expected, "n={n}");
    }
    let wide = Roi::new(4000, 40);
    assert_eq!(planner().sample(&geo, &wide).unwrap().len(), 3);
}

#[test]
fn tile_fit_needs_twice_the_coarsest_half_support() {
    assert!(fits_tile(1, 8));
    assert!(!fits_tile(1, 7));
    assert!(fits_tile(3, 32));
    assert!(!fits_tile(4, 63));
    assert!(fits_tile(4, 64));
    assert!(!fits_tile(70, u64::MAX));
}

#[test]
fn scale_count_is_non_increasing_as_images_shrink() {
    let p = planner();
    let mut prev = usize::MAX;
    for n in (2..=1200u32).rev().step_by(7) {
        let (geo, roi) = square(n);
        let count = p.sample(&geo, &roi).unwrap().len();
        assert!(count <= prev, "n={n}: {count} > {prev}");
        prev = count;
    }
    assert_eq!(prev, 0);
}

#[test]
fn detail_index_strictly_decreases_and_stays_in_unit_range() {
    let p = planner();
    for &(w, h, s) in &[
        (64u32, 64u32, 1.0f32),
        (1000, 700, 1.0),
        (1000, 700, 0.5),
        (4000, 3000, 0.25),
        (4000, 3000, 3.0),
    ] {
        let geo = PieceGeometry::new(w, h);
        let roi = Roi::new(w, h).with_scale(s);
        let t = p.sample(&geo, &roi).unwrap();
        assert!(!t.is_empty());
        assert!(t.windows(2).all(|w| w[0] > w[1]), "{t:?}");
        assert!(t.iter().all(|&v| (0.0..=1.0).contains(&v)), "{t:?}");
    }
}

#[test]
fn zooming_out_drops_fine_scales() {
    let geo = PieceGeometry::new(1000, 1000);
    let full = planner().sample(&geo, &Roi::new(1000, 1000)).unwrap();
    let half = planner()
        .sample(&geo, &Roi::new(500, 500).with_scale(0.5))
        .unwrap();
    assert_eq!(full.len(), 7);
    assert_eq!(half.len(), 6);
    assert!(half[0] < full[0]);
}

#[test]
fn zooming_in_plans_like_one_to_one() {
    let geo = PieceGeometry::new(1000, 1000);
    let roi = Roi::new(1000, 1000);
    let a = planner().sample(&geo, &roi).unwrap();
    let b = planner().sample(&geo, &roi.with_scale(4.0)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn plan_and_sample_share_the_stopping_rule() {
    let geo = PieceGeometry::new(900, 600);
    let roi = Roi::new(450, 300).with_scale(0.5);
    let p = planner();
    let plan = p.plan(&geo, &roi, &CurveSet::neutral()).unwrap();
    assert_eq!(plan.detail_index, p.sample(&geo, &roi).unwrap());
    assert_eq!(plan.num_scales(), plan.detail_index.len());
}

#[test]
fn neutral_curves_plan_passthrough_parameters() {
    let (geo, roi) = square(512);
    let plan = planner().plan(&geo, &roi, &CurveSet::neutral()).unwrap();
    assert!(plan.num_scales() > 0);
    for s in &plan.scales {
        for c in 0..4 {
            assert!((s.boost[c] - 1.0).abs() < 1e-5);
            assert_eq!(s.threshold[c], 0.0);
        }
        assert_eq!(s.sharpen, 0.0);
    }
}

#[test]
fn curve_values_map_through_gains() {
    let curves = FnCurves(|id: CurveId, _t: f32| match id {
        CurveId::LumaBoost => 1.0,
        CurveId::ChromaBoost => 0.25,
        CurveId::Sharpness => 0.5,
        CurveId::LumaThreshold | CurveId::ChromaThreshold => 1.0,
    });
    let (geo, roi) = square(256);
    let plan = planner().plan(&geo, &roi, &curves).unwrap();
    for (s, &t) in plan.scales.iter().zip(&plan.detail_index) {
        assert_eq!(s.boost, [4.0, 0.25, 0.25, 4.0]);
        assert_eq!(s.sharpen, 0.0025 * 0.5);
        let falloff = (-7.0 * (1.0 - t)).exp2();
        assert!((s.threshold[0] - falloff * 10.0).abs() < 1e-6);
        assert!((s.threshold[1] - falloff * 20.0).abs() < 1e-6);
        assert_eq!(s.threshold[0], s.threshold[3]);
        assert_eq!(s.threshold[1], s.threshold[2]);
    }
}

#[test]
fn non_finite_curve_values_are_rejected() {
    let curves = FnCurves(|_: CurveId, _: f32| f32::NAN);
    let (geo, roi) = square(256);
    let err = planner().plan(&geo, &roi, &curves).unwrap_err();
    assert!(err.to_string().contains("non-finite"));
}

#[test]
fn max_half_support_tracks_scale_count() {
    assert_eq!(ScalePlan::default().max_half_support(), 0);
    let plan = ScalePlan::from_scales(vec![ScaleParameters::passthrough(0.0); 3]);
    assert_eq!(plan.max_half_support(), 8);
}

#[test]
fn support_grows_by_powers_of_two() {
    assert_eq!(support(0), 5);
    assert_eq!(support(1), 9);
    assert_eq!(support(7), 513);
}
