use super::*;
use crate::curve::{Curve, CurvePreset};
use crate::plan::scales::ScaleParameters;

fn equalizer() -> Equalizer {
    Equalizer::new(
        EngineOpts {
            threads: Some(2),
            ..EngineOpts::default()
        },
        CurveSet::neutral(),
    )
    .unwrap()
}

fn gradient(width: u32, height: u32) -> Image {
    let pixels = (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                [
                    (x * 3 + y) as f32 % 100.0,
                    x as f32 * 0.5 - 10.0,
                    y as f32 * 0.25,
                    1.0,
                ]
            })
        })
        .collect();
    Image::from_pixels(width, height, pixels).unwrap()
}

#[test]
fn new_rejects_zero_threads() {
    let opts = EngineOpts {
        threads: Some(0),
        ..EngineOpts::default()
    };
    assert!(Equalizer::new(opts, CurveSet::neutral()).is_err());
}

#[test]
fn input_must_match_roi_in() {
    let eq = equalizer();
    let img = gradient(32, 32);
    let geo = PieceGeometry::new(32, 32);
    let err = eq
        .process(&img, &geo, &Roi::new(32, 31), &Roi::new(32, 31))
        .unwrap_err();
    assert!(err.to_string().contains("roi_in"), "{err}");
}

#[test]
fn roi_out_must_match_roi_in() {
    let eq = equalizer();
    let img = gradient(32, 32);
    let geo = PieceGeometry::new(32, 32);
    let err = eq
        .process(&img, &geo, &Roi::new(32, 32), &Roi::new(16, 32))
        .unwrap_err();
    assert!(matches!(err, AtrousError::Validation(_)));
}

#[test]
fn degenerate_tile_is_copied_bit_for_bit() {
    let eq = Equalizer::new(EngineOpts::default(), CurveSet::preset(CurvePreset::Clarity)).unwrap();
    let img = gradient(12, 12);
    let geo = PieceGeometry::new(12, 12);
    let roi = Roi::new(12, 12);
    let (out, stats) = eq.process_with_stats(&img, &geo, &roi, &roi).unwrap();
    assert_eq!(stats.num_scales, 0);
    assert_eq!(stats.backend, Backend::Cpu);
    assert_eq!(out, img);
}

#[test]
fn tiling_requirements_follow_the_plan() {
    let eq = equalizer();
    let geo = PieceGeometry::new(2000, 1500);
    let roi = Roi::new(600, 400);
    let plan = eq.plan(&geo, &roi).unwrap();
    let tiling = eq.tiling_requirements(&geo, &roi).unwrap();
    assert_eq!(tiling, TilingAdvisor::advise(plan.num_scales()));
    assert_eq!(tiling.overlap, 2 << plan.num_scales());
}

#[test]
fn passthrough_plan_reconstructs_the_input() {
    let eq = equalizer();
    let img = gradient(40, 30);
    let plan = ScalePlan::from_scales(vec![ScaleParameters::passthrough(0.0025); 3]);
    let out = eq.process_with_plan(&img, &plan).unwrap();
    for (a, b) in out.pixels().iter().zip(img.pixels()) {
        for c in 0..4 {
            assert!((a[c] - b[c]).abs() < 1e-3, "{a:?} vs {b:?}");
        }
    }
}

#[test]
fn invalid_plans_are_rejected() {
    let eq = equalizer();
    let img = gradient(8, 8);
    let mut bad = ScaleParameters::passthrough(0.0);
    bad.threshold[0] = -1.0;
    let err = eq
        .process_with_plan(&img, &ScalePlan::from_scales(vec![bad]))
        .unwrap_err();
    assert!(matches!(err, AtrousError::Validation(_)));
}

#[test]
fn set_curves_changes_the_next_plan() {
    let mut eq = equalizer();
    let geo = PieceGeometry::new(256, 256);
    let roi = Roi::new(256, 256);
    let before = eq.plan(&geo, &roi).unwrap().scales[0].boost[0];
    assert!((before - 1.0).abs() < 1e-5);

    let mut curves = CurveSet::neutral();
    curves.luma_boost = Curve::flat(1.0, 6);
    eq.set_curves(curves);
    let after = eq.plan(&geo, &roi).unwrap().scales[0].boost[0];
    assert!((after - 4.0).abs() < 1e-4, "{after}");
}
