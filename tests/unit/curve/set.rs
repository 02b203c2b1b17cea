use super::*;

#[test]
fn neutral_set_is_the_default() {
    let set = CurveSet::default();
    assert_eq!(set, CurveSet::neutral());
    for k in 0..=10 {
        let t = k as f32 / 10.0;
        assert!((set.evaluate(CurveId::LumaBoost, t) - 0.5).abs() < 1e-6);
        assert!((set.evaluate(CurveId::ChromaBoost, t) - 0.5).abs() < 1e-6);
        assert_eq!(set.evaluate(CurveId::Sharpness, t), 0.0);
        assert_eq!(set.evaluate(CurveId::LumaThreshold, t), 0.0);
        assert_eq!(set.evaluate(CurveId::ChromaThreshold, t), 0.0);
    }
}

#[test]
fn every_preset_validates() {
    for preset in CurvePreset::ALL {
        CurveSet::preset(preset).validate().unwrap();
    }
    assert_eq!(CurveSet::preset(CurvePreset::Neutral), CurveSet::neutral());
}

#[test]
fn sharpen_preset_boosts_fine_scales_more_than_coarse() {
    let set = CurveSet::preset(CurvePreset::Sharpen);
    assert!(set.evaluate(CurveId::LumaBoost, 1.0) > set.evaluate(CurveId::LumaBoost, 0.0));
}

#[test]
fn denoise_preset_thresholds_fine_scales() {
    let set = CurveSet::preset(CurvePreset::Denoise);
    assert!(set.evaluate(CurveId::LumaThreshold, 1.0) > 0.0);
    assert_eq!(set.evaluate(CurveId::LumaThreshold, 0.0), 0.0);
}

#[test]
fn json_round_trip_preserves_curves() {
    let set = CurveSet::preset(CurvePreset::Clarity);
    let json = set.to_json_string().unwrap();
    let back = CurveSet::from_json_str(&json).unwrap();
    assert_eq!(back, set);
}

#[test]
fn json_with_invalid_curve_is_rejected() {
    let mut v = serde_json::to_value(CurveSet::neutral()).unwrap();
    v["sharpness"]["points"] = serde_json::json!([{ "x": 0.5, "y": 2.0 }]);
    let err = CurveSet::from_json_str(&v.to_string()).unwrap_err();
    assert!(err.to_string().contains("validation error"));
}

#[test]
fn preset_names_are_stable() {
    let names = CurvePreset::ALL.map(CurvePreset::name);
    assert_eq!(names, ["neutral", "clarity", "sharpen", "denoise", "bloom"]);
}
