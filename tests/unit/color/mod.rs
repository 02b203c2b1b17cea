use super::*;

fn close(a: [f32; 3], b: [f32; 3], tol: f32) -> bool {
    a.iter().zip(&b).all(|(x, y)| (x - y).abs() <= tol)
}

#[test]
fn grays_have_no_chroma() {
    for v in [0.0f32, 0.18, 0.5, 1.0] {
        let [y, cb, cr] = rgb_to_ycc([v, v, v]);
        assert!((y - v * LUMA_RANGE).abs() < 1e-4);
        assert!(cb.abs() < 1e-4 && cr.abs() < 1e-4, "{cb} {cr}");
    }
}

#[test]
fn chroma_spans_half_the_luma_range() {
    let [_, cb, _] = rgb_to_ycc([0.0, 0.0, 1.0]);
    let [_, _, cr] = rgb_to_ycc([1.0, 0.0, 0.0]);
    assert!((cb - 50.0).abs() < 1e-3);
    assert!((cr - 50.0).abs() < 1e-3);
}

#[test]
fn ycc_inverts() {
    for rgb in [[0.2, 0.4, 0.6], [1.0, 0.0, 0.5], [0.05, 0.9, 0.3]] {
        let back = ycc_to_rgb(rgb_to_ycc(rgb));
        assert!(close(back, rgb, 1e-5), "{rgb:?} -> {back:?}");
    }
}

#[test]
fn srgb_transfer_hits_endpoints_and_inverts() {
    assert_eq!(srgb_to_linear(0.0), 0.0);
    assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
    for v in [0.01f32, 0.04, 0.2, 0.5, 0.8] {
        assert!((linear_to_srgb(srgb_to_linear(v)) - v).abs() < 1e-5, "{v}");
    }
}

#[test]
fn eight_bit_buffers_survive_conversion() {
    let src = image::RgbaImage::from_fn(16, 16, |x, y| {
        let v = (y * 16 + x) as u8;
        image::Rgba([v, v.wrapping_mul(7), 255 - v, v / 2 + 64])
    });
    let img = Image::from_rgba8(&src).unwrap();
    assert_eq!((img.width(), img.height()), (16, 16));
    assert!(img.pixels().iter().all(|p| (0.0..=LUMA_RANGE + 1e-3).contains(&p[0])));
    assert_eq!(img.to_rgba8().unwrap(), src);
}

#[test]
fn out_of_gamut_values_are_clamped() {
    let img = Image::filled(2, 1, [150.0, 80.0, -80.0, 2.0]).unwrap();
    let out = img.to_rgba8().unwrap();
    assert_eq!(out.get_pixel(0, 0).0[3], 255);
}
