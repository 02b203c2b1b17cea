use super::*;

#[test]
fn advise_follows_scale_count() {
    let d0 = TilingAdvisor::advise(0);
    assert_eq!(d0.buffer_multiplier, 3.0);
    assert_eq!(d0.overlap, 2);
    assert_eq!((d0.align_x, d0.align_y), (1, 1));

    let d5 = TilingAdvisor::advise(5);
    assert_eq!(d5.buffer_multiplier, 8.0);
    assert_eq!(d5.overlap, 64);

    let d8 = TilingAdvisor::advise(8);
    assert_eq!(d8.overlap, 512);
    assert_eq!(d8.buffer_multiplier, 11.0);
}

#[test]
fn advise_saturates_for_huge_scale_counts() {
    assert_eq!(TilingAdvisor::advise(30).overlap, 1 << 31);
    assert_eq!(TilingAdvisor::advise(31).overlap, u32::MAX);
    let d = TilingAdvisor::advise(usize::MAX);
    assert_eq!(d.overlap, u32::MAX);
    assert!(d.buffer_multiplier.is_finite());
}

#[test]
fn bytes_scale_with_multiplier() {
    let d = TilingAdvisor::advise(2);
    assert_eq!(d.bytes_for(10, 10).unwrap(), 5 * 100 * 16);
}

#[test]
fn padded_roi_is_clamped_to_the_image() {
    let d = TilingAdvisor::advise(3);
    let geo = PieceGeometry::new(100, 80);

    let inner = d.padded_roi(&Roi::new(20, 20).with_offset(40, 30), &geo);
    assert_eq!((inner.x, inner.y, inner.width, inner.height), (24, 14, 52, 52));

    let corner = d.padded_roi(&Roi::new(20, 20), &geo);
    assert_eq!((corner.x, corner.y, corner.width, corner.height), (0, 0, 36, 36));

    let edge = d.padded_roi(&Roi::new(20, 20).with_offset(80, 60), &geo);
    assert_eq!((edge.x, edge.y, edge.width, edge.height), (64, 44, 36, 36));
}

#[test]
fn padded_roi_respects_processing_scale() {
    let d = TilingAdvisor::advise(1);
    let geo = PieceGeometry::new(100, 100);
    let roi = Roi::new(40, 40).with_offset(10, 10).with_scale(0.5);
    let p = d.padded_roi(&roi, &geo);
    assert_eq!((p.x, p.y, p.width, p.height), (6, 6, 44, 44));
    assert_eq!(p.scale, 0.5);
}
