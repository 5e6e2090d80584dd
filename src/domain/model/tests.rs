// Unit tests for domain models

use super::*;

#[test]
fn test_point_parse() {
    let point = Point::parse(" 12.5, 40 ").unwrap();
    assert_eq!(point, Point::new(12.5, 40.0));
    assert!(Point::parse("12").is_err());
    assert!(Point::parse("a,4").is_err());
}

#[test]
fn test_frame_rate() {
    let rate = FrameRate::new(30000, 1001).unwrap();
    assert!((rate.as_f64() - 29.97).abs() < 0.001);
    assert!((rate.frame_duration() - 1001.0 / 30000.0).abs() < 1e-12);
    assert!(FrameRate::new(0, 1).is_err());
    assert!(FrameRate::new(30, 0).is_err());
}

#[test]
fn test_source_meta_creation() {
    let rate = FrameRate::new(25, 1).unwrap();
    let meta = SourceVideoMeta::new(1920, 1080, rate, 250).unwrap();
    assert_eq!(meta.aspect_ratio(), 16.0 / 9.0);
    assert_eq!(meta.duration_secs, 10.0);
    assert!(!meta.has_audio);
    assert!(SourceVideoMeta::new(0, 1080, rate, 250).is_err());
}

#[test]
fn test_selection_mode_parse() {
    assert_eq!(SelectionMode::parse("free").unwrap(), SelectionMode::Free);
    assert_eq!(SelectionMode::parse("Square").unwrap(), SelectionMode::Square);
    assert_eq!(SelectionMode::parse("1:1").unwrap(), SelectionMode::Square);
    assert!(SelectionMode::parse("circle").is_err());
    assert_eq!(SelectionMode::default(), SelectionMode::Free);
}

#[test]
fn test_crop_rect_invariants() {
    let rect = CropRect::new(10, 20, 110, 70, 1920, 1080).unwrap();
    assert_eq!(rect.width(), 100);
    assert_eq!(rect.height(), 50);
    assert!(!rect.is_square());

    // zero area
    assert!(CropRect::new(10, 20, 10, 70, 1920, 1080).is_err());
    assert!(CropRect::new(10, 20, 110, 20, 1920, 1080).is_err());
    // past the right edge
    assert!(CropRect::new(10, 20, 1921, 70, 1920, 1080).is_err());
    // touching the edge is fine
    assert!(CropRect::new(0, 0, 1920, 1080, 1920, 1080).is_ok());
}

#[test]
fn test_crop_rect_from_corners_orders_axes() {
    let rect = CropRect::from_corners((300, 40), (100, 240), 640, 480).unwrap();
    assert_eq!((rect.x1(), rect.y1(), rect.x2(), rect.y2()), (100, 40, 300, 240));
}

#[test]
fn test_crop_rect_parse() {
    let rect = CropRect::parse("400, 300, 0, 0", 640, 480).unwrap();
    assert_eq!((rect.x1(), rect.y1(), rect.x2(), rect.y2()), (0, 0, 400, 300));
    assert!(CropRect::parse("1,2,3", 640, 480).is_err());
    assert!(CropRect::parse("1,2,3,x", 640, 480).is_err());
}

#[test]
fn test_target_size_output_dimensions() {
    let rect = CropRect::new(0, 0, 400, 300, 1920, 1080).unwrap();
    assert_eq!(TargetSize::Native.output_dimensions(&rect), (400, 300));
    assert_eq!(
        TargetSize::Exact { width: 800, height: 600 }.output_dimensions(&rect),
        (800, 600)
    );
    assert_eq!(
        TargetSize::Partial { width: Some(200), height: None }.output_dimensions(&rect),
        (200, 300)
    );
    assert!(!TargetSize::Native.requires_resize(&rect));
    assert!(!TargetSize::Exact { width: 400, height: 300 }.requires_resize(&rect));
    assert!(TargetSize::Exact { width: 401, height: 300 }.requires_resize(&rect));
}

#[test]
fn test_target_size_display() {
    assert_eq!(TargetSize::Native.to_string(), "native");
    assert_eq!(TargetSize::Exact { width: 720, height: 720 }.to_string(), "720x720");
    assert_eq!(
        TargetSize::Partial { width: None, height: Some(480) }.to_string(),
        "nativex480"
    );
}

#[test]
fn test_overwrite_policy_parse() {
    assert_eq!(OverwritePolicy::parse("never").unwrap(), OverwritePolicy::Never);
    assert_eq!(OverwritePolicy::parse(" Rename ").unwrap(), OverwritePolicy::Rename);
    assert_eq!(OverwritePolicy::default(), OverwritePolicy::Always);
    assert!(OverwritePolicy::parse("sometimes").is_err());
}
