//! Extent validation and deserialization tests.

use radar_common::{BoundingBox, ExtentError, GeoPoint};

#[test]
fn test_validate_rejects_inverted_extent() {
    let err = BoundingBox::new(-80.0, 30.0, -92.0, 37.0).validate().unwrap_err();
    assert!(matches!(err, ExtentError::Degenerate(_)));
    assert!(BoundingBox::new(-92.0, 30.0, -92.0, 37.0).validate().is_err());
    assert!(BoundingBox::new(-92.0, f64::NAN, -80.0, 37.0).validate().is_err());
}

#[test]
fn test_contains_point_edges_inclusive() {
    let bbox = BoundingBox::new(-92.0, 30.0, -80.0, 37.0);
    assert!(bbox.contains_point(-86.5861, 34.7304));
    assert!(bbox.contains_point(-92.0, 30.0));
    assert!(bbox.contains_point(-80.0, 37.0));
    assert!(!bbox.contains_point(-79.9, 34.0));
}

#[test]
fn test_deserialize_from_yaml() {
    let yaml = r#"
min_x: -92.0
min_y: 30.0
max_x: -80.0
max_y: 37.0
"#;
    let bbox: BoundingBox = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(bbox, BoundingBox::new(-92.0, 30.0, -80.0, 37.0));

    let point: GeoPoint = serde_yaml::from_str("lon: -86.5861\nlat: 34.7304\n").unwrap();
    assert_eq!(point, GeoPoint::new(-86.5861, 34.7304));
}
