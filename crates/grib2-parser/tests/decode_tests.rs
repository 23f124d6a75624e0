//! Decoding synthetic single-message payloads.

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use grib2_parser::unpacking::unpack_with_grib_crate;
use grib2_parser::{FieldDecoder, Grib2Error, Grib2Message};
use test_utils::{
    assert_approx_eq, assert_coords_approx_eq, reflectivity_bands_grid, storm_cell_grid,
    Grib2Builder,
};

fn unmasked() -> FieldDecoder {
    FieldDecoder::new().with_mask_threshold(None)
}

#[test]
fn test_latlon_values_and_coordinates() {
    let values = storm_cell_grid(8, 6, (3, 2), 50.0, 3.0);
    let message = Grib2Builder::latlon_refc()
        .with_forecast_hour(3)
        .with_data(values.clone())
        .build();

    let field = unmasked().decode(Bytes::from(message)).unwrap();

    assert_eq!(field.shape().nx, 8);
    assert_eq!(field.shape().ny, 6);
    for (decoded, expected) in field.values().iter().zip(values.iter()) {
        assert_approx_eq!(*decoded, *expected, 0.01);
    }

    // First row is the northern edge, first column the western edge
    assert_coords_approx_eq!(
        (field.longitudes()[0], field.latitudes()[0]),
        (-92.0, 37.0),
        1e-6
    );
    let last = field.values().len() - 1;
    assert_coords_approx_eq!(
        (field.longitudes()[last], field.latitudes()[last]),
        (-88.5, 34.5),
        1e-6
    );

    assert_eq!(
        field.analysis_time,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    );
    assert_eq!(
        field.valid_time,
        Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
    );
}

#[test]
fn test_threshold_masking() {
    let builder = Grib2Builder::latlon_refc();
    let mut values = vec![0.0; builder.num_points()];
    values[1] = 4.9;
    values[2] = 5.0;
    values[3] = 5.5;
    values[4] = 20.0;
    values[5] = 45.0;
    let message = builder.with_data(values).build();

    let field = FieldDecoder::new().decode(Bytes::from(message)).unwrap();
    let decoded = field.values();

    assert!(decoded[0].is_nan());
    assert!(decoded[1].is_nan());
    assert!(decoded[2].is_nan(), "5 dBZ itself is masked");
    assert_approx_eq!(decoded[3], 5.5, 1e-3);
    assert_approx_eq!(decoded[4], 20.0, 1e-3);
    assert_approx_eq!(decoded[5], 45.0, 1e-3);
    assert_eq!(field.valid_count(), 3);
}

#[test]
fn test_custom_threshold() {
    let builder = Grib2Builder::latlon_refc();
    let mut values = vec![10.0; builder.num_points()];
    values[0] = 30.0;
    let message = builder.with_data(values).build();

    let field = FieldDecoder::new()
        .with_mask_threshold(Some(20.0))
        .decode(Bytes::from(message))
        .unwrap();
    assert_eq!(field.valid_count(), 1);
}

#[test]
fn test_decode_is_deterministic() {
    let message = Bytes::from(
        Grib2Builder::lambert_refc(7, 5)
            .with_data(storm_cell_grid(7, 5, (2, 2), 62.0, 2.5))
            .build(),
    );

    let decoder = FieldDecoder::new();
    let a = decoder.decode(message.clone()).unwrap();
    let b = decoder.decode(message).unwrap();

    let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(a.values()), bits(b.values()));
    assert_eq!(a.longitudes(), b.longitudes());
    assert_eq!(a.latitudes(), b.latitudes());
    assert_eq!(a.shape(), b.shape());
    assert_eq!(a.valid_time, b.valid_time);
    assert_eq!(a.analysis_time, b.analysis_time);
}

#[test]
fn test_lambert_grid_coordinates() {
    let message = Grib2Builder::lambert_refc(6, 4).with_constant_value(30.0).build();
    let field = unmasked().decode(Bytes::from(message)).unwrap();

    assert_eq!(field.values().len(), 24);
    assert_coords_approx_eq!(
        (field.longitudes()[0], field.latitudes()[0]),
        (-122.719528, 21.138123),
        1e-5
    );
    // Rows scan south to north, columns west to east
    assert!(field.latitudes()[6] > field.latitudes()[0]);
    assert!(field.longitudes()[1] > field.longitudes()[0]);
}

#[test]
fn test_bitmap_gaps_are_missing() {
    let builder = Grib2Builder::latlon_refc();
    let mut values = vec![25.0; builder.num_points()];
    values[9] = f32::NAN;
    values[10] = 40.0;
    let message = builder.with_data(values).build();

    let field = unmasked().decode(Bytes::from(message)).unwrap();
    assert!(field.values()[9].is_nan());
    assert_approx_eq!(field.values()[10], 40.0, 1e-3);
    assert_approx_eq!(field.values()[11], 25.0, 1e-3);
}

#[test]
fn test_valid_time_in_minutes() {
    let message = Grib2Builder::latlon_refc()
        .with_forecast_time(0, 90)
        .build();
    let field = unmasked().decode(Bytes::from(message)).unwrap();
    assert_eq!(
        field.valid_time,
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 30, 0).unwrap()
    );
}

#[test]
fn test_trailing_bytes_ignored() {
    let mut payload = Grib2Builder::latlon_refc().with_constant_value(12.0).build();
    payload.extend_from_slice(b"GRIB and the start of another message");

    let field = unmasked().decode(Bytes::from(payload)).unwrap();
    assert_eq!(field.values().len(), 48);
}

#[test]
fn test_truncated_payload_rejected() {
    let message = Grib2Builder::latlon_refc().build();
    let cut = Bytes::from(message[..message.len() / 2].to_vec());

    let err = FieldDecoder::new().decode(cut).unwrap_err();
    assert!(matches!(err, Grib2Error::Truncated { .. }), "got {err:?}");
}

#[test]
fn test_wrong_parameter_rejected() {
    let message = Grib2Builder::latlon_refc().with_parameter(0, 0).build();

    let err = FieldDecoder::new()
        .expecting_parameter("REFC")
        .decode(Bytes::from(message))
        .unwrap_err();
    match err {
        Grib2Error::ParameterMismatch { expected, found } => {
            assert_eq!(expected, "REFC");
            assert_eq!(found, "TMP");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_not_grib_rejected() {
    let err = FieldDecoder::new()
        .decode(Bytes::from_static(b"<html>404 Not Found</html>"))
        .unwrap_err();
    assert!(matches!(err, Grib2Error::InvalidFormat(_)));
}

/// The `grib` crate decoder, which handles the packings HRRR actually ships,
/// must agree with the native simple-packing path.
fn assert_grib_crate_matches_native(message: Vec<u8>, expected_points: usize) {
    let native = Grib2Message::parse(Bytes::from(message.clone()))
        .unwrap()
        .unpack_data()
        .unwrap();
    let delegated = unpack_with_grib_crate(&message).unwrap();

    assert_eq!(native.len(), expected_points);
    assert_eq!(delegated.len(), native.len());
    for (a, b) in delegated.iter().zip(native.iter()) {
        assert_approx_eq!(*a, *b, 1e-4);
    }
}

#[test]
fn test_grib_crate_decodes_latlon_like_native() {
    let message = Grib2Builder::latlon_refc()
        .with_data(reflectivity_bands_grid(8, 6))
        .build();
    assert_grib_crate_matches_native(message, 48);

    let constant = Grib2Builder::latlon_refc().with_constant_value(33.0).build();
    assert!(unpack_with_grib_crate(&constant)
        .unwrap()
        .iter()
        .all(|v| *v == 33.0));
}

#[test]
fn test_grib_crate_decodes_lambert_like_native() {
    let message = Grib2Builder::lambert_refc(4, 3)
        .with_data(storm_cell_grid(4, 3, (1, 1), 60.0, 2.5))
        .build();
    assert_grib_crate_matches_native(message, 12);
}

#[test]
fn test_grib_crate_rejects_non_grib_bytes() {
    assert!(matches!(
        unpack_with_grib_crate(b"not a grib message"),
        Err(Grib2Error::UnpackingError(_))
    ));
}
