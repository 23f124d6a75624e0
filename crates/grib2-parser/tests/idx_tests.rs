//! Resolving inventory entries to archive byte ranges.

use bytes::Bytes;
use grib2_parser::{
    parse_index, resolve_range, ByteRange, FieldDecoder, FieldSelector, IdxError, IndexResolver,
};
use test_utils::{ArchiveBuilder, Grib2Builder};

#[test]
fn test_range_ends_at_next_entry() {
    let index = "\
1:100:d=2024050112:REFC:entire atmosphere:anl:
2:9000:d=2024050112:OTHER:surface:anl:
";
    let range = IndexResolver::new(FieldSelector::new("REFC"))
        .resolve(index)
        .unwrap();
    assert_eq!(range, ByteRange::new(100, 9000).unwrap());
}

#[test]
fn test_last_entry_reads_to_end_of_file() {
    let index = "\
1:0:d=2024050112:TMP:surface:anl:
2:4000:d=2024050112:REFC:entire atmosphere:anl:
";
    let range = IndexResolver::new(FieldSelector::composite_reflectivity())
        .resolve(index)
        .unwrap();
    assert_eq!(range, ByteRange::to_end_of_file(4000));
    assert_eq!(range.len(), None);
}

#[test]
fn test_absent_variable_not_found() {
    let index = "1:0:d=2024050112:TMP:surface:anl:\n";
    let err = IndexResolver::new(FieldSelector::composite_reflectivity())
        .resolve(index)
        .unwrap_err();
    match err {
        IdxError::NotFound { selector } => assert_eq!(selector, "REFC:entire atmosphere"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_submessages_share_offset() {
    let index = "\
1:0:d=2024050112:REFC:entire atmosphere:anl:
2.1:500:d=2024050112:UGRD:10 m above ground:anl:
2.2:500:d=2024050112:VGRD:10 m above ground:anl:
3:1200:d=2024050112:TMP:surface:anl:
";
    let entries = parse_index(index).unwrap();
    let range = resolve_range(&entries, &FieldSelector::new("UGRD")).unwrap();
    assert_eq!(range, ByteRange::new(500, 1200).unwrap());

    let range = resolve_range(&entries, &FieldSelector::new("VGRD")).unwrap();
    assert_eq!(range, ByteRange::new(500, 1200).unwrap());
}

#[test]
fn test_first_match_wins() {
    let index = "\
1:0:d=2024050112:REFC:entire atmosphere:anl:
2:300:d=2024050112:REFC:entire atmosphere:anl:
3:600:d=2024050112:TMP:surface:anl:
";
    let range = IndexResolver::new(FieldSelector::new("REFC"))
        .resolve(index)
        .unwrap();
    assert_eq!(range, ByteRange::new(0, 300).unwrap());
}

#[test]
fn test_resolved_range_decodes() {
    let refc = Grib2Builder::latlon_refc()
        .with_forecast_hour(2)
        .with_constant_value(33.0)
        .build();
    let (archive, index) = ArchiveBuilder::new("2024050112", 2)
        .push_filler("TMP", "surface", 777)
        .push("REFC", "entire atmosphere", &refc)
        .push_filler("RETOP", "cloud top", 64)
        .finish();

    let range = IndexResolver::new(FieldSelector::composite_reflectivity())
        .resolve(&index)
        .unwrap();
    assert_eq!(range, ByteRange::new(777, 777 + refc.len() as u64).unwrap());

    let start = range.start() as usize;
    let end = range.end().unwrap() as usize;
    let payload = Bytes::copy_from_slice(&archive[start..end]);

    let field = FieldDecoder::new()
        .expecting_parameter("REFC")
        .decode(payload)
        .unwrap();
    assert_eq!(field.valid_count(), 48);
}

#[test]
fn test_last_message_decodes_through_end_of_file() {
    let refc = Grib2Builder::lambert_refc(4, 3).with_constant_value(41.0).build();
    let (archive, index) = ArchiveBuilder::new("2024050112", 0)
        .push_filler("TMP", "surface", 128)
        .push("REFC", "entire atmosphere", &refc)
        .finish();

    let range = IndexResolver::new(FieldSelector::composite_reflectivity())
        .resolve(&index)
        .unwrap();
    assert_eq!(range.end(), None);

    let payload = Bytes::copy_from_slice(&archive[range.start() as usize..]);
    let field = FieldDecoder::new().decode(payload).unwrap();
    assert_eq!(field.values().len(), 12);
}
