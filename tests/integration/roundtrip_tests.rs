/*!
 * Extract, write and extract again, for documents on disk
 */

use tkit::filters::{Filter, FilterConfigurationMapper, IniFilter, LineFilter, ParagraphFilter};
use tkit::params::Parameters;
use tkit::resource::RawDocument;
use tkit::roundtrip::RoundTripComparison;

use crate::common;

fn ini_with_codes() -> Box<dyn Filter> {
    let mut filter = IniFilter::new();
    filter
        .set_parameters(&Parameters::new().with("use_code_finder", true))
        .unwrap();
    Box::new(filter)
}

/// Test that the sample documents survive a round trip byte for byte
#[test]
fn test_roundtrip_samples_shouldBeIdentical() {
    let lines = RoundTripComparison::new(Box::new(|| Box::new(LineFilter::new()))).check_bytes(true);
    let outcome = lines.compare(&common::document(common::SAMPLE_TEXT)).unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.differences);

    let paragraphs = RoundTripComparison::new(Box::new(|| Box::new(ParagraphFilter::new()))).check_bytes(true);
    assert!(paragraphs.compare(&common::document(common::SAMPLE_TEXT)).unwrap().is_success());

    let ini = RoundTripComparison::new(Box::new(ini_with_codes)).check_bytes(true);
    let outcome = ini.compare(&common::document(common::SAMPLE_INI)).unwrap();
    assert!(outcome.is_success(), "{:?}", outcome.differences);
}

/// Test that single-byte and UTF-16 files keep their encoding
#[test]
fn test_roundtrip_encodedFiles_shouldKeepBytes() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();

    let latin = dir.path().join("latin.txt");
    std::fs::write(&latin, b"caf\xe9\r\nna\xefve\r\n").unwrap();

    let mut utf16 = vec![0xFF, 0xFE];
    for unit in "[s]\nk = \u{65e5}\u{672c}\n".encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }
    let wide = dir.path().join("wide.ini");
    std::fs::write(&wide, &utf16).unwrap();

    let documents = vec![
        RawDocument::from_path(&latin, "windows-1252", common::en(), None).with_filter_config("okf_plaintext"),
        // Declared encoding is overridden by the byte-order mark
        RawDocument::from_path(&wide, "UTF-8", common::en(), None).with_filter_config("okf_ini"),
    ];

    let comparison = RoundTripComparison::new(Box::new(|| {
        Box::new(FilterConfigurationMapper::new().create_compound_filter())
    }))
    .check_bytes(true);
    let outcomes = comparison.compare_all(&documents).unwrap();

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(outcome.is_success(), "{}: {:?}", outcome.name, outcome.differences);
        assert!(outcome.events > 2);
    }
    assert!(outcomes[0].name.ends_with("latin.txt"));
}

/// Test that an unreadable document is an error, not a failed comparison
#[test]
fn test_roundtrip_missingFile_shouldFail() {
    let comparison = RoundTripComparison::new(Box::new(|| Box::new(LineFilter::new())));
    let document = RawDocument::from_path("/nonexistent/file.txt", "UTF-8", common::en(), None);
    let error = comparison.compare(&document).unwrap_err();
    assert!(format!("{:#}", error).contains("First extraction"));
}
