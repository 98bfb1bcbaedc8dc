/*!
 * Tests for skeletons and the skeleton writer
 */

use tkit::errors::WriterError;
use tkit::filters::{IniFilter, LineFilter};
use tkit::resource::{Event, TextFragment};
use tkit::skeleton::{write_events, FilterWriter, SkeletonWriter};

use crate::common;

/// Test that writing without targets reproduces the input
#[test]
fn test_writer_withoutTargets_shouldReproduceInput() {
    let events = common::extract(&mut IniFilter::new(), common::SAMPLE_INI);
    let output = common::write(&events, Some(common::fr()));
    assert_eq!(String::from_utf8(output).unwrap(), common::SAMPLE_INI);
}

/// Test that targets replace the source only in their own skeleton slot
#[test]
fn test_writer_withTargets_shouldKeepSurroundingSkeleton() {
    let mut events = common::extract(&mut IniFilter::new(), "[menu]\nquit = \"Quit\"\n");
    for event in events.iter_mut() {
        if let Some(tu) = event.as_text_unit_mut() {
            tu.set_target_content(common::fr(), TextFragment::from_text("Quitter"));
        }
    }
    let output = common::write(&events, Some(common::fr()));
    assert_eq!(String::from_utf8(output).unwrap(), "[menu]\nquit = \"Quitter\"\n");

    // Source locale output ignores targets
    let output = common::write(&events, None);
    assert_eq!(String::from_utf8(output).unwrap(), "[menu]\nquit = \"Quit\"\n");
}

/// Test that a forced output encoding is used and unmappable text is an error
#[test]
fn test_writer_forcedEncoding_shouldEncodeOrFail() {
    let events = common::extract(&mut LineFilter::new(), "caf\u{e9}\n");
    let mut writer = SkeletonWriter::new();
    writer.set_output_encoding(Some("windows-1252".to_string()));
    assert_eq!(write_events(&mut writer, &events).unwrap(), b"caf\xe9\n");

    let events = common::extract(&mut LineFilter::new(), "\u{65e5}\u{672c}\n");
    let mut writer = SkeletonWriter::new();
    writer.set_output_encoding(Some("windows-1252".to_string()));
    let result = write_events(&mut writer, &events);
    assert!(matches!(result, Err(WriterError::Unmappable { .. })));
}

/// Test that a byte-order mark in the input is written back
#[test]
fn test_writer_bomInput_shouldWriteBom() {
    let mut filter = LineFilter::new();
    let doc = tkit::RawDocument::from_bytes(b"\xEF\xBB\xBFline\n".to_vec(), "UTF-8", common::en(), None);
    let events = tkit::filters::extract_events(&mut filter, &doc).unwrap();
    assert!(matches!(&events[0], Event::StartDocument(sd) if sd.has_bom));
    assert_eq!(common::write(&events, None), b"\xEF\xBB\xBFline\n");
}

/// Test that closing twice is harmless and the output can be taken once
#[test]
fn test_writer_closeTwice_shouldKeepOutput() {
    let events = common::extract(&mut LineFilter::new(), "x");
    let mut writer = SkeletonWriter::new();
    for event in &events {
        writer.handle_event(event).unwrap();
    }
    writer.close().unwrap();
    writer.close().unwrap();
    assert_eq!(writer.take_output(), b"x");
    assert!(writer.take_output().is_empty());
}
