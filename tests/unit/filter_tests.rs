/*!
 * Tests for filters, the compound filter and the configuration mapper
 */

use tkit::errors::{ConfigurationError, FilterError};
use tkit::filters::{Filter, FilterConfigurationMapper, FilterGuard, IniFilter, LineFilter, ParagraphFilter, RegexFilter};
use tkit::params::Parameters;
use tkit::resource::{Event, EventType};

use crate::common;

/// Test that cancelling after the first text unit ends the document cleanly
#[test]
fn test_filter_cancelAfterFirstTextUnit_shouldYieldEndDocument() {
    let mut filter = LineFilter::new();
    filter.open(&common::document("one\ntwo\nthree\n")).unwrap();

    assert!(matches!(filter.next().unwrap(), Event::StartDocument(_)));
    assert!(matches!(filter.next().unwrap(), Event::TextUnit(_)));
    filter.cancel();

    assert!(filter.has_next().unwrap());
    let last = filter.next().unwrap();
    assert_eq!(last.event_type(), EventType::EndDocument);
    assert_eq!(last.id(), Some("doc1e"));
    assert!(!filter.has_next().unwrap());
    filter.close();
}

/// Test that reading past the end is an illegal state, not a panic
#[test]
fn test_filter_nextAfterEnd_shouldBeIllegalState() {
    let mut filter = LineFilter::new();
    filter.open(&common::document("x")).unwrap();
    while filter.has_next().unwrap() {
        filter.next().unwrap();
    }
    assert!(matches!(filter.next(), Err(FilterError::IllegalState(_))));
}

/// Test that the guard closes the filter when dropped
#[test]
fn test_filterGuard_drop_shouldCloseFilter() {
    let mut filter = LineFilter::new();
    {
        let mut guard = FilterGuard::open(&mut filter, &common::document("x")).unwrap();
        guard.next().unwrap();
    }
    assert!(matches!(filter.has_next(), Err(FilterError::IllegalState(_))));
}

/// Test that ids are sequential and groups are balanced for every filter
#[test]
fn test_filters_idsAndNesting_shouldBeConsistent() {
    let mut filters: Vec<Box<dyn Filter>> = vec![
        Box::new(LineFilter::new()),
        Box::new(ParagraphFilter::new()),
        Box::new(RegexFilter::new()),
        Box::new(IniFilter::new()),
    ];
    for filter in filters.iter_mut() {
        let events = common::extract(filter.as_mut(), common::SAMPLE_INI);
        assert_eq!(events.first().and_then(|e| e.id()), Some("doc1"));
        assert_eq!(events.last().and_then(|e| e.id()), Some("doc1e"));

        let mut depth: i32 = 0;
        for event in &events {
            match event {
                Event::StartGroup(_) => depth += 1,
                Event::EndGroup(_) => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0);
        }
        assert_eq!(depth, 0, "unbalanced groups from {}", filter.name());

        let ids: Vec<&str> = events.iter().filter_map(|e| e.as_text_unit()).map(|tu| tu.id.as_str()).collect();
        let expected: Vec<String> = (1..=ids.len()).map(|i| format!("tu{}", i)).collect();
        assert_eq!(ids, expected, "text unit ids from {}", filter.name());
    }
}

/// Test that the mapper's compound filter picks the configuration of each document
#[test]
fn test_mapper_compoundFilter_shouldFollowDocumentConfiguration() {
    let mapper = FilterConfigurationMapper::new();
    let mut compound = mapper.create_compound_filter();

    let ini = common::document(common::SAMPLE_INI).with_filter_config("okf_ini");
    let events = tkit::filters::extract_events(&mut compound, &ini).unwrap();
    assert!(events.iter().any(|e| e.event_type() == EventType::StartGroup));

    let text = common::document(common::SAMPLE_INI).with_filter_config("okf_plaintext");
    let events = tkit::filters::extract_events(&mut compound, &text).unwrap();
    assert!(!events.iter().any(|e| e.event_type() == EventType::StartGroup));
}

/// Test that filters reject parameters they do not declare
#[test]
fn test_filter_setParameters_withUnknownKey_shouldFail() {
    let mut filter = IniFilter::new();
    let result = filter.set_parameters(&Parameters::new().with("colour", "blue"));
    assert!(matches!(result, Err(ConfigurationError::UnknownParameter { .. })));
}
