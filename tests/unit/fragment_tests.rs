/*!
 * Tests for text fragments and inline codes
 */

use tkit::resource::{TagType, TextFragment, TextUnit};

fn bold_fragment() -> TextFragment {
    let mut fragment = TextFragment::from_text("Click ");
    fragment.append_code(TagType::Opening, "bold", "<b>").unwrap();
    fragment.append_text("here");
    fragment.append_code(TagType::Closing, "bold", "</b>").unwrap();
    fragment.append_text(" now");
    fragment.append_code(TagType::Placeholder, "lb", "<br/>").unwrap();
    fragment
}

/// Test that the three renderings agree on text and codes
#[test]
fn test_fragment_renderings_shouldAgree() {
    let fragment = bold_fragment();
    assert_eq!(fragment.to_text(), "Click here now");
    assert_eq!(fragment.to_original(), "Click <b>here</b> now<br/>");
    assert_eq!(fragment.to_generic(), "Click <0>here</0> now<1/>");
    assert!(fragment.is_balanced());
}

/// Test that codes can be moved through generic notation
#[test]
fn test_fragment_updateFromGeneric_shouldMoveCodesWithoutLosingData() {
    let mut fragment = bold_fragment();
    fragment.update_from_generic("<1/>Cliquez <0>ici</0> maintenant").unwrap();
    assert_eq!(fragment.to_original(), "<br/>Cliquez <b>ici</b> maintenant");
}

/// Test that generic notation cannot duplicate a code
#[test]
fn test_fragment_updateFromGeneric_withDuplicate_shouldFail() {
    let mut fragment = bold_fragment();
    assert!(fragment.update_from_generic("<1/><1/>").is_err());
    // Content is left unchanged on error
    assert_eq!(fragment.to_generic(), "Click <0>here</0> now<1/>");
}

/// Test that unbalanced codes become isolated codes
#[test]
fn test_fragment_balanceMarkers_shouldIsolateOrphans() {
    let mut fragment = TextFragment::from_text("a");
    fragment.append_code(TagType::Closing, "italic", "</i>").unwrap();
    fragment.append_code(TagType::Opening, "bold", "<b>").unwrap();
    assert!(!fragment.is_balanced());

    assert_eq!(fragment.balance_markers(), 2);
    assert!(fragment.is_balanced());
    assert_eq!(fragment.to_generic(), "a<e0/><b1/>");
}

/// Test that a target copied from the source keeps code ids
#[test]
fn test_textUnit_createTarget_shouldCopyCodes() {
    let mut tu = TextUnit::new("tu1", bold_fragment());
    let fr = tkit::LocaleId::new("fr").unwrap();
    let target = tu.create_target(&fr, true);
    assert_eq!(target.content().codes(), bold_fragment().codes());
}
