/*!
 * Tests for the characters check step inside a pipeline
 */

use std::any::Any;

use tkit::errors::StepError;
use tkit::filters::LineFilter;
use tkit::params::Parameters;
use tkit::pipeline::{Batch, BatchItem, CancellationToken, Pipeline, Step};
use tkit::quality::IssueType;
use tkit::resource::{Annotation, Event, TextFragment};
use tkit::steps::{self, CharactersCheckStep};

use crate::common;

/// Gives every text unit a fixed target, optionally restricted by a pattern
#[derive(Debug)]
struct FixedTarget {
    target: String,
    allowed: Option<String>,
}

impl Step for FixedTarget {
    fn name(&self) -> &str {
        "fixed_target"
    }

    fn handle(&mut self, mut event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        if let Some(tu) = event.as_text_unit_mut() {
            tu.set_target_content(common::fr(), TextFragment::from_text(&self.target));
            if let (Some(pattern), Some(target)) = (&self.allowed, tu.target_mut(&common::fr())) {
                target
                    .annotations_mut()
                    .set(Annotation::AllowedCharacters(pattern.clone()));
            }
        }
        Ok(event)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn run_check(source: &str, step: FixedTarget, check: Box<dyn Step>) -> Pipeline {
    let mut batch = Batch::new(common::en(), Some(common::fr()));
    batch.add(BatchItem::from_text("doc", source));
    let mut pipeline = Pipeline::new().with_step(Box::new(step)).with_step(check);
    let report = pipeline.process_batch(&batch, &mut LineFilter::new()).unwrap();
    assert!(report.is_success());
    pipeline
}

/// Test that a target outside the allowed characters gets exactly one issue
#[test]
fn test_charactersCheck_disallowedTarget_shouldReportOneIssue() {
    let fixed = FixedTarget {
        target: "\u{e9}t\u{e9} et printemps".to_string(),
        allowed: Some("[a-z ]".to_string()),
    };
    let pipeline = run_check("Summer and spring", fixed, Box::new(CharactersCheckStep::new()));

    let report = pipeline.step::<CharactersCheckStep>().unwrap().report();
    assert_eq!(report.issue_count(), 1);
    assert_eq!(report.count_of(IssueType::AllowedCharacters), 1);
    assert_eq!(report.documents[0].document, "doc");
}

/// Test that ordinary punctuation and digits raise nothing
#[test]
fn test_charactersCheck_cleanTarget_shouldReportNothing() {
    let fixed = FixedTarget {
        target: "  Texte {avec} (123). ".to_string(),
        allowed: None,
    };
    let pipeline = run_check("  Text {with} (123). ", fixed, Box::new(CharactersCheckStep::new()));
    assert_eq!(pipeline.step::<CharactersCheckStep>().unwrap().report().issue_count(), 0);
}

/// Test that the charset check follows the step parameters
#[test]
fn test_charactersCheck_charsetParameter_shouldFlagUnencodableTarget() {
    let params = Parameters::new()
        .with("check_characters", true)
        .with("charset", "windows-1252");
    let check = steps::create_configured_step("characters_check", &params).unwrap();
    let fixed = FixedTarget {
        target: "\u{65e5}\u{672c}".to_string(),
        allowed: None,
    };
    let pipeline = run_check("Japan", fixed, check);
    let report = pipeline.step::<CharactersCheckStep>().unwrap().report();
    assert_eq!(report.count_of(IssueType::AllowedCharacters), 1);
}

/// Test that an invalid extra characters pattern is refused at configuration
#[test]
fn test_charactersCheck_invalidPattern_shouldFailConfiguration() {
    let params = Parameters::new()
        .with("check_characters", true)
        .with("extra_chars_allowed", "[unclosed");
    assert!(steps::create_configured_step("characters_check", &params).is_err());
}
