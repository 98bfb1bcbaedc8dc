/*!
 * Tests for pipelines built from the registered steps
 */

use std::any::Any;

use tkit::errors::StepError;
use tkit::filters::{IniFilter, LineFilter};
use tkit::params::Parameters;
use tkit::pipeline::{Batch, BatchItem, CancellationToken, Pipeline, Step};
use tkit::resource::Event;
use tkit::steps::{self, EventListBuilderStep, FilterEventsWriterStep, PseudoTranslateStep, WordCountStep};

use crate::common;

fn batch_of(texts: &[(&str, &str)]) -> Batch {
    let mut batch = Batch::new(common::en(), Some(common::fr()));
    for (name, text) in texts {
        batch.add(BatchItem::from_text(name, text));
    }
    batch
}

/// Cancels the item when it sees its first text unit
#[derive(Debug, Default)]
struct CancelOnFirstUnit;

impl Step for CancelOnFirstUnit {
    fn name(&self) -> &str {
        "cancel_on_first_unit"
    }

    fn handle(&mut self, event: Event, token: &CancellationToken) -> Result<Event, StepError> {
        if event.is_text_unit() {
            token.cancel();
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

/// Test that pseudo-translated targets reach the writer through a buffering step
#[test]
fn test_pipeline_pseudoTranslateThroughEventList_shouldWriteTargets() {
    let mut pipeline = Pipeline::new()
        .with_step(steps::create_configured_step("pseudo_translate", &Parameters::new().with("mode", "xn")).unwrap())
        .with_step(Box::new(EventListBuilderStep::new()))
        .with_step(Box::new(FilterEventsWriterStep::new()));

    let report = pipeline
        .process_batch(&batch_of(&[("a.ini", "[s]\nkey = Hello 42\n")]), &mut IniFilter::new())
        .unwrap();
    assert!(report.is_success());

    let writer = pipeline.step::<FilterEventsWriterStep>().unwrap();
    assert_eq!(writer.last_output(), b"[s]\nkey = Xxxxx NN\n");
}

/// Test that word counts are kept per document across a batch
#[test]
fn test_pipeline_wordCount_shouldCountEachItem() {
    let mut pipeline = Pipeline::new()
        .with_step(Box::new(WordCountStep::new()))
        .with_step(Box::new(PseudoTranslateStep::new()));
    pipeline
        .process_batch(&batch_of(&[("a", "one two three"), ("b", "four five")]), &mut LineFilter::new())
        .unwrap();

    let counts = pipeline.step::<WordCountStep>().unwrap();
    assert_eq!(counts.batch_total(), 5);
    assert_eq!(counts.documents().len(), 2);
}

/// Test that a missing input fails its item only
#[test]
fn test_pipeline_missingFile_shouldFailOnlyThatItem() {
    let mut batch = Batch::new(common::en(), None);
    batch.add(BatchItem::from_path("/nonexistent/input.txt", "UTF-8"));
    batch.add(BatchItem::from_text("ok", "fine"));

    let mut pipeline = Pipeline::new().with_step(Box::new(FilterEventsWriterStep::new()));
    let report = pipeline.process_batch(&batch, &mut LineFilter::new()).unwrap();

    assert_eq!(report.items.len(), 2);
    assert!(!report.items[0].success);
    assert!(report.items[0].error.is_some());
    assert!(report.items[1].success);
    assert_eq!(report.succeeded(), 1);
}

/// Test that a step cancelling the token ends the item with a final EndDocument
#[test]
fn test_pipeline_tokenCancelled_shouldEndItemCleanly() {
    let mut pipeline = Pipeline::new()
        .with_step(Box::new(CancelOnFirstUnit))
        .with_step(Box::new(EventListBuilderStep::new()));
    let report = pipeline
        .process_batch(&batch_of(&[("a", "one\ntwo\nthree\n")]), &mut LineFilter::new())
        .unwrap();

    assert!(report.is_success());
    assert!(report.items[0].cancelled);
    let events = pipeline.step::<EventListBuilderStep>().unwrap().events();
    assert!(matches!(events.last(), Some(Event::EndDocument(_))));
    assert_eq!(events.iter().filter(|e| e.is_text_unit()).count(), 1);
}

/// Test that a failing external command fails its item only
#[cfg(unix)]
#[test]
fn test_pipeline_failingCommand_shouldBeReportedPerItem() {
    let step = steps::create_configured_step("external_command", &Parameters::new().with("command", "exit 1")).unwrap();
    let mut pipeline = Pipeline::new().with_step(step);
    let report = pipeline
        .process_batch(&batch_of(&[("a", "x"), ("b", "y")]), &mut LineFilter::new())
        .unwrap();
    assert_eq!(report.failed().count(), 2);
    assert!(report.summary().contains("Failed: 2"));
}
