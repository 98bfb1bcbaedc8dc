/*!
 * Buffering step: collects the events of a document and replays them.
 *
 * Nothing goes downstream while the document is read. When the EndDocument
 * arrives, the whole list is handed on as one `Event::Multi`, in its original
 * order. A copy of the last list is kept for inspection.
 */

use log::debug;
use std::any::Any;

use crate::errors::{ConfigurationError, StepError};
use crate::params::{ParameterSchema, Parameters};
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::resource::Event;

pub const STEP_NAME: &str = "event_list_builder";

#[derive(Debug, Default)]
pub struct EventListBuilderStep {
    buffer: Vec<Event>,
    last: Vec<Event>,
    /// 0 for no limit
    max_events: usize,
}

impl EventListBuilderStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of the last complete document
    pub fn events(&self) -> &[Event] {
        &self.last
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.last)
    }
}

impl Step for EventListBuilderStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Collect the events of each document and send them on at its end"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(STEP_NAME).integer("max_events", 0, "Largest number of events buffered (0 for no limit)")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        let max = resolved.get_i64("max_events").unwrap_or(0);
        self.max_events = usize::try_from(max).map_err(|_| ConfigurationError::InvalidParameter {
            owner: STEP_NAME.to_string(),
            key: "max_events".to_string(),
            expected: "a positive number or 0".to_string(),
        })?;
        Ok(())
    }

    fn start_batch_item(&mut self, _context: &mut BatchItemContext) -> Result<(), StepError> {
        self.buffer.clear();
        Ok(())
    }

    fn handle(&mut self, event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        if self.max_events > 0 && self.buffer.len() >= self.max_events {
            return Err(StepError::failure(
                STEP_NAME,
                format!("more than {} events to buffer", self.max_events),
            ));
        }
        let is_end = matches!(event, Event::EndDocument(_));
        self.buffer.push(event);
        if !is_end {
            return Ok(Event::NoOp);
        }

        let events = std::mem::take(&mut self.buffer);
        debug!("Replaying {} buffered events", events.len());
        self.last = events.clone();
        Ok(Event::Multi(events))
    }

    fn cancel(&mut self) {
        self.buffer.clear();
    }

    fn destroy(&mut self) {
        self.buffer.clear();
        self.last.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::LineFilter;
    use crate::locale::LocaleId;
    use crate::pipeline::{Batch, BatchItem, Pipeline};
    use crate::steps::FilterEventsWriterStep;

    fn batch(text: &str) -> Batch {
        let mut batch = Batch::new(LocaleId::new("en").unwrap(), None);
        batch.add(BatchItem::from_text("doc", text));
        batch
    }

    #[test]
    fn test_eventList_shouldReplayInOrderToNextSteps() {
        let text = "a\nb\n\nc\n";
        let mut pipeline = Pipeline::new()
            .with_step(Box::new(EventListBuilderStep::new()))
            .with_step(Box::new(FilterEventsWriterStep::new()));
        let report = pipeline.process_batch(&batch(text), &mut LineFilter::new()).unwrap();
        assert!(report.is_success());

        let ids: Vec<&str> = pipeline
            .step::<EventListBuilderStep>()
            .unwrap()
            .events()
            .iter()
            .filter_map(|e| e.id())
            .collect();
        assert_eq!(ids, vec!["doc1", "tu1", "tu2", "tu3", "doc1e"]);
        let writer = pipeline.step::<FilterEventsWriterStep>().unwrap();
        assert_eq!(writer.last_output(), text.as_bytes());
    }

    #[test]
    fn test_eventList_overLimit_shouldFailItem() {
        let mut step = EventListBuilderStep::new();
        step.set_parameters(&Parameters::new().with("max_events", 2)).unwrap();
        let mut pipeline = Pipeline::new().with_step(Box::new(step));
        let report = pipeline.process_batch(&batch("a\nb\nc"), &mut LineFilter::new()).unwrap();
        assert!(!report.items[0].success);
    }
}
