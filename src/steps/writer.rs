/*!
 * Terminal step writing the events back into a document.
 */

use log::debug;
use std::any::Any;

use crate::errors::{ConfigurationError, StepError};
use crate::locale::LocaleId;
use crate::params::{ParameterSchema, Parameters};
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::resource::Event;
use crate::skeleton::{FilterWriter, SkeletonWriter};

pub const STEP_NAME: &str = "filter_events_writer";

/// Writes each item with the writer of its filter
#[derive(Debug, Default)]
pub struct FilterEventsWriterStep {
    writer: Option<Box<dyn FilterWriter>>,
    target_locale: Option<LocaleId>,
    /// Output encoding set by parameter, wins over the batch one
    output_encoding: Option<String>,
    write_source: bool,
    last_output: Vec<u8>,
}

impl FilterEventsWriterStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the last item written
    pub fn last_output(&self) -> &[u8] {
        &self.last_output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.last_output)
    }
}

impl Step for FilterEventsWriterStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Rebuild each document from its events, with the targets of the output locale"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(STEP_NAME)
            .string("output_encoding", "", "Encoding of the output (empty to keep the input one)")
            .boolean("write_source", false, "Write the source content even when targets exist")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        self.output_encoding = resolved
            .get_str("output_encoding")
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        self.write_source = resolved.get_bool("write_source").unwrap_or(false);
        Ok(())
    }

    fn set_target_locale(&mut self, locale: Option<&LocaleId>) {
        self.target_locale = locale.cloned();
    }

    fn start_batch_item(&mut self, context: &mut BatchItemContext) -> Result<(), StepError> {
        let mut writer = context
            .take_writer()
            .unwrap_or_else(|| Box::new(SkeletonWriter::new()));
        let locale = if self.write_source {
            None
        } else {
            context.target_locale.clone().or_else(|| self.target_locale.clone())
        };
        writer.set_output_locale(locale);
        writer.set_output_encoding(self.output_encoding.clone().or_else(|| context.output_encoding.clone()));
        if let Some(path) = &context.output_path {
            writer.set_output_path(path.clone());
        }
        debug!("Writer {} ready for {}", writer.name(), context.name);
        self.writer = Some(writer);
        Ok(())
    }

    fn handle(&mut self, event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StepError::failure(STEP_NAME, "no writer: start_batch_item was not called"))?;
        writer.handle_event(&event)?;
        Ok(event)
    }

    fn end_batch_item(&mut self) -> Result<(), StepError> {
        if let Some(mut writer) = self.writer.take() {
            writer.close()?;
            self.last_output = writer.take_output();
        }
        Ok(())
    }

    fn cancel(&mut self) {
        self.writer = None;
    }

    fn destroy(&mut self) {
        self.writer = None;
        self.last_output.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
