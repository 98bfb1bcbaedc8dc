/*!
 * Pipeline of steps over the events of a batch of documents.
 *
 * Lifecycle per batch:
 * 1. locales are set on every step, then `start_batch()` once
 * 2. per item: `start_batch_item()`, every event of the item through
 *    `handle()` of each step in order, then `end_batch_item()`
 * 3. `end_batch()` once
 *
 * Ordering is strict: a step finishes an event before it sees the next one,
 * and the following step only sees an event once the previous step returned
 * it. A step returning `Event::Multi` hands its events to the rest of the
 * chain one at a time, which is how a buffering step replays what it held.
 */

pub mod batch;
pub mod cancel;
pub mod driver;

pub use batch::{Batch, BatchItem, BatchItemContext, BatchItemResult, BatchReport};
pub use cancel::CancellationToken;
pub use driver::Pipeline;

use std::any::Any;
use std::fmt::Debug;

use crate::errors::{ConfigurationError, StepError};
use crate::locale::LocaleId;
use crate::params::{ParameterSchema, Parameters};
use crate::resource::Event;

/// Common trait for all pipeline steps
///
/// Only `name`, `handle` and `as_any` are required; every other call
/// defaults to doing nothing.
pub trait Step: Debug {
    /// Name of the step, as used in configuration files
    fn name(&self) -> &str;

    /// Human readable description
    fn description(&self) -> &str {
        ""
    }

    /// Parameters the step accepts
    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(self.name())
    }

    /// Set the step parameters
    ///
    /// # Arguments
    /// * `params` - Parameter values; missing keys keep their defaults
    ///
    /// # Returns
    /// * `Result<(), ConfigurationError>` - Ok, or an error for unknown keys or wrong types
    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        self.parameter_schema().validate(params)
    }

    /// Called by the pipeline before the batch starts
    fn set_source_locale(&mut self, _locale: &LocaleId) {}

    /// Called by the pipeline before the batch starts
    fn set_target_locale(&mut self, _locale: Option<&LocaleId>) {}

    fn start_batch(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    /// Prepare for an item; a step may take the filter's writer from the context
    fn start_batch_item(&mut self, _context: &mut BatchItemContext) -> Result<(), StepError> {
        Ok(())
    }

    /// Handle one event and return the event to pass downstream
    ///
    /// # Arguments
    /// * `event` - The event, owned by the step for the duration of the call
    /// * `token` - Cancellation token of the current item
    ///
    /// # Returns
    /// * `Result<Event, StepError>` - The (possibly replaced) event, or a failure of the item
    fn handle(&mut self, event: Event, token: &CancellationToken) -> Result<Event, StepError>;

    /// Whether the step needs no more events for the current item
    fn is_done(&self) -> bool {
        false
    }

    fn end_batch_item(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    fn end_batch(&mut self) -> Result<(), StepError> {
        Ok(())
    }

    /// Drop the state of the current item after a failure
    fn cancel(&mut self) {}

    /// Release everything the step holds
    fn destroy(&mut self) {}

    /// The step as `Any`, to get concrete steps back from a pipeline
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
