/*!
 * Source word counts per text unit, per document and per batch.
 */

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;

use crate::errors::StepError;
use crate::params::ParameterSchema;
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::resource::{Annotation, Event, TextFragment};

pub const STEP_NAME: &str = "word_count";

/// A word: letters or digits, possibly joined by apostrophes or hyphens
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['\x{2019}\-][\p{L}\p{N}]+)*").expect("Invalid word regex")
});

/// Number of words in the text of a fragment, codes excluded
pub fn count_words(fragment: &TextFragment) -> usize {
    WORD_REGEX.find_iter(&fragment.to_text()).count()
}

#[derive(Debug, Default)]
pub struct WordCountStep {
    current: Option<(String, usize)>,
    documents: Vec<(String, usize)>,
    batch_total: usize,
}

impl WordCountStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Word count of each document of the batch, in order
    pub fn documents(&self) -> &[(String, usize)] {
        &self.documents
    }

    pub fn batch_total(&self) -> usize {
        self.batch_total
    }
}

impl Step for WordCountStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Count the source words of every translatable text unit"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(STEP_NAME)
    }

    fn start_batch(&mut self) -> Result<(), StepError> {
        self.documents.clear();
        self.batch_total = 0;
        Ok(())
    }

    fn start_batch_item(&mut self, context: &mut BatchItemContext) -> Result<(), StepError> {
        self.current = Some((context.name.clone(), 0));
        Ok(())
    }

    fn handle(&mut self, mut event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        match &mut event {
            Event::TextUnit(tu) if tu.translatable => {
                let count = count_words(tu.source().content());
                tu.annotations.set(Annotation::WordCount(count));
                if let Some((_, total)) = self.current.as_mut() {
                    *total += count;
                }
            }
            Event::EndDocument(ending) => {
                if let Some((_, total)) = &self.current {
                    ending.annotations.set(Annotation::WordCount(*total));
                }
            }
            _ => {}
        }
        Ok(event)
    }

    fn end_batch_item(&mut self) -> Result<(), StepError> {
        if let Some((name, total)) = self.current.take() {
            self.batch_total += total;
            self.documents.push((name, total));
        }
        Ok(())
    }

    fn end_batch(&mut self) -> Result<(), StepError> {
        info!(
            "Word count: {} word(s) in {} document(s)",
            self.batch_total,
            self.documents.len()
        );
        Ok(())
    }

    fn cancel(&mut self) {
        self.current = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
