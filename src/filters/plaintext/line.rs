/*!
 * Line-based plain text filter: every line with text is a text unit.
 */

use super::{common_schema, next_line, TextOptions, CONFIG_LINES, MIME_TYPE};
use crate::errors::{ConfigurationError, FilterError};
use crate::filters::base::FilterCore;
use crate::filters::{Filter, FilterConfiguration};
use crate::params::{ParameterSchema, Parameters};
use crate::resource::{Event, RawDocument};
use crate::skeleton::{FilterWriter, SkeletonWriter};

/// One text unit per line
#[derive(Debug)]
pub struct LineFilter {
    core: FilterCore,
    options: TextOptions,
    text: String,
    pos: usize,
}

impl Default for LineFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFilter {
    pub fn new() -> Self {
        Self {
            core: FilterCore::new(CONFIG_LINES, MIME_TYPE),
            options: TextOptions::default(),
            text: String::new(),
            pos: 0,
        }
    }

    fn read_chunk(&mut self) {
        if self.pos >= self.text.len() {
            self.core.finish_input();
            return;
        }
        let (line, brk) = next_line(&self.text[self.pos..]);
        self.options.emit(&mut self.core.builder, line, None);
        self.core.builder.add_skeleton(brk);
        self.pos += line.len() + brk.len();
    }
}

impl Filter for LineFilter {
    fn name(&self) -> &str {
        CONFIG_LINES
    }

    fn mime_type(&self) -> &str {
        MIME_TYPE
    }

    fn configurations(&self) -> Vec<FilterConfiguration> {
        super::configurations()
            .into_iter()
            .filter(|(c, _)| c.id == CONFIG_LINES)
            .map(|(c, _)| c)
            .collect()
    }

    fn parameter_schema(&self) -> ParameterSchema {
        common_schema(CONFIG_LINES)
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        self.options = TextOptions::from_parameters(&resolved)?;
        Ok(())
    }

    fn open(&mut self, document: &RawDocument) -> Result<(), FilterError> {
        let decoded = self.core.open(document)?;
        self.text = decoded.text;
        self.pos = 0;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, FilterError> {
        self.core.has_next()
    }

    fn next(&mut self) -> Result<Event, FilterError> {
        while self.core.needs_input()? {
            self.read_chunk();
        }
        self.core.next_event()
    }

    fn cancel(&mut self) {
        self.core.cancel();
    }

    fn close(&mut self) {
        self.core.close();
        self.text.clear();
        self.pos = 0;
    }

    fn create_skeleton_writer(&self) -> Box<dyn FilterWriter> {
        Box::new(SkeletonWriter::new())
    }
}
