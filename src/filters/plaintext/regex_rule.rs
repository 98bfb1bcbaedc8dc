/*!
 * Regex-based plain text filter.
 *
 * A rule is matched repeatedly over the whole text. For each match, one
 * capture group gives the text unit content and an optional other group gives
 * its name; everything outside the content group stays in the skeleton.
 */

use log::warn;
use regex::Regex;

use super::{common_schema, TextOptions, CONFIG_REGEX, MIME_TYPE};
use crate::errors::{ConfigurationError, FilterError};
use crate::filters::base::FilterCore;
use crate::filters::{Filter, FilterConfiguration};
use crate::params::{ParameterSchema, Parameters};
use crate::resource::{Event, RawDocument};
use crate::skeleton::{FilterWriter, SkeletonWriter};

/// Default rule: every non-empty line
pub const DEFAULT_RULE: &str = r"(?m)^(.+?)\r?$";

/// One text unit per capture of a regex rule
#[derive(Debug)]
pub struct RegexFilter {
    core: FilterCore,
    options: TextOptions,
    rule: Regex,
    source_group: usize,
    name_group: usize,
    text: String,
    pos: usize,
}

impl Default for RegexFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexFilter {
    pub fn new() -> Self {
        Self {
            core: FilterCore::new(CONFIG_REGEX, MIME_TYPE),
            options: TextOptions::default(),
            rule: Regex::new(DEFAULT_RULE).expect("Invalid default rule"),
            source_group: 1,
            name_group: 0,
            text: String::new(),
            pos: 0,
        }
    }

    fn read_chunk(&mut self) {
        let captures = if self.pos <= self.text.len() {
            self.rule.captures_at(&self.text, self.pos)
        } else {
            None
        };
        let Some(caps) = captures else {
            self.core.builder.add_skeleton(&self.text[self.pos.min(self.text.len())..]);
            self.pos = self.text.len();
            self.core.finish_input();
            return;
        };

        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((self.pos, self.pos));
        let name = match self.name_group {
            0 => None,
            group => caps.get(group).map(|m| m.as_str().to_string()),
        };

        match caps.get(self.source_group) {
            Some(content) => {
                self.core.builder.add_skeleton(&self.text[self.pos..content.start()]);
                self.options
                    .emit(&mut self.core.builder, content.as_str(), name.as_deref());
                self.core.builder.add_skeleton(&self.text[content.end()..whole.1]);
            }
            None => {
                self.core.builder.add_skeleton(&self.text[self.pos..whole.1]);
            }
        }

        // An empty match must still move forward
        if whole.1 == whole.0 {
            match self.text[whole.1..].chars().next() {
                Some(ch) => {
                    self.core.builder.add_skeleton(&self.text[whole.1..whole.1 + ch.len_utf8()]);
                    self.pos = whole.1 + ch.len_utf8();
                }
                None => self.pos = self.text.len() + 1,
            }
        } else {
            self.pos = whole.1;
        }
    }
}

impl Filter for RegexFilter {
    fn name(&self) -> &str {
        CONFIG_REGEX
    }

    fn mime_type(&self) -> &str {
        MIME_TYPE
    }

    fn configurations(&self) -> Vec<FilterConfiguration> {
        super::configurations()
            .into_iter()
            .filter(|(c, _)| c.id == CONFIG_REGEX)
            .map(|(c, _)| c)
            .collect()
    }

    fn parameter_schema(&self) -> ParameterSchema {
        common_schema(CONFIG_REGEX)
            .string("rule", DEFAULT_RULE, "Regex matched over the whole text")
            .integer("source_group", 1, "Capture group holding the text to extract")
            .integer("name_group", 0, "Capture group holding the text unit name (0 for none)")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let schema = self.parameter_schema();
        let resolved = schema.resolve(params)?;
        let pattern = resolved.get_str("rule").unwrap_or(DEFAULT_RULE);
        let rule = Regex::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let group = |key: &str| -> Result<usize, ConfigurationError> {
            let value = resolved.get_i64(key).unwrap_or(0);
            match usize::try_from(value) {
                Ok(group) if group < rule.captures_len() => Ok(group),
                _ => Err(ConfigurationError::InvalidParameter {
                    owner: schema.owner.clone(),
                    key: key.to_string(),
                    expected: format!("a capture group of the rule (0 to {})", rule.captures_len() - 1),
                }),
            }
        };
        let source_group = group("source_group")?;
        let name_group = group("name_group")?;
        if source_group == 0 {
            warn!("Regex filter extracts whole matches (source_group is 0)");
        }

        self.options = TextOptions::from_parameters(&resolved)?;
        self.rule = rule;
        self.source_group = source_group;
        self.name_group = name_group;
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
