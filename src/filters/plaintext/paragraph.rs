/*!
 * Paragraph-based plain text filter.
 *
 * Blocks of consecutive non-blank lines form one text unit. The line breaks
 * inside a block become `lb` placeholder codes holding the original break,
 * so translators can move or drop them and the writer restores them.
 */

use super::{common_schema, next_line, TextOptions, CONFIG_PARAGRAPHS, MIME_TYPE};
use crate::errors::{ConfigurationError, FilterError, FragmentError};
use crate::filters::base::FilterCore;
use crate::filters::{Filter, FilterConfiguration};
use crate::params::{ParameterSchema, Parameters};
use crate::resource::code::types;
use crate::resource::{Event, Piece, RawDocument, TagType, TextFragment};
use crate::skeleton::{FilterWriter, SkeletonWriter};

/// One text unit per paragraph
#[derive(Debug)]
pub struct ParagraphFilter {
    core: FilterCore,
    options: TextOptions,
    text: String,
    pos: usize,
}

impl Default for ParagraphFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ParagraphFilter {
    pub fn new() -> Self {
        Self {
            core: FilterCore::new(CONFIG_PARAGRAPHS, MIME_TYPE),
            options: TextOptions::default(),
            text: String::new(),
            pos: 0,
        }
    }

    fn read_chunk(&mut self) -> Result<(), FilterError> {
        // Blank lines go to the skeleton
        loop {
            if self.pos >= self.text.len() {
                self.core.finish_input();
                return Ok(());
            }
            let (line, brk) = next_line(&self.text[self.pos..]);
            if !line.trim().is_empty() {
                break;
            }
            self.core.builder.add_skeleton(line);
            self.core.builder.add_skeleton(brk);
            self.pos += line.len() + brk.len();
        }

        // Collect the lines of the paragraph, the last break excluded
        let start = self.pos;
        let mut end = self.pos;
        let mut last_break = "";
        while end < self.text.len() {
            let (line, brk) = next_line(&self.text[end..]);
            if line.trim().is_empty() {
                break;
            }
            end += line.len() + brk.len();
            last_break = brk;
        }
        let paragraph_end = end - last_break.len();
        let paragraph = &self.text[start..paragraph_end];

        let (lead, body, trail) = self.options.split(paragraph);
        let fragment = self.paragraph_fragment(body)?;
        if fragment.has_text() {
            self.core.builder.add_skeleton(lead);
            self.core.builder.add_text_unit(fragment, None);
            self.core.builder.add_skeleton(trail);
        } else {
            self.core.builder.add_skeleton(paragraph);
        }
        self.core.builder.add_skeleton(last_break);
        self.pos = end;
        Ok(())
    }

    /// Codes are found over the whole paragraph, so a pair may span lines.
    /// Ids are then assigned in reading order, line breaks included.
    fn paragraph_fragment(&self, body: &str) -> Result<TextFragment, FragmentError> {
        let found = self.options.fragment(body);
        let mut fragment = TextFragment::new();
        for piece in found.pieces() {
            match piece {
                Piece::Text(text) => {
                    let mut rest = text;
                    loop {
                        let (line, brk) = next_line(rest);
                        fragment.append_text(line);
                        if brk.is_empty() {
                            break;
                        }
                        fragment.append_code(TagType::Placeholder, types::LB, brk)?;
                        rest = &rest[line.len() + brk.len()..];
                    }
                }
                Piece::Code(code) => {
                    fragment.append_code(code.tag_type, &code.code_type, &code.data)?;
                }
            }
        }
        Ok(fragment)
    }
}

impl Filter for ParagraphFilter {
    fn name(&self) -> &str {
        CONFIG_PARAGRAPHS
    }

    fn mime_type(&self) -> &str {
        MIME_TYPE
    }

    fn configurations(&self) -> Vec<FilterConfiguration> {
        super::configurations()
            .into_iter()
            .filter(|(c, _)| c.id == CONFIG_PARAGRAPHS)
            .map(|(c, _)| c)
            .collect()
    }

    fn parameter_schema(&self) -> ParameterSchema {
        common_schema(CONFIG_PARAGRAPHS)
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
            self.read_chunk()?;
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
