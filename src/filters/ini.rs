/*!
 * INI filter (`okf_ini`).
 *
 * - `[section]` lines open a group of type `section`, closed by the next
 *   section or the end of the document
 * - `key=value` (or `key: value`) lines produce a text unit named by the key;
 *   the key, separator, surrounding whitespace and quotes stay in the skeleton
 * - comments (`;` or `#`), blank lines and anything else stay in the skeleton
 */

use log::trace;

use super::base::FilterCore;
use super::code_finder::{CodeFinder, DEFAULT_RULES};
use super::plaintext::next_line;
use super::{Filter, FilterConfiguration};
use crate::errors::{ConfigurationError, FilterError};
use crate::params::{ParameterSchema, Parameters};
use crate::resource::{Event, RawDocument, TextFragment};
use crate::skeleton::{FilterWriter, SkeletonWriter};

pub const CONFIG_INI: &str = "okf_ini";
pub const MIME_TYPE: &str = "text/x-ini";

/// Group type of the sections
pub const SECTION_TYPE: &str = "section";

/// One line of an INI file, split into skeleton and extractable parts
#[derive(Debug, PartialEq)]
enum IniLine<'a> {
    /// Comment, blank or unrecognized line
    Literal,
    Section(&'a str),
    /// Entry: (text before the value, key, value, text after the value)
    Entry(&'a str, &'a str, &'a str, &'a str),
}

fn parse_line(line: &str) -> IniLine<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
        return IniLine::Literal;
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
        return IniLine::Section(trimmed[1..trimmed.len() - 1].trim());
    }

    let Some(sep) = line.find(['=', ':']) else {
        return IniLine::Literal;
    };
    let key = line[..sep].trim();
    if key.is_empty() {
        return IniLine::Literal;
    }

    let raw = &line[sep + 1..];
    let start = sep + 1 + (raw.len() - raw.trim_start().len());
    let mut end = sep + 1 + raw.trim_end().len();
    let mut start = start.min(end);
    let value = &line[start..end];
    if value.len() >= 2 {
        let quoted = ['"', '\''].iter().any(|q| value.starts_with(*q) && value.ends_with(*q));
        if quoted {
            start += 1;
            end -= 1;
        }
    }
    IniLine::Entry(&line[..start], key, &line[start..end], &line[end..])
}

/// Filter for INI files
#[derive(Debug)]
pub struct IniFilter {
    core: FilterCore,
    code_finder: Option<CodeFinder>,
    text: String,
    pos: usize,
}

impl Default for IniFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl IniFilter {
    pub fn new() -> Self {
        Self {
            core: FilterCore::new(CONFIG_INI, MIME_TYPE),
            code_finder: None,
            text: String::new(),
            pos: 0,
        }
    }

    fn fragment(&self, text: &str) -> TextFragment {
        match &self.code_finder {
            Some(finder) => finder.process(text),
            None => TextFragment::from_text(text),
        }
    }

    fn read_chunk(&mut self) -> Result<(), FilterError> {
        if self.pos >= self.text.len() {
            self.core.finish_input();
            return Ok(());
        }
        let text = std::mem::take(&mut self.text);
        let (line, brk) = next_line(&text[self.pos..]);
        self.pos += line.len() + brk.len();

        let result = self.handle_line(line);
        self.core.builder.add_skeleton(brk);
        self.text = text;
        result
    }

    fn handle_line(&mut self, line: &str) -> Result<(), FilterError> {
        match parse_line(line) {
            IniLine::Literal => self.core.builder.add_skeleton(line),
            IniLine::Section(name) => {
                if self.core.builder.depth() > 0 {
                    self.core.builder.end_group("")?;
                }
                trace!("INI section [{}]", name);
                self.core.builder.start_group(Some(name), Some(SECTION_TYPE), line);
            }
            IniLine::Entry(before, key, value, after) => {
                let fragment = self.fragment(value);
                if fragment.has_text() {
                    self.core.builder.add_skeleton(before);
                    self.core.builder.add_text_unit(fragment, Some(key));
                    self.core.builder.add_skeleton(after);
                } else {
                    self.core.builder.add_skeleton(line);
                }
            }
        }
        Ok(())
    }
}

impl Filter for IniFilter {
    fn name(&self) -> &str {
        CONFIG_INI
    }

    fn mime_type(&self) -> &str {
        MIME_TYPE
    }

    fn configurations(&self) -> Vec<FilterConfiguration> {
        vec![FilterConfiguration::new(
            CONFIG_INI,
            "INI",
            "INI files: sections as groups, values as text units",
            MIME_TYPE,
            &[".ini"],
        )]
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(CONFIG_INI)
            .boolean("use_code_finder", false, "Turn spans matching the code finder rules into inline codes")
            .string_list("code_finder_rules", DEFAULT_RULES, "Regex rules of the code finder")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        self.code_finder = if resolved.get_bool("use_code_finder").unwrap_or(false) {
            let rules = resolved.get_string_list("code_finder_rules").unwrap_or_default();
            Some(CodeFinder::new(&rules)?)
        } else {
            None
        };
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::extract_events;
    use crate::locale::LocaleId;
    use crate::resource::EventType;

    const SAMPLE: &str = "; settings\n[main]\ntitle = \"Hello world\"\nempty=\n\n[other]\ncount: 3 apples\n";

    fn events(text: &str) -> Vec<Event> {
        let doc = RawDocument::from_text(text, LocaleId::new("en").unwrap(), None);
        extract_events(&mut IniFilter::new(), &doc).unwrap()
    }

    #[test]
    fn test_parseLine_shouldSplitEntries() {
        assert_eq!(parse_line("  # comment"), IniLine::Literal);
        assert_eq!(parse_line("[ main ]"), IniLine::Section("main"));
        assert_eq!(parse_line("a = 'x y' "), IniLine::Entry("a = '", "a", "x y", "' "));
        assert_eq!(parse_line("a="), IniLine::Entry("a=", "a", "", ""));
        assert_eq!(parse_line("no separator"), IniLine::Literal);
    }

    #[test]
    fn test_iniFilter_shouldNestEntriesInSections() {
        let events = events(SAMPLE);
        let kinds: Vec<EventType> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            kinds,
            vec![
                EventType::StartDocument,
                EventType::StartGroup,
                EventType::TextUnit,
                EventType::EndGroup,
                EventType::StartGroup,
                EventType::TextUnit,
                EventType::EndGroup,
                EventType::EndDocument
            ]
        );
        let title = events[2].as_text_unit().unwrap();
        assert_eq!(title.name.as_deref(), Some("title"));
        assert_eq!(title.source().content().to_text(), "Hello world");
        assert_eq!(events[1].skeleton().unwrap().to_string(), "; settings\n[main]");
        assert_eq!(title.skeleton.as_ref().unwrap().to_string(), "\ntitle = \"[#$tu1]");
        assert_eq!(events[3].id(), Some("g1e"));
        assert_eq!(events[3].skeleton().unwrap().to_string(), "\"\nempty=\n\n");
    }

    #[test]
    fn test_iniFilter_skeletons_shouldConcatenateToOriginal() {
        let events = events(SAMPLE);
        let rebuilt: String = events
            .iter()
            .filter_map(|e| e.skeleton())
            .map(|s| s.to_string())
            .collect::<String>()
            .replace("[#$tu1]", "Hello world")
            .replace("[#$tu2]", "3 apples");
        assert_eq!(rebuilt, SAMPLE);
    }

    #[test]
    fn test_iniFilter_withCodeFinder_shouldCreateCodes() {
        let mut filter = IniFilter::new();
        filter
            .set_parameters(&Parameters::new().with("use_code_finder", true))
            .unwrap();
        let doc = RawDocument::from_text("msg=Hello %s", LocaleId::new("en").unwrap(), None);
        let events = extract_events(&mut filter, &doc).unwrap();
        let tu = events[1].as_text_unit().unwrap();
        assert_eq!(tu.source().content().codes().len(), 1);
        assert_eq!(tu.source().content().to_original(), "Hello %s");
    }
}
