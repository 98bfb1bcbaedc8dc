/*!
 * Plain text filters.
 *
 * Three ways to cut plain text into text units, selected by configuration id:
 * - `okf_plaintext`: one text unit per line
 * - `okf_plaintext_paragraphs`: one text unit per block of non-blank lines,
 *   inner line breaks kept as `lb` placeholder codes
 * - `okf_plaintext_regex`: one text unit per capture of a regex rule
 *
 * `compound_filter()` builds the compound filter over the three.
 */

pub mod line;
pub mod paragraph;
pub mod regex_rule;

pub use line::LineFilter;
pub use paragraph::ParagraphFilter;
pub use regex_rule::RegexFilter;

use super::base::EventBuilder;
use super::code_finder::{CodeFinder, DEFAULT_RULES};
use super::compound::{CompoundFilter, FilterConstructor};
use super::{Filter, FilterConfiguration};
use crate::errors::ConfigurationError;
use crate::params::{ParameterSchema, Parameters};
use crate::resource::TextFragment;

pub const MIME_TYPE: &str = "text/plain";

pub const CONFIG_LINES: &str = "okf_plaintext";
pub const CONFIG_PARAGRAPHS: &str = "okf_plaintext_paragraphs";
pub const CONFIG_REGEX: &str = "okf_plaintext_regex";

/// Parameters shared by the plain text filters
pub(crate) fn common_schema(owner: &str) -> ParameterSchema {
    ParameterSchema::new(owner)
        .boolean("trim_leading", false, "Keep leading whitespace out of the text units")
        .boolean("trim_trailing", false, "Keep trailing whitespace out of the text units")
        .boolean("use_code_finder", false, "Turn spans matching the code finder rules into inline codes")
        .string_list("code_finder_rules", DEFAULT_RULES, "Regex rules of the code finder")
}

/// Resolved options shared by the plain text filters
#[derive(Debug, Clone, Default)]
pub(crate) struct TextOptions {
    pub trim_leading: bool,
    pub trim_trailing: bool,
    pub code_finder: Option<CodeFinder>,
}

impl TextOptions {
    /// Read the shared options from resolved parameters
    pub fn from_parameters(params: &Parameters) -> Result<Self, ConfigurationError> {
        let code_finder = if params.get_bool("use_code_finder").unwrap_or(false) {
            let rules = params.get_string_list("code_finder_rules").unwrap_or_default();
            Some(CodeFinder::new(&rules)?)
        } else {
            None
        };
        Ok(Self {
            trim_leading: params.get_bool("trim_leading").unwrap_or(false),
            trim_trailing: params.get_bool("trim_trailing").unwrap_or(false),
            code_finder,
        })
    }

    /// Split text into (leading whitespace, body, trailing whitespace) per the trim options
    pub fn split<'a>(&self, text: &'a str) -> (&'a str, &'a str, &'a str) {
        let start = if self.trim_leading {
            text.len() - text.trim_start().len()
        } else {
            0
        };
        let end = if self.trim_trailing {
            start + text[start..].trim_end().len()
        } else {
            text.len()
        };
        (&text[..start], &text[start..end], &text[end..])
    }

    /// Build the content of a text unit
    pub fn fragment(&self, text: &str) -> TextFragment {
        match &self.code_finder {
            Some(finder) => finder.process(text),
            None => TextFragment::from_text(text),
        }
    }

    /// Queue `text` as a text unit, or as skeleton when it has nothing to translate
    pub fn emit(&self, builder: &mut EventBuilder, text: &str, name: Option<&str>) {
        let (lead, body, trail) = self.split(text);
        let fragment = self.fragment(body);
        if !fragment.has_text() {
            builder.add_skeleton(text);
            return;
        }
        builder.add_skeleton(lead);
        builder.add_text_unit(fragment, name);
        builder.add_skeleton(trail);
    }
}

/// Split off the next line: (content, line break), the break empty at end of text
pub(crate) fn next_line(text: &str) -> (&str, &str) {
    match text.find(['\r', '\n']) {
        Some(pos) => {
            let brk = if text[pos..].starts_with("\r\n") { 2 } else { 1 };
            (&text[..pos], &text[pos..pos + brk])
        }
        None => (text, ""),
    }
}

fn new_lines() -> Box<dyn Filter> {
    Box::new(LineFilter::new())
}

fn new_paragraphs() -> Box<dyn Filter> {
    Box::new(ParagraphFilter::new())
}

fn new_regex() -> Box<dyn Filter> {
    Box::new(RegexFilter::new())
}

/// The predefined plain text configurations and their constructors
pub fn configurations() -> Vec<(FilterConfiguration, FilterConstructor)> {
    vec![
        (
            FilterConfiguration::new(
                CONFIG_LINES,
                "Plain Text (lines)",
                "One text unit per line",
                MIME_TYPE,
                &[".txt"],
            ),
            new_lines as FilterConstructor,
        ),
        (
            FilterConfiguration::new(
                CONFIG_PARAGRAPHS,
                "Plain Text (paragraphs)",
                "One text unit per block of non-blank lines",
                MIME_TYPE,
                &[],
            ),
            new_paragraphs as FilterConstructor,
        ),
        (
            FilterConfiguration::new(
                CONFIG_REGEX,
                "Plain Text (regex)",
                "One text unit per capture of a regex rule",
                MIME_TYPE,
                &[],
            ),
            new_regex as FilterConstructor,
        ),
    ]
}

/// Compound filter over the plain text configurations, lines active
pub fn compound_filter() -> CompoundFilter {
    CompoundFilter::new("okf_plaintext_compound", MIME_TYPE, configurations())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textOptions_split_shouldFollowTrimFlags() {
        let options = TextOptions {
            trim_leading: true,
            ..Default::default()
        };
        assert_eq!(options.split("  a b  "), ("  ", "a b  ", ""));

        let options = TextOptions {
            trim_leading: true,
            trim_trailing: true,
            code_finder: None,
        };
        assert_eq!(options.split("  a b  "), ("  ", "a b", "  "));
        assert_eq!(options.split("   "), ("   ", "", ""));
    }

    #[test]
    fn test_nextLine_shouldReturnBreakStyle() {
        assert_eq!(next_line("a\r\nb"), ("a", "\r\n"));
        assert_eq!(next_line("a\rb"), ("a", "\r"));
        assert_eq!(next_line("last"), ("last", ""));
    }
}
