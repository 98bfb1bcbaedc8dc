/*!
 * Inline code finder.
 *
 * A list of regex rules marks spans of extracted text that are not
 * translatable: printf-style variables, escapes, markup tags. Each matching
 * span becomes an inline code. Tag-like spans keep their structure: `<b>` is
 * an opening code, `</b>` a closing code paired with the last open `<b>`,
 * `<br/>` a placeholder. Everything else becomes a placeholder.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ConfigurationError;
use crate::resource::code::types;
use crate::resource::{TagType, TextFragment};

/// Rules used when none are configured
pub const DEFAULT_RULES: &[&str] = &[
    r"%(([-0+#]?)[-0+#]?)((\d\$)?)(([\d\*]*)(\.[\d\*]*)?)[dioxXucsfeEgGpn]",
    r"(\\r\\n)|\\a|\\b|\\f|\\n|\\r|\\t|\\v",
    r"\{\d+\}",
    r"</?[A-Za-z][^<>]*>",
];

/// Shape of a markup tag
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<(/)?([A-Za-z][\w:.-]*)[^<>]*?(/)?>$").expect("Invalid tag regex")
});

/// Converts matching spans of text into inline codes
#[derive(Debug, Clone)]
pub struct CodeFinder {
    rules: Vec<String>,
    /// All rules as one alternation, `None` when there are no rules
    regex: Option<Regex>,
}

impl CodeFinder {
    /// Compile the given rules into one finder
    pub fn new<S: AsRef<str>>(rules: &[S]) -> Result<Self, ConfigurationError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let rule = rule.as_ref();
            Regex::new(rule).map_err(|e| ConfigurationError::InvalidPattern {
                pattern: rule.to_string(),
                message: e.to_string(),
            })?;
            compiled.push(format!("(?:{})", rule));
        }

        let regex = if compiled.is_empty() {
            None
        } else {
            let combined = compiled.join("|");
            let regex = Regex::new(&combined).map_err(|e| ConfigurationError::InvalidPattern {
                pattern: combined.clone(),
                message: e.to_string(),
            })?;
            Some(regex)
        };

        Ok(Self {
            rules: rules.iter().map(|r| r.as_ref().to_string()).collect(),
            regex,
        })
    }

    /// Finder with the default rules
    pub fn with_default_rules() -> Self {
        Self::new(DEFAULT_RULES).expect("Invalid default code finder rules")
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Build a fragment from text, turning every match into a code
    pub fn process(&self, text: &str) -> TextFragment {
        let Some(regex) = &self.regex else {
            return TextFragment::from_text(text);
        };
        let mut fragment = TextFragment::new();
        let mut last = 0;
        for m in regex.find_iter(text) {
            if m.is_empty() {
                continue;
            }
            fragment.append_text(&text[last..m.start()]);
            let data = m.as_str();
            let appended = match TAG_REGEX.captures(data) {
                Some(caps) => {
                    let name = caps.get(2).map(|n| n.as_str().to_lowercase()).unwrap_or_default();
                    let tag_type = match (caps.get(1).is_some(), caps.get(3).is_some()) {
                        (true, _) => TagType::Closing,
                        (false, true) => TagType::Placeholder,
                        (false, false) => TagType::Opening,
                    };
                    fragment.append_code(tag_type, &name, data)
                }
                None => fragment.append_code(TagType::Placeholder, types::NULL, data),
            };
            if let Err(e) = appended {
                // The rest of the text stays plain
                warn!("{}, keeping remaining matches as text", e);
                last = m.start();
                break;
            }
            last = m.end();
        }
        fragment.append_text(&text[last..]);
        fragment
    }
}

impl Default for CodeFinder {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
