/*!
 * Round-trip comparison harness.
 *
 * A document is extracted, written back with the filter's own writer, then
 * the output is extracted again. Both event lists must match: same number of
 * events, same kinds in the same order, same ids, same text and same inline
 * code data. Code ids can be left out of the comparison for filters that
 * renumber codes. Optionally the first output must also be byte-identical to
 * the input.
 */

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;

use crate::filters::{extract_events, Filter};
use crate::resource::{Event, RawDocument, TextFragment};
use crate::skeleton::write_events;

/// Builds a fresh filter for each extraction
pub type FilterFactory = Box<dyn Fn() -> Box<dyn Filter>>;

/// Result of the comparison of one document
#[derive(Debug, Clone, Serialize)]
pub struct RoundTripOutcome {
    pub name: String,
    /// Number of events of the first extraction
    pub events: usize,
    pub differences: Vec<String>,
    /// Whether the first output equals the input, when checked
    pub identical_bytes: Option<bool>,
}

impl RoundTripOutcome {
    pub fn is_success(&self) -> bool {
        self.differences.is_empty() && self.identical_bytes != Some(false)
    }
}

pub struct RoundTripComparison {
    factory: FilterFactory,
    ignore_code_ids: bool,
    check_bytes: bool,
}

impl std::fmt::Debug for RoundTripComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundTripComparison")
            .field("ignore_code_ids", &self.ignore_code_ids)
            .field("check_bytes", &self.check_bytes)
            .finish()
    }
}

impl RoundTripComparison {
    pub fn new(factory: FilterFactory) -> Self {
        Self {
            factory,
            ignore_code_ids: false,
            check_bytes: false,
        }
    }

    pub fn ignore_code_ids(mut self, ignore: bool) -> Self {
        self.ignore_code_ids = ignore;
        self
    }

    /// Also require the written document to be byte-identical to the input
    pub fn check_bytes(mut self, check: bool) -> Self {
        self.check_bytes = check;
        self
    }

    /// Run the comparison on one document
    ///
    /// # Arguments
    /// * `document` - The input document
    ///
    /// # Returns
    /// * `Result<RoundTripOutcome>` - The differences found, or an error if a
    ///   pass could not read or write the document at all
    pub fn compare(&self, document: &RawDocument) -> Result<RoundTripOutcome> {
        let name = document.name().unwrap_or_else(|| "<memory>".to_string());

        let mut filter = (self.factory)();
        let first = extract_events(filter.as_mut(), document)
            .with_context(|| format!("First extraction of {} failed", name))?;
        let mut writer = filter.create_skeleton_writer();
        let output = write_events(writer.as_mut(), &first).with_context(|| format!("Writing {} failed", name))?;

        let encoding = first
            .iter()
            .find_map(|e| match e {
                Event::StartDocument(sd) => Some(sd.encoding.clone()),
                _ => None,
            })
            .unwrap_or_else(|| document.encoding().to_string());
        let mut rewritten = RawDocument::from_bytes(
            output.clone(),
            &encoding,
            document.source_locale().clone(),
            document.target_locale().cloned(),
        );
        if let Some(config) = document.filter_config_id() {
            rewritten = rewritten.with_filter_config(config);
        }

        let mut filter = (self.factory)();
        let second = extract_events(filter.as_mut(), &rewritten)
            .with_context(|| format!("Second extraction of {} failed", name))?;

        let differences = self.differences(&first, &second);
        for difference in &differences {
            warn!("{}: {}", name, difference);
        }

        let identical_bytes = if self.check_bytes {
            let input = document.read_bytes()?;
            Some(input.as_ref() == output.as_slice())
        } else {
            None
        };
        if identical_bytes == Some(false) {
            warn!("{}: output differs from input ({} vs {} bytes)", name, output.len(), document.read_bytes()?.len());
        }

        debug!("{}: {} events compared", name, first.len());
        Ok(RoundTripOutcome {
            name,
            events: first.len(),
            differences,
            identical_bytes,
        })
    }

    /// Run the comparison on several documents
    pub fn compare_all(&self, documents: &[RawDocument]) -> Result<Vec<RoundTripOutcome>> {
        let outcomes = documents
            .iter()
            .map(|doc| self.compare(doc))
            .collect::<Result<Vec<_>>>()?;
        let passed = outcomes.iter().filter(|o| o.is_success()).count();
        info!("Round trip: {}/{} document(s) passed", passed, outcomes.len());
        Ok(outcomes)
    }

    fn differences(&self, first: &[Event], second: &[Event]) -> Vec<String> {
        let mut differences = Vec::new();
        if first.len() != second.len() {
            differences.push(format!("event count {} != {}", first.len(), second.len()));
        }
        for (i, (a, b)) in first.iter().zip(second).enumerate() {
            if a.event_type() != b.event_type() {
                differences.push(format!("event {}: {} != {}", i, a.event_type(), b.event_type()));
                continue;
            }
            if a.id() != b.id() {
                differences.push(format!("event {}: id {:?} != {:?}", i, a.id(), b.id()));
            }
            if let (Event::TextUnit(x), Event::TextUnit(y)) = (a, b) {
                if x.name != y.name {
                    differences.push(format!("{}: name {:?} != {:?}", x.id, x.name, y.name));
                }
                if let Some(diff) = self.compare_fragments(x.source().content(), y.source().content()) {
                    differences.push(format!("{}: {}", x.id, diff));
                }
            }
        }
        differences
    }

    fn compare_fragments(&self, a: &TextFragment, b: &TextFragment) -> Option<String> {
        if a.to_text() != b.to_text() {
            return Some(format!("text {:?} != {:?}", a.to_text(), b.to_text()));
        }
        if a.codes().len() != b.codes().len() {
            return Some(format!("code count {} != {}", a.codes().len(), b.codes().len()));
        }
        for (x, y) in a.codes().iter().zip(b.codes()) {
            if x.tag_type != y.tag_type || x.data != y.data || x.code_type != y.code_type {
                return Some(format!("code {:?} != {:?}", x.data, y.data));
            }
            if !self.ignore_code_ids && x.id != y.id {
                return Some(format!("code id {} != {}", x.id, y.id));
            }
        }
        None
    }
}
