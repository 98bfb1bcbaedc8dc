/*!
 * Batches, batch items and their results.
 */

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::locale::LocaleId;
use crate::resource::{RawDocument, RawInput};
use crate::skeleton::FilterWriter;

/// One input document of a batch
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Input bytes or file path; relative paths are resolved against the input root
    pub input: RawInput,
    /// Display name, defaults to the input path
    pub name: Option<String>,
    /// Declared encoding of the input
    pub encoding: String,
    /// Overrides the batch source locale
    pub source_locale: Option<LocaleId>,
    /// Overrides the batch target locale
    pub target_locale: Option<LocaleId>,
    /// Filter configuration to use for this item
    pub filter_config_id: Option<String>,
    /// Output path; relative paths are resolved against the output root
    pub output: Option<PathBuf>,
}

impl BatchItem {
    /// Item reading a file
    pub fn from_path<P: AsRef<Path>>(path: P, encoding: &str) -> Self {
        Self {
            input: RawInput::File(path.as_ref().to_path_buf()),
            name: None,
            encoding: encoding.to_string(),
            source_locale: None,
            target_locale: None,
            filter_config_id: None,
            output: None,
        }
    }

    /// Item holding UTF-8 text in memory
    pub fn from_text(name: &str, text: &str) -> Self {
        Self {
            input: RawInput::Bytes(text.as_bytes().to_vec()),
            name: Some(name.to_string()),
            encoding: "UTF-8".to_string(),
            source_locale: None,
            target_locale: None,
            filter_config_id: None,
            output: None,
        }
    }

    pub fn with_output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_locales(mut self, source: LocaleId, target: Option<LocaleId>) -> Self {
        self.source_locale = Some(source);
        self.target_locale = target;
        self
    }

    pub fn with_filter_config(mut self, config_id: &str) -> Self {
        self.filter_config_id = Some(config_id.to_string());
        self
    }

    /// Name used in logs and reports
    pub fn display_name(&self) -> String {
        match (&self.name, &self.input) {
            (Some(name), _) => name.clone(),
            (None, RawInput::File(path)) => path.display().to_string(),
            (None, RawInput::Bytes(_)) => "<memory>".to_string(),
        }
    }
}

fn resolve(root: Option<&Path>, path: &Path) -> PathBuf {
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// Items processed together, with shared locales and roots
#[derive(Debug, Clone)]
pub struct Batch {
    pub source_locale: LocaleId,
    pub target_locale: Option<LocaleId>,
    pub input_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    /// Forced output encoding, `None` to reuse the input encoding
    pub output_encoding: Option<String>,
    pub items: Vec<BatchItem>,
}

impl Batch {
    pub fn new(source_locale: LocaleId, target_locale: Option<LocaleId>) -> Self {
        Self {
            source_locale,
            target_locale,
            input_root: None,
            output_root: None,
            output_encoding: None,
            items: Vec::new(),
        }
    }

    pub fn with_roots(mut self, input_root: Option<PathBuf>, output_root: Option<PathBuf>) -> Self {
        self.input_root = input_root;
        self.output_root = output_root;
        self
    }

    pub fn add(&mut self, item: BatchItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Raw document of an item, with its path resolved and its locales applied
    pub fn raw_document(&self, item: &BatchItem) -> RawDocument {
        let source = item.source_locale.clone().unwrap_or_else(|| self.source_locale.clone());
        let target = item.target_locale.clone().or_else(|| self.target_locale.clone());
        let document = match &item.input {
            RawInput::File(path) => {
                RawDocument::from_path(resolve(self.input_root.as_deref(), path), &item.encoding, source, target)
            }
            RawInput::Bytes(bytes) => RawDocument::from_bytes(bytes.clone(), &item.encoding, source, target),
        };
        match &item.filter_config_id {
            Some(config_id) => document.with_filter_config(config_id),
            None => document,
        }
    }

    /// Output path of an item, resolved against the output root
    pub fn output_path(&self, item: &BatchItem) -> Option<PathBuf> {
        item.output
            .as_deref()
            .map(|path| resolve(self.output_root.as_deref(), path))
    }
}

/// What the steps know about the item being processed
#[derive(Debug)]
pub struct BatchItemContext {
    /// Position of the item in the batch
    pub index: usize,
    pub name: String,
    pub document: RawDocument,
    pub output_path: Option<PathBuf>,
    pub output_encoding: Option<String>,
    pub source_locale: LocaleId,
    pub target_locale: Option<LocaleId>,
    /// Writer created by the filter; the first step needing it takes it
    pub writer: Option<Box<dyn FilterWriter>>,
}

impl BatchItemContext {
    /// Take the filter's writer, if no other step took it yet
    pub fn take_writer(&mut self) -> Option<Box<dyn FilterWriter>> {
        self.writer.take()
    }
}

/// Outcome of one batch item
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub index: usize,
    pub name: String,
    pub success: bool,
    /// Whether the item was cancelled before the end of its document
    pub cancelled: bool,
    /// Number of events read from the filter
    pub events: usize,
    pub error: Option<String>,
    pub duration: Duration,
}

impl BatchItemResult {
    /// Create a successful result
    pub fn success(index: usize, name: &str, events: usize, cancelled: bool, duration: Duration) -> Self {
        Self {
            index,
            name: name.to_string(),
            success: true,
            cancelled,
            events,
            error: None,
            duration,
        }
    }

    /// Create a failed result
    pub fn failure(index: usize, name: &str, error: &str, duration: Duration) -> Self {
        Self {
            index,
            name: name.to_string(),
            success: false,
            cancelled: false,
            events: 0,
            error: Some(error.to_string()),
            duration,
        }
    }
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItemResult>,
    pub duration: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchItemResult> {
        self.items.iter().filter(|r| !r.success)
    }

    /// Whether every item succeeded
    pub fn is_success(&self) -> bool {
        self.items.iter().all(|r| r.success)
    }

    /// One line summary of the batch
    pub fn summary(&self) -> String {
        let failed = self.items.len() - self.succeeded();
        let mut parts = vec![
            format!("Duration: {:.2}s", self.duration.as_secs_f32()),
            format!("Items: {}", self.items.len()),
            format!("Succeeded: {}", self.succeeded()),
        ];
        if failed > 0 {
            parts.push(format!("Failed: {}", failed));
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_rawDocument_shouldResolveRootsAndLocales() {
        let mut batch = Batch::new(LocaleId::new("en").unwrap(), Some(LocaleId::new("fr").unwrap()))
            .with_roots(Some(PathBuf::from("/in")), Some(PathBuf::from("/out")));
        let item = BatchItem::from_path("docs/a.txt", "UTF-8")
            .with_output("docs/a.fr.txt")
            .with_locales(LocaleId::new("de").unwrap(), None);
        batch.add(item.clone());

        let doc = batch.raw_document(&item);
        assert_eq!(doc.path(), Some(Path::new("/in/docs/a.txt")));
        assert_eq!(doc.source_locale().as_str(), "de");
        assert_eq!(doc.target_locale().map(|l| l.as_str()), Some("fr"));
        assert_eq!(batch.output_path(&item), Some(PathBuf::from("/out/docs/a.fr.txt")));

        let absolute = BatchItem::from_path("/abs/b.txt", "UTF-8");
        assert_eq!(batch.raw_document(&absolute).path(), Some(Path::new("/abs/b.txt")));
    }

    #[test]
    fn test_batchReport_summary_shouldCountFailures() {
        let report = BatchReport {
            items: vec![
                BatchItemResult::success(0, "a", 4, false, Duration::ZERO),
                BatchItemResult::failure(1, "b", "Malformed input", Duration::ZERO),
            ],
            duration: Duration::from_millis(1500),
        };
        assert!(!report.is_success());
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.summary(), "Duration: 1.50s | Items: 2 | Succeeded: 1 | Failed: 1");
    }
}
