/*!
 * Common test utilities for the tkit test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use tkit::filters::{extract_events, Filter};
use tkit::locale::LocaleId;
use tkit::resource::{Event, RawDocument};
use tkit::skeleton::{write_events, SkeletonWriter};

/// Route library logs to the test output, once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn en() -> LocaleId {
    LocaleId::new("en").unwrap()
}

pub fn fr() -> LocaleId {
    LocaleId::new("fr").unwrap()
}

/// In-memory UTF-8 document in English
pub fn document(text: &str) -> RawDocument {
    RawDocument::from_text(text, en(), Some(fr()))
}

/// All the events a filter extracts from a text
pub fn extract(filter: &mut dyn Filter, text: &str) -> Vec<Event> {
    extract_events(filter, &document(text)).unwrap()
}

/// Write events with a skeleton writer for the given locale
pub fn write(events: &[Event], locale: Option<LocaleId>) -> Vec<u8> {
    write_events(&mut SkeletonWriter::for_locale(locale), events).unwrap()
}

/// Sample INI document with comments, sections and quoted values
pub const SAMPLE_INI: &str = "; settings\n[window]\ntitle = \"Main <b>window</b>\"\nwidth=640\n\n[menu]\nopen: Open file\nquit = Quit\n";

/// Sample plain text document with blank lines and CRLF breaks
pub const SAMPLE_TEXT: &str = "First paragraph, line one.\r\nLine two.\r\n\r\nSecond paragraph.\r\n";
