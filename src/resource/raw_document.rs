/*!
 * Raw documents: the input of a filter.
 *
 * A raw document points to bytes in memory or to a file, and carries the
 * declared encoding and the locales of the extraction. Decoding detects a
 * byte-order mark (which overrides the declared encoding) and the line break
 * style of the text.
 */

use encoding_rs::Encoding;
use log::debug;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::FilterError;
use crate::locale::LocaleId;

/// Where the bytes of a raw document come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Input of a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    input: RawInput,
    encoding: String,
    source_locale: LocaleId,
    target_locale: Option<LocaleId>,
    filter_config_id: Option<String>,
}

/// Text of a raw document after decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// Canonical name of the encoding actually used
    pub encoding: String,
    /// Whether the input started with a byte-order mark
    pub has_bom: bool,
    /// First line break found, `\n` when there is none
    pub line_break: String,
}

impl RawDocument {
    /// Create a document from text, declared as UTF-8
    pub fn from_text(text: &str, source_locale: LocaleId, target_locale: Option<LocaleId>) -> Self {
        Self::from_bytes(text.as_bytes().to_vec(), "UTF-8", source_locale, target_locale)
    }

    /// Create a document from bytes in the given encoding
    pub fn from_bytes(
        bytes: Vec<u8>,
        encoding: &str,
        source_locale: LocaleId,
        target_locale: Option<LocaleId>,
    ) -> Self {
        Self {
            input: RawInput::Bytes(bytes),
            encoding: encoding.to_string(),
            source_locale,
            target_locale,
            filter_config_id: None,
        }
    }

    /// Create a document reading a file in the given encoding
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        encoding: &str,
        source_locale: LocaleId,
        target_locale: Option<LocaleId>,
    ) -> Self {
        Self {
            input: RawInput::File(path.as_ref().to_path_buf()),
            encoding: encoding.to_string(),
            source_locale,
            target_locale,
            filter_config_id: None,
        }
    }

    /// Set the filter configuration to use for this document
    pub fn with_filter_config(mut self, config_id: &str) -> Self {
        self.filter_config_id = Some(config_id.to_string());
        self
    }

    pub fn input(&self) -> &RawInput {
        &self.input
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn source_locale(&self) -> &LocaleId {
        &self.source_locale
    }

    pub fn target_locale(&self) -> Option<&LocaleId> {
        self.target_locale.as_ref()
    }

    pub fn filter_config_id(&self) -> Option<&str> {
        self.filter_config_id.as_deref()
    }

    /// Path of the input file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.input {
            RawInput::File(path) => Some(path),
            RawInput::Bytes(_) => None,
        }
    }

    /// Display name of the document
    pub fn name(&self) -> Option<String> {
        self.path().map(|p| p.display().to_string())
    }

    /// Read the input bytes
    pub fn read_bytes(&self) -> Result<Cow<'_, [u8]>, FilterError> {
        match &self.input {
            RawInput::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            RawInput::File(path) => {
                let bytes = fs::read(path).map_err(|e| {
                    FilterError::MalformedInput(format!("Cannot read {}: {}", path.display(), e))
                })?;
                Ok(Cow::Owned(bytes))
            }
        }
    }

    /// Read and decode the input
    ///
    /// A byte-order mark overrides the declared encoding. Invalid byte
    /// sequences make the document malformed.
    pub fn decode(&self) -> Result<DecodedText, FilterError> {
        let declared = Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| FilterError::UnsupportedEncoding(self.encoding.clone()))?;
        let bytes = self.read_bytes()?;

        let (encoding, bom_length) = Encoding::for_bom(&bytes).unwrap_or((declared, 0));
        if bom_length > 0 && encoding != declared {
            debug!(
                "Byte-order mark overrides declared encoding {} with {}",
                declared.name(),
                encoding.name()
            );
        }

        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        if had_errors {
            return Err(FilterError::MalformedInput(format!(
                "Invalid {} byte sequence in input",
                encoding.name()
            )));
        }

        let text = text.into_owned();
        let line_break = detect_line_break(&text).to_string();
        Ok(DecodedText {
            text,
            encoding: encoding.name().to_string(),
            has_bom: bom_length > 0,
            line_break,
        })
    }
}

/// First line break style found in a text, `\n` by default
pub fn detect_line_break(text: &str) -> &'static str {
    match text.find(['\r', '\n']) {
        Some(pos) => {
            let rest = &text.as_bytes()[pos..];
            if rest.starts_with(b"\r\n") {
                "\r\n"
            } else if rest[0] == b'\r' {
                "\r"
            } else {
                "\n"
            }
        }
        None => "\n",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> LocaleId {
        LocaleId::new("en").unwrap()
    }

    #[test]
    fn test_rawDocument_decode_shouldDetectBomAndLineBreak() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"one\r\ntwo");
        let doc = RawDocument::from_bytes(bytes, "windows-1252", en(), None);
        let decoded = doc.decode().unwrap();
        assert_eq!(decoded.text, "one\r\ntwo");
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(decoded.has_bom);
        assert_eq!(decoded.line_break, "\r\n");
    }

    #[test]
    fn test_rawDocument_decode_withInvalidUtf8_shouldBeMalformed() {
        let doc = RawDocument::from_bytes(vec![b'a', 0xFF, b'b'], "UTF-8", en(), None);
        assert!(matches!(doc.decode(), Err(FilterError::MalformedInput(_))));
    }

    #[test]
    fn test_rawDocument_decode_withUnknownEncoding_shouldFail() {
        let doc = RawDocument::from_bytes(b"x".to_vec(), "no-such-charset", en(), None);
        assert!(matches!(doc.decode(), Err(FilterError::UnsupportedEncoding(_))));
    }

    #[test]
    fn test_rawDocument_decode_withMissingFile_shouldBeMalformed() {
        let doc = RawDocument::from_path("/nonexistent/input.txt", "UTF-8", en(), None);
        assert!(matches!(doc.decode(), Err(FilterError::MalformedInput(_))));
    }

    #[test]
    fn test_detectLineBreak_shouldHandleAllStyles() {
        assert_eq!(detect_line_break("a\rb"), "\r");
        assert_eq!(detect_line_break("a\nb\r\n"), "\n");
        assert_eq!(detect_line_break("ab"), "\n");
    }
}
