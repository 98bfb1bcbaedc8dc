use isolang::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// Locale identifiers for source and target content
///
/// A `LocaleId` is a normalized, lowercase tag made of an ISO 639 language
/// subtag and optional region or script subtags, separated by '-'
/// (`fr`, `en-us`, `zh-hant-tw`). Underscores are accepted on input.
/// The language subtag is validated with the ISO 639-1 and ISO 639-3 tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleId(String);

/// ISO 639-2/B codes that differ from their ISO 639-2/T equivalent
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

impl LocaleId {
    /// Parse and validate a locale code
    pub fn new(code: &str) -> Result<Self, ConfigurationError> {
        let normalized = code.trim().replace('_', "-").to_lowercase();
        let mut subtags = normalized.split('-');
        let language = subtags.next().unwrap_or_default();

        if Self::language(language).is_none() {
            return Err(ConfigurationError::InvalidLocale(code.to_string()));
        }
        if subtags.any(|s| s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric())) {
            return Err(ConfigurationError::InvalidLocale(code.to_string()));
        }

        Ok(Self(normalized))
    }

    /// The full normalized tag
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The language subtag only
    pub fn language_code(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// The region subtag, if any (two letters or three digits)
    pub fn region(&self) -> Option<&str> {
        self.0
            .split('-')
            .skip(1)
            .find(|s| s.len() == 2 || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit())))
    }

    /// English name of the language
    pub fn language_name(&self) -> String {
        Self::language(self.language_code())
            .map(|lang| lang.to_name().to_string())
            .unwrap_or_else(|| self.language_code().to_string())
    }

    /// Check if two locales share the same language, whatever code form is used
    pub fn same_language_as(&self, other: &LocaleId) -> bool {
        match (
            Self::language(self.language_code()),
            Self::language(other.language_code()),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn language(code: &str) -> Option<Language> {
        match code.len() {
            2 => Language::from_639_1(code),
            3 => {
                let part2t = PART2B_TO_PART2T
                    .iter()
                    .find(|(b, _)| *b == code)
                    .map(|(_, t)| *t)
                    .unwrap_or(code);
                Language::from_639_3(part2t)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocaleId {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<LocaleId> for String {
    fn from(locale: LocaleId) -> Self {
        locale.0
    }
}
