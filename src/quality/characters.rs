/*!
 * Character checks on text units.
 *
 * Three independent checks, each producing at most one issue per container:
 * - allowed-characters patterns carried by an `AllowedCharacters` annotation
 *   on the source or target container (first character not allowed)
 * - corrupted characters in the target (UTF-8 read as a single-byte charset)
 * - characters of the target not representable in a charset, unless matched
 *   by the extra allowed characters pattern
 */

use encoding_rs::Encoding;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Issue, IssueType, Severity, Span};
use crate::errors::ConfigurationError;
use crate::locale::LocaleId;
use crate::resource::{TextContainer, TextUnit};

/// Some of the most frequent patterns of UTF-8 text decoded as Latin-1
static CORRUPTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x{00C3}[\x{00A4}-\x{00B6}]|\x{00C3}\x{201E}|\x{00C3}\x{2026}|\x{00C3}\x{2013}")
        .expect("Invalid corruption regex")
});

/// Settings of the characters checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharactersCheckerConfig {
    /// Apply allowed-characters annotations
    pub check_allowed_characters: bool,

    /// Check target characters against `charset`
    pub check_characters: bool,

    /// Look for corrupted characters in the target
    pub corrupted_characters: bool,

    /// Charset the target must fit in (empty for none)
    pub charset: String,

    /// Regex matching characters allowed even outside `charset`
    pub extra_chars_allowed: String,
}

impl Default for CharactersCheckerConfig {
    fn default() -> Self {
        Self {
            check_allowed_characters: true,
            check_characters: false,
            corrupted_characters: true,
            charset: "ISO-8859-1".to_string(),
            extra_chars_allowed: String::new(),
        }
    }
}

/// Runs the character checks on text units
#[derive(Debug)]
pub struct CharactersChecker {
    config: CharactersCheckerConfig,
    encoding: Option<&'static Encoding>,
    extra_chars_allowed: Option<Regex>,
    /// Last allowed-characters pattern seen, with its inverted form
    allowed_cache: Option<(String, Regex)>,
}

impl CharactersChecker {
    /// Create a checker, validating the charset and the extra characters pattern
    pub fn new(config: CharactersCheckerConfig) -> Result<Self, ConfigurationError> {
        let mut encoding = None;
        let mut extra_chars_allowed = None;

        if config.check_characters {
            if !config.charset.is_empty() {
                let found = Encoding::for_label(config.charset.as_bytes())
                    .ok_or_else(|| ConfigurationError::UnknownEncoding(config.charset.clone()))?;
                if found.name() != config.charset {
                    debug!("Charset {} checked as {}", config.charset, found.name());
                }
                encoding = Some(found);
            }
            if !config.extra_chars_allowed.is_empty() {
                let regex = Regex::new(&config.extra_chars_allowed).map_err(|e| {
                    ConfigurationError::InvalidPattern {
                        pattern: config.extra_chars_allowed.clone(),
                        message: e.to_string(),
                    }
                })?;
                extra_chars_allowed = Some(regex);
            }
        }

        Ok(Self {
            config,
            encoding,
            extra_chars_allowed,
            allowed_cache: None,
        })
    }

    pub fn config(&self) -> &CharactersCheckerConfig {
        &self.config
    }

    /// Check a text unit against the target locale
    ///
    /// Issues are recorded on the container they concern and returned.
    /// Non-translatable units are skipped.
    pub fn check_text_unit(&mut self, tu: &mut TextUnit, target_locale: &LocaleId) -> Vec<Issue> {
        let mut issues = Vec::new();
        if !tu.translatable {
            return issues;
        }
        let tu_id = tu.id.clone();

        if self.config.check_allowed_characters {
            if let Some(issue) = self.check_allowed(&tu_id, tu.source(), true) {
                tu.source_mut().annotations_mut().push_issue(issue.clone());
                issues.push(issue);
            }
        }

        let Some(target) = tu.target(target_locale) else {
            return issues;
        };
        let target_text = target.content().to_original();

        let mut found = Vec::new();
        if self.config.check_allowed_characters {
            found.extend(self.check_allowed(&tu_id, target, false));
        }
        if self.config.corrupted_characters {
            found.extend(check_corrupted(&tu_id, &target_text));
        }
        if self.config.check_characters {
            found.extend(self.check_charset(&tu_id, &target_text));
        }

        if let Some(target) = tu.target_mut(target_locale) {
            for issue in &found {
                target.annotations_mut().push_issue(issue.clone());
            }
        }
        issues.extend(found);
        issues
    }

    fn check_allowed(&mut self, tu_id: &str, container: &TextContainer, is_source: bool) -> Option<Issue> {
        let pattern = container.annotations().allowed_characters()?;

        let cached = matches!(&self.allowed_cache, Some((last, _)) if last == pattern);
        if !cached {
            match invert_pattern(pattern) {
                Ok(regex) => self.allowed_cache = Some((pattern.to_string(), regex)),
                Err(message) => {
                    warn!("Cannot check allowed characters pattern '{}': {}", pattern, message);
                    return Some(Issue::new(
                        IssueType::AllowedCharacters,
                        Severity::High,
                        tu_id,
                        format!(
                            "Error when trying to check allowed characters pattern '{}': {}",
                            pattern, message
                        ),
                    ));
                }
            }
        }
        let regex = &self.allowed_cache.as_ref()?.1;

        let text = container.content().to_text();
        let m = regex.find(&text)?;
        let start = text[..m.start()].chars().count();
        let span = Span::new(start, start + m.as_str().chars().count());
        let issue = Issue::new(
            IssueType::AllowedCharacters,
            Severity::High,
            tu_id,
            format!("Character not allowed: '{}' (pattern: '{}')", m.as_str(), pattern),
        );
        Some(if is_source {
            issue.with_source_span(span)
        } else {
            issue.with_target_span(span)
        })
    }

    fn check_charset(&self, tu_id: &str, target: &str) -> Option<Issue> {
        let mut first: Option<(usize, char)> = None;
        let mut others = String::new();

        for (pos, ch) in target.chars().enumerate() {
            if self.is_allowed_char(ch) {
                continue;
            }
            match first {
                None => first = Some((pos, ch)),
                // Later characters are listed once each, the first one included
                Some(_) => {
                    if !others.contains(ch) {
                        others.push(ch);
                    }
                }
            }
        }

        let (pos, ch) = first?;
        let mut message = format!(
            "The character '{}' (U+{:04X}) is not allowed in the target text.",
            ch, ch as u32
        );
        if !others.is_empty() {
            message.push_str(" Other forbidden characters found: ");
            message.push_str(&others);
        }
        Some(
            Issue::new(IssueType::AllowedCharacters, Severity::Medium, tu_id, message)
                .with_target_span(Span::new(pos, pos + 1)),
        )
    }

    fn is_allowed_char(&self, ch: char) -> bool {
        if let Some(encoding) = self.encoding {
            let mut buf = [0u8; 4];
            let (_, _, unmappable) = encoding.encode(ch.encode_utf8(&mut buf));
            if !unmappable {
                return true;
            }
        }
        match &self.extra_chars_allowed {
            Some(extra) => {
                let mut buf = [0u8; 4];
                extra.is_match(ch.encode_utf8(&mut buf))
            }
            None => false,
        }
    }
}

fn check_corrupted(tu_id: &str, target: &str) -> Option<Issue> {
    let m = CORRUPTION_REGEX.find(target)?;
    let start = target[..m.start()].chars().count();
    Some(
        Issue::new(
            IssueType::SuspectPattern,
            Severity::High,
            tu_id,
            format!(
                "Possible corrupted characters in the target (for example: \"{}\").",
                m.as_str()
            ),
        )
        .with_target_span(Span::new(start, start + m.as_str().chars().count())),
    )
}

/// Turn an allowed-characters class into a regex matching a character NOT allowed
fn invert_pattern(pattern: &str) -> Result<Regex, String> {
    let inverted = if let Some(rest) = pattern.strip_prefix("[^") {
        format!("[{}", rest)
    } else if let Some(rest) = pattern.strip_prefix('[') {
        format!("[^{}", rest)
    } else {
        return Err("Pattern should start with '[' or '[^'.".to_string());
    };
    Regex::new(&inverted).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Annotation, TextFragment};

    fn fr() -> LocaleId {
        LocaleId::new("fr").unwrap()
    }

    fn unit(source: &str, target: &str) -> TextUnit {
        let mut tu = TextUnit::from_text("tu1", source);
        tu.set_target_content(fr(), TextFragment::from_text(target));
        tu
    }

    #[test]
    fn test_checker_allowedCharacters_shouldReportFirstDisallowedOnly() {
        let mut tu = unit("Summer and\nspring", "été et printemps");
        tu.target_mut(&fr())
            .unwrap()
            .annotations_mut()
            .set(Annotation::AllowedCharacters("[a-z ]".into()));

        let mut checker = CharactersChecker::new(CharactersCheckerConfig::default()).unwrap();
        let issues = checker.check_text_unit(&mut tu, &fr());

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::AllowedCharacters);
        assert_eq!(issues[0].target_span, Some(Span::new(0, 1)));
        assert_eq!(tu.target(&fr()).unwrap().annotations().issues().len(), 1);
        assert!(tu.source().annotations().issues().is_empty());
    }

    #[test]
    fn test_checker_cleanText_shouldReportNothing() {
        let mut tu = unit("  Text {with} (123). ", "  Texte {avec} (123). ");
        let mut checker = CharactersChecker::new(CharactersCheckerConfig::default()).unwrap();
        assert!(checker.check_text_unit(&mut tu, &fr()).is_empty());
    }

    #[test]
    fn test_checker_corruptedCharacters_shouldReportSuspectPattern() {
        let mut tu = unit("Über", "Ã–ber");
        let mut checker = CharactersChecker::new(CharactersCheckerConfig::default()).unwrap();
        let issues = checker.check_text_unit(&mut tu, &fr());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::SuspectPattern);
    }

    #[test]
    fn test_checker_charset_shouldHonorExtraCharacters() {
        let config = CharactersCheckerConfig {
            check_characters: true,
            charset: "ISO-8859-1".to_string(),
            extra_chars_allowed: "[\u{0151}]".to_string(),
            ..Default::default()
        };
        let mut checker = CharactersChecker::new(config).unwrap();

        let mut tu = unit("a", "\u{0151}");
        assert!(checker.check_text_unit(&mut tu, &fr()).is_empty());

        let mut tu = unit("a", "x\u{0171}\u{0430}\u{0171}");
        let issues = checker.check_text_unit(&mut tu, &fr());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].target_span, Some(Span::new(1, 2)));
        assert!(issues[0].message.ends_with("Other forbidden characters found: \u{0430}\u{0171}"));
    }

    #[test]
    fn test_checker_charset_repeatedFirstCharacter_shouldBeListedAsOther() {
        let config = CharactersCheckerConfig {
            check_characters: true,
            charset: "ISO-8859-1".to_string(),
            ..Default::default()
        };
        let mut checker = CharactersChecker::new(config).unwrap();

        let mut tu = unit("a", "\u{0171}b\u{0171}\u{0171}");
        let issues = checker.check_text_unit(&mut tu, &fr());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.ends_with("Other forbidden characters found: \u{0171}"));

        let mut tu = unit("a", "b\u{0171}");
        let issues = checker.check_text_unit(&mut tu, &fr());
        assert!(!issues[0].message.contains("Other"));
    }

    #[test]
    fn test_checker_invalidCharset_shouldBeConfigurationError() {
        let config = CharactersCheckerConfig {
            check_characters: true,
            charset: "not-a-charset".to_string(),
            ..Default::default()
        };
        assert_eq!(
            CharactersChecker::new(config).unwrap_err(),
            ConfigurationError::UnknownEncoding("not-a-charset".to_string())
        );
    }

    #[test]
    fn test_checker_badAllowedPattern_shouldReportIssue() {
        let mut tu = unit("abc", "abc");
        tu.source_mut()
            .annotations_mut()
            .set(Annotation::AllowedCharacters("a-z".into()));
        let mut checker = CharactersChecker::new(CharactersCheckerConfig::default()).unwrap();
        let issues = checker.check_text_unit(&mut tu, &fr());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("should start with"));
    }

    #[test]
    fn test_checker_nonTranslatable_shouldBeSkipped() {
        let mut tu = unit("x", "Ã¤");
        tu.translatable = false;
        let mut checker = CharactersChecker::new(CharactersCheckerConfig::default()).unwrap();
        assert!(checker.check_text_unit(&mut tu, &fr()).is_empty());
    }
}
