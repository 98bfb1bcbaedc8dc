/*!
 * Annotations: typed side-channel metadata attached to resources and containers.
 *
 * The set of annotation kinds is closed. Each kind has exactly one payload
 * type, and a resource holds at most one annotation per kind.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::quality::Issue;

/// The kinds of annotation a resource can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// ITS allowed-characters pattern
    AllowedCharacters,
    /// Inline codes without partner
    UnbalancedCodes,
    /// Issues reported by quality checks
    QualityIssues,
    /// Source word count
    WordCount,
    /// Free text note
    Note,
}

/// Recoverable warning about opening/closing codes without partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbalancedCodeWarning {
    /// Where the fragment lives ("source" or a target locale)
    pub location: String,
    /// Ids of the unpaired codes
    pub code_ids: Vec<i32>,
}

impl fmt::Display for UnbalancedCodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unbalanced codes in {}: {:?}",
            self.location, self.code_ids
        )
    }
}

/// An annotation with its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Annotation {
    /// Regex character class the content must match, e.g. `[a-z ]`
    AllowedCharacters(String),
    /// Unbalanced code warning
    UnbalancedCodes(UnbalancedCodeWarning),
    /// Quality issues found on the content
    QualityIssues(Vec<Issue>),
    /// Word count of the content
    WordCount(usize),
    /// Note
    Note(String),
}

impl Annotation {
    /// The kind of this annotation
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::AllowedCharacters(_) => AnnotationKind::AllowedCharacters,
            Self::UnbalancedCodes(_) => AnnotationKind::UnbalancedCodes,
            Self::QualityIssues(_) => AnnotationKind::QualityIssues,
            Self::WordCount(_) => AnnotationKind::WordCount,
            Self::Note(_) => AnnotationKind::Note,
        }
    }
}

/// Annotations keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    entries: BTreeMap<AnnotationKind, Annotation>,
}

impl Annotations {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an annotation, returning the one it replaces
    pub fn set(&mut self, annotation: Annotation) -> Option<Annotation> {
        self.entries.insert(annotation.kind(), annotation)
    }

    /// Get the annotation of the given kind
    pub fn get(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.entries.get(&kind)
    }

    /// Remove the annotation of the given kind
    pub fn remove(&mut self, kind: AnnotationKind) -> Option<Annotation> {
        self.entries.remove(&kind)
    }

    /// Whether an annotation of the given kind is present
    pub fn has(&self, kind: AnnotationKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.values()
    }

    /// The allowed-characters pattern, if any
    pub fn allowed_characters(&self) -> Option<&str> {
        match self.get(AnnotationKind::AllowedCharacters) {
            Some(Annotation::AllowedCharacters(pattern)) => Some(pattern),
            _ => None,
        }
    }

    /// The unbalanced code warning, if any
    pub fn unbalanced_codes(&self) -> Option<&UnbalancedCodeWarning> {
        match self.get(AnnotationKind::UnbalancedCodes) {
            Some(Annotation::UnbalancedCodes(warning)) => Some(warning),
            _ => None,
        }
    }

    /// Quality issues recorded so far
    pub fn issues(&self) -> &[Issue] {
        match self.get(AnnotationKind::QualityIssues) {
            Some(Annotation::QualityIssues(issues)) => issues,
            _ => &[],
        }
    }

    /// Record a quality issue
    pub fn push_issue(&mut self, issue: Issue) {
        match self.entries.get_mut(&AnnotationKind::QualityIssues) {
            Some(Annotation::QualityIssues(issues)) => issues.push(issue),
            _ => {
                self.set(Annotation::QualityIssues(vec![issue]));
            }
        }
    }

    /// The word count, if any
    pub fn word_count(&self) -> Option<usize> {
        match self.get(AnnotationKind::WordCount) {
            Some(Annotation::WordCount(count)) => Some(*count),
            _ => None,
        }
    }
}
