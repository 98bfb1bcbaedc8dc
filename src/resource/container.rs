/*!
 * Text containers and text units.
 *
 * A container is a fragment plus the annotations that apply to that
 * fragment only (for example an allowed-characters pattern set on a target).
 * A text unit groups one source container with zero or more target
 * containers keyed by locale.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::annotation::{Annotation, Annotations, UnbalancedCodeWarning};
use super::fragment::TextFragment;
use crate::locale::LocaleId;
use crate::skeleton::Skeleton;

/// A fragment with its own annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContainer {
    content: TextFragment,
    #[serde(default)]
    annotations: Annotations,
}

impl TextContainer {
    pub fn new(content: TextFragment) -> Self {
        Self {
            content,
            annotations: Annotations::new(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(TextFragment::from_text(text))
    }

    pub fn content(&self) -> &TextFragment {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut TextFragment {
        &mut self.content
    }

    /// Replace the content, returning the previous one
    pub fn set_content(&mut self, content: TextFragment) -> TextFragment {
        std::mem::replace(&mut self.content, content)
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Record an `UnbalancedCodes` annotation if the content is unbalanced
    ///
    /// Returns true when the content is balanced.
    pub fn check_balance(&mut self, location: &str) -> bool {
        let ids = self.content.unbalanced_code_ids();
        if ids.is_empty() {
            return true;
        }
        self.annotations.set(Annotation::UnbalancedCodes(UnbalancedCodeWarning {
            location: location.to_string(),
            code_ids: ids,
        }));
        false
    }
}

/// An extractable unit of translatable text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    /// Resource id, unique within one extraction pass
    pub id: String,

    /// Optional resource name (e.g. an INI key)
    pub name: Option<String>,

    /// MIME type of the content
    pub mime_type: Option<String>,

    /// Whether the content should be translated
    pub translatable: bool,

    /// Whether whitespace in the content is significant
    pub preserve_whitespace: bool,

    /// Referents are written where another skeleton references them
    pub referent: bool,

    pub skeleton: Option<Skeleton>,

    #[serde(default)]
    pub annotations: Annotations,

    source: TextContainer,

    #[serde(default)]
    targets: BTreeMap<LocaleId, TextContainer>,
}

impl TextUnit {
    /// Create a translatable unit with the given source content
    pub fn new(id: &str, source: TextFragment) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            mime_type: None,
            translatable: true,
            preserve_whitespace: false,
            referent: false,
            skeleton: None,
            annotations: Annotations::new(),
            source: TextContainer::new(source),
            targets: BTreeMap::new(),
        }
    }

    /// Create a unit from plain source text
    pub fn from_text(id: &str, text: &str) -> Self {
        Self::new(id, TextFragment::from_text(text))
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn source(&self) -> &TextContainer {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut TextContainer {
        &mut self.source
    }

    pub fn target(&self, locale: &LocaleId) -> Option<&TextContainer> {
        self.targets.get(locale)
    }

    pub fn target_mut(&mut self, locale: &LocaleId) -> Option<&mut TextContainer> {
        self.targets.get_mut(locale)
    }

    pub fn has_target(&self, locale: &LocaleId) -> bool {
        self.targets.contains_key(locale)
    }

    /// Add or replace a target, returning the replaced one
    pub fn set_target(&mut self, locale: LocaleId, container: TextContainer) -> Option<TextContainer> {
        self.targets.insert(locale, container)
    }

    /// Set a target from a fragment, keeping existing target annotations
    pub fn set_target_content(&mut self, locale: LocaleId, content: TextFragment) {
        match self.targets.get_mut(&locale) {
            Some(container) => {
                container.set_content(content);
            }
            None => {
                self.targets.insert(locale, TextContainer::new(content));
            }
        }
    }

    /// Get the target for a locale, creating it if needed
    ///
    /// A new target starts as a copy of the source content when
    /// `copy_source` is set, or empty otherwise.
    pub fn create_target(&mut self, locale: &LocaleId, copy_source: bool) -> &mut TextContainer {
        let source = &self.source;
        self.targets.entry(locale.clone()).or_insert_with(|| {
            if copy_source {
                TextContainer::new(source.content().clone())
            } else {
                TextContainer::default()
            }
        })
    }

    pub fn remove_target(&mut self, locale: &LocaleId) -> Option<TextContainer> {
        self.targets.remove(locale)
    }

    pub fn target_locales(&self) -> impl Iterator<Item = &LocaleId> {
        self.targets.keys()
    }

    /// The content to output for a locale: its target if present, else the source
    pub fn content_for(&self, locale: Option<&LocaleId>) -> &TextFragment {
        locale
            .and_then(|l| self.targets.get(l))
            .map(|c| c.content())
            .unwrap_or_else(|| self.source.content())
    }

    /// Record unbalanced-code warnings on the source and every target
    ///
    /// Returns true when all containers are balanced.
    pub fn check_balance(&mut self) -> bool {
        let mut balanced = self.source.check_balance("source");
        for (locale, target) in self.targets.iter_mut() {
            balanced &= target.check_balance(locale.as_str());
        }
        balanced
    }
}
