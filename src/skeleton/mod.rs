/*!
 * Skeletons: the non-translatable scaffolding of a document.
 *
 * A skeleton is an ordered list of parts. Literal parts hold original
 * characters to reproduce unchanged; reference parts stand for the current
 * content of an extracted resource. Concatenating the parts of all events,
 * with references resolved against the untouched source, gives back the
 * original document.
 *
 * - `writer`: the generic skeleton writer that performs that concatenation
 */

pub mod writer;

pub use writer::{FilterWriter, SkeletonWriter, write_events};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::locale::LocaleId;

/// Start of a reference marker in the display form of a skeleton
pub const REFMARKER_START: &str = "[#$";
/// End of a reference marker in the display form of a skeleton
pub const REFMARKER_END: &str = "]";

/// One part of a skeleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkeletonPart {
    /// Original characters, written verbatim
    Literal(String),

    /// The content of the resource with the given id
    ///
    /// Without a locale the writer picks the target for its output locale,
    /// falling back to the source. With a locale that target is used.
    Reference {
        /// Id of the referenced resource
        id: String,
        /// Explicit locale of the content, if any
        locale: Option<LocaleId>,
    },
}

impl fmt::Display for SkeletonPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Reference { id, locale: None } => {
                write!(f, "{}{}{}", REFMARKER_START, id, REFMARKER_END)
            }
            Self::Reference {
                id,
                locale: Some(locale),
            } => write!(f, "{}{}@{}{}", REFMARKER_START, id, locale, REFMARKER_END),
        }
    }
}

/// Ordered literal and reference parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skeleton {
    parts: Vec<SkeletonPart>,
    #[serde(skip)]
    create_new: bool,
}

impl Skeleton {
    /// Create an empty skeleton
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a skeleton with one literal part
    pub fn from_literal(data: &str) -> Self {
        let mut skeleton = Self::new();
        skeleton.add_literal(data);
        skeleton
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[SkeletonPart] {
        &self.parts
    }

    /// Add a new literal part; empty data has no effect
    pub fn add_literal(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        self.parts.push(SkeletonPart::Literal(data.to_string()));
        self.create_new = false;
    }

    /// Append data to the current literal part, or start a new one
    pub fn append(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        if !self.create_new {
            if let Some(SkeletonPart::Literal(last)) = self.parts.last_mut() {
                last.push_str(data);
                return;
            }
        }
        self.add_literal(data);
    }

    /// Force the next `append` to start a new part
    pub fn flush_part(&mut self) {
        self.create_new = true;
    }

    /// Add a reference to the current content of a resource
    pub fn add_reference(&mut self, id: &str) {
        self.parts.push(SkeletonPart::Reference {
            id: id.to_string(),
            locale: None,
        });
        self.create_new = true;
    }

    /// Add a reference to the content of a resource in a given locale
    pub fn add_reference_for(&mut self, id: &str, locale: LocaleId) {
        self.parts.push(SkeletonPart::Reference {
            id: id.to_string(),
            locale: Some(locale),
        });
        self.create_new = true;
    }

    /// Append all the parts of another skeleton
    pub fn add_skeleton(&mut self, other: &Skeleton) {
        for part in &other.parts {
            match part {
                SkeletonPart::Literal(text) => self.append(text),
                reference => {
                    self.parts.push(reference.clone());
                    self.create_new = true;
                }
            }
        }
    }

    /// Ids of all resources referenced by this skeleton
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            SkeletonPart::Reference { id, .. } => Some(id.as_str()),
            SkeletonPart::Literal(_) => None,
        })
    }

    /// Point every reference to `old_id` at `new_id`
    pub fn change_referent(&mut self, old_id: &str, new_id: &str) {
        for part in &mut self.parts {
            if let SkeletonPart::Reference { id, .. } = part {
                if id == old_id {
                    *id = new_id.to_string();
                }
            }
        }
    }
}

impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_append_shouldMergeLiteralParts() {
        let mut skel = Skeleton::new();
        skel.append("<p>");
        skel.append("<span>");
        assert_eq!(skel.parts().len(), 1);

        skel.add_reference("tu1");
        skel.append("</span>");
        skel.append("</p>");
        assert_eq!(skel.parts().len(), 3);
        assert_eq!(skel.to_string(), "<p><span>[#$tu1]</span></p>");
    }

    #[test]
    fn test_skeleton_flushPart_shouldStartNewLiteral() {
        let mut skel = Skeleton::from_literal("a");
        skel.flush_part();
        skel.append("b");
        assert_eq!(skel.parts().len(), 2);
        skel.add_literal("");
        assert_eq!(skel.parts().len(), 2);
    }

    #[test]
    fn test_skeleton_changeReferent_shouldRewriteIds() {
        let mut skel = Skeleton::new();
        skel.add_reference("tu1");
        skel.add_reference_for("tu1", LocaleId::new("fr").unwrap());
        skel.change_referent("tu1", "tu9");
        let refs: Vec<&str> = skel.references().collect();
        assert_eq!(refs, vec!["tu9", "tu9"]);
        assert_eq!(skel.to_string(), "[#$tu9][#$tu9@fr]");
    }
}
