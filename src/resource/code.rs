/*!
 * Inline codes.
 *
 * A code stands for a piece of original markup inside extracted text: a bold
 * start tag, a line break, an image reference. The text around it is
 * translatable, the code itself is opaque and is written back verbatim.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of inline code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    /// Starts a span (e.g. `<b>`), paired with a later closing code
    Opening,
    /// Ends a span opened earlier with the same id
    Closing,
    /// Self-contained code (e.g. `<br/>`)
    Placeholder,
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Closing => write!(f, "closing"),
            Self::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// Common code types
pub mod types {
    pub const NULL: &str = "null";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINED: &str = "underlined";
    /// Line break
    pub const LB: &str = "lb";
    pub const LINK: &str = "link";
    pub const IMAGE: &str = "image";
    pub const COMMENT: &str = "comment";
    pub const REFERENCE: &str = "ref";
}

/// An inline code inside a `TextFragment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    /// Opening, closing or placeholder
    pub tag_type: TagType,

    /// Identifier, unique per fragment except for opening/closing pairs
    pub id: i32,

    /// Free-form type tag, shared by the two codes of a pair
    #[serde(rename = "type")]
    pub code_type: String,

    /// Original markup this code stands for
    pub data: String,

    /// Set when an opening or closing code has no partner on purpose
    #[serde(default)]
    pub isolated: bool,
}

impl Code {
    /// Create a new code
    pub fn new(tag_type: TagType, id: i32, code_type: &str, data: &str) -> Self {
        Self {
            tag_type,
            id,
            code_type: code_type.to_string(),
            data: data.to_string(),
            isolated: false,
        }
    }

    /// Whether this code carries original markup
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Generic, format-independent notation of the code
    ///
    /// `<0>` and `</0>` for a pair, `<1/>` for a placeholder, `<b2/>` and
    /// `<e3/>` for isolated opening and closing codes.
    pub fn to_generic(&self) -> String {
        match (self.tag_type, self.isolated) {
            (TagType::Opening, false) => format!("<{}>", self.id),
            (TagType::Closing, false) => format!("</{}>", self.id),
            (TagType::Opening, true) => format!("<b{}/>", self.id),
            (TagType::Closing, true) => format!("<e{}/>", self.id),
            (TagType::Placeholder, _) => format!("<{}/>", self.id),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}
