/*!
 * Events and the resources they carry.
 *
 * A filter turns a document into an ordered sequence of events. Every
 * resource has an id that is unique and stable within one extraction pass,
 * an optional skeleton holding the original characters around it, and a set
 * of annotations. Steps receive each event by value and hand it on, possibly
 * modified or replaced.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use super::annotation::Annotations;
use super::container::TextUnit;
use crate::locale::LocaleId;
use crate::skeleton::Skeleton;

/// Common accessors for every resource carried by an event
pub trait Resource {
    fn id(&self) -> &str;
    fn skeleton(&self) -> Option<&Skeleton>;
    fn skeleton_mut(&mut self) -> &mut Option<Skeleton>;
    fn annotations(&self) -> &Annotations;
    fn annotations_mut(&mut self) -> &mut Annotations;
}

macro_rules! impl_resource {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Resource for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
                fn skeleton(&self) -> Option<&Skeleton> {
                    self.skeleton.as_ref()
                }
                fn skeleton_mut(&mut self) -> &mut Option<Skeleton> {
                    &mut self.skeleton
                }
                fn annotations(&self) -> &Annotations {
                    &self.annotations
                }
                fn annotations_mut(&mut self) -> &mut Annotations {
                    &mut self.annotations
                }
            }
        )+
    };
}

/// First event of every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartDocument {
    pub id: String,
    /// Document name or path, if known
    pub name: Option<String>,
    pub locale: LocaleId,
    /// Name of the encoding the document was decoded with
    pub encoding: String,
    /// Whether the input started with a byte-order mark
    pub has_bom: bool,
    /// Line break detected in the input
    pub line_break: String,
    pub mime_type: String,
    /// Configuration id of the filter that produced the events
    pub filter_id: String,
    /// Whether the format can hold several languages
    pub multilingual: bool,
    pub skeleton: Option<Skeleton>,
    #[serde(default)]
    pub annotations: Annotations,
}

/// End of a document, sub-document or group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ending {
    pub id: String,
    pub skeleton: Option<Skeleton>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl Ending {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            skeleton: None,
            annotations: Annotations::new(),
        }
    }
}

/// Start of a document embedded in another one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSubDocument {
    pub id: String,
    pub name: Option<String>,
    /// Id of the enclosing document
    pub parent_id: String,
    pub skeleton: Option<Skeleton>,
    #[serde(default)]
    pub annotations: Annotations,
}

/// Start of a group of resources (a section, a list, a table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGroup {
    pub id: String,
    pub name: Option<String>,
    /// Id of the enclosing group or document
    pub parent_id: String,
    /// Format-specific group type (e.g. "section")
    pub group_type: Option<String>,
    pub referent: bool,
    pub skeleton: Option<Skeleton>,
    #[serde(default)]
    pub annotations: Annotations,
}

/// A non-translatable part of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPart {
    pub id: String,
    pub referent: bool,
    pub skeleton: Option<Skeleton>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl DocumentPart {
    pub fn new(id: &str, skeleton: Skeleton) -> Self {
        Self {
            id: id.to_string(),
            referent: false,
            skeleton: Some(skeleton),
            annotations: Annotations::new(),
        }
    }
}

/// Filter or step specific data passed along the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Custom {
    pub id: String,
    /// Free-form kind tag, matched by the steps that understand it
    pub kind: String,
    pub payload: serde_json::Value,
    pub skeleton: Option<Skeleton>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl_resource!(StartDocument, Ending, StartSubDocument, StartGroup, DocumentPart, Custom, TextUnit);

/// The kind of an event, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    StartDocument,
    EndDocument,
    StartSubDocument,
    EndSubDocument,
    StartGroup,
    EndGroup,
    TextUnit,
    DocumentPart,
    Custom,
    Multi,
    NoOp,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::StartDocument => "START_DOCUMENT",
            EventType::EndDocument => "END_DOCUMENT",
            EventType::StartSubDocument => "START_SUBDOCUMENT",
            EventType::EndSubDocument => "END_SUBDOCUMENT",
            EventType::StartGroup => "START_GROUP",
            EventType::EndGroup => "END_GROUP",
            EventType::TextUnit => "TEXT_UNIT",
            EventType::DocumentPart => "DOCUMENT_PART",
            EventType::Custom => "CUSTOM",
            EventType::Multi => "MULTI_EVENT",
            EventType::NoOp => "NO_OP",
        };
        f.write_str(name)
    }
}

/// One event of the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    StartDocument(StartDocument),
    EndDocument(Ending),
    StartSubDocument(StartSubDocument),
    EndSubDocument(Ending),
    StartGroup(StartGroup),
    EndGroup(Ending),
    TextUnit(TextUnit),
    DocumentPart(DocumentPart),
    Custom(Custom),
    /// Several events produced at once; the pipeline feeds them one by one to the next step
    Multi(Vec<Event>),
    /// Placeholder for an event a step swallowed
    NoOp,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::StartDocument(_) => EventType::StartDocument,
            Event::EndDocument(_) => EventType::EndDocument,
            Event::StartSubDocument(_) => EventType::StartSubDocument,
            Event::EndSubDocument(_) => EventType::EndSubDocument,
            Event::StartGroup(_) => EventType::StartGroup,
            Event::EndGroup(_) => EventType::EndGroup,
            Event::TextUnit(_) => EventType::TextUnit,
            Event::DocumentPart(_) => EventType::DocumentPart,
            Event::Custom(_) => EventType::Custom,
            Event::Multi(_) => EventType::Multi,
            Event::NoOp => EventType::NoOp,
        }
    }

    /// The resource carried by this event, if any
    pub fn resource(&self) -> Option<&dyn Resource> {
        match self {
            Event::StartDocument(r) => Some(r),
            Event::EndDocument(r) | Event::EndSubDocument(r) | Event::EndGroup(r) => Some(r),
            Event::StartSubDocument(r) => Some(r),
            Event::StartGroup(r) => Some(r),
            Event::TextUnit(r) => Some(r),
            Event::DocumentPart(r) => Some(r),
            Event::Custom(r) => Some(r),
            Event::Multi(_) | Event::NoOp => None,
        }
    }

    /// Mutable access to the resource carried by this event, if any
    pub fn resource_mut(&mut self) -> Option<&mut dyn Resource> {
        match self {
            Event::StartDocument(r) => Some(r),
            Event::EndDocument(r) | Event::EndSubDocument(r) | Event::EndGroup(r) => Some(r),
            Event::StartSubDocument(r) => Some(r),
            Event::StartGroup(r) => Some(r),
            Event::TextUnit(r) => Some(r),
            Event::DocumentPart(r) => Some(r),
            Event::Custom(r) => Some(r),
            Event::Multi(_) | Event::NoOp => None,
        }
    }

    /// Id of the carried resource
    pub fn id(&self) -> Option<&str> {
        self.resource().map(|r| r.id())
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.resource().and_then(|r| r.skeleton())
    }

    pub fn annotations(&self) -> Option<&Annotations> {
        self.resource().map(|r| r.annotations())
    }

    pub fn is_text_unit(&self) -> bool {
        matches!(self, Event::TextUnit(_))
    }

    pub fn as_text_unit(&self) -> Option<&TextUnit> {
        match self {
            Event::TextUnit(tu) => Some(tu),
            _ => None,
        }
    }

    pub fn as_text_unit_mut(&mut self) -> Option<&mut TextUnit> {
        match self {
            Event::TextUnit(tu) => Some(tu),
            _ => None,
        }
    }

    /// Whether the event opens a nesting level (document, sub-document or group)
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            Event::StartDocument(_) | Event::StartSubDocument(_) | Event::StartGroup(_)
        )
    }

    /// Whether the event closes a nesting level
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            Event::EndDocument(_) | Event::EndSubDocument(_) | Event::EndGroup(_)
        )
    }
}

impl From<TextUnit> for Event {
    fn from(tu: TextUnit) -> Self {
        Event::TextUnit(tu)
    }
}

impl From<DocumentPart> for Event {
    fn from(dp: DocumentPart) -> Self {
        Event::DocumentPart(dp)
    }
}
