/*!
 * The resource model shared by filters, steps and writers.
 *
 * - `code` / `fragment`: text with inline codes
 * - `container`: containers and text units (source plus targets per locale)
 * - `annotation`: typed metadata attached to resources and containers
 * - `event`: the events a filter produces and the resources they carry
 * - `raw_document`: filter input (bytes or file, encoding, locales)
 */

pub mod annotation;
pub mod code;
pub mod container;
pub mod event;
pub mod fragment;
pub mod raw_document;

pub use annotation::{Annotation, AnnotationKind, Annotations, UnbalancedCodeWarning};
pub use code::{Code, TagType};
pub use container::{TextContainer, TextUnit};
pub use event::{
    Custom, DocumentPart, Ending, Event, EventType, Resource, StartDocument, StartGroup,
    StartSubDocument,
};
pub use fragment::{Piece, TextFragment};
pub use raw_document::{DecodedText, RawDocument, RawInput};
