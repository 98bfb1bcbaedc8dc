/*!
 * Filters: turning documents into events.
 *
 * A filter reads one raw document at a time and produces its events lazily,
 * one per call, always starting with a StartDocument and ending with an
 * EndDocument. Filters are single-use per document: once closed they must be
 * opened again before iterating.
 *
 * - `base`: state machine and event building shared by the concrete filters
 * - `code_finder`: regex rules turning spans of extracted text into inline codes
 * - `compound`: one filter dispatching to sub-filters by configuration id
 * - `plaintext`: line, paragraph and regex based plain text filters
 * - `ini`: INI files, sections as groups and values as text units
 * - `mapper`: registry of all filter configurations
 */

pub mod base;
pub mod code_finder;
pub mod compound;
pub mod ini;
pub mod mapper;
pub mod plaintext;

pub use base::{EventBuilder, FilterCore, FilterState};
pub use code_finder::CodeFinder;
pub use compound::CompoundFilter;
pub use ini::IniFilter;
pub use mapper::FilterConfigurationMapper;
pub use plaintext::{LineFilter, ParagraphFilter, RegexFilter};

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};

use crate::errors::{ConfigurationError, FilterError};
use crate::params::{ParameterSchema, Parameters};
use crate::resource::{Event, RawDocument};
use crate::skeleton::FilterWriter;

/// A named, predefined setup of a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfiguration {
    /// Configuration id, e.g. `okf_plaintext`
    pub id: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    /// File extensions handled by default, with the leading dot
    pub extensions: Vec<String>,
}

impl FilterConfiguration {
    pub fn new(id: &str, name: &str, description: &str, mime_type: &str, extensions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: mime_type.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Common trait for all filters
///
/// States go Closed, then Open (iterating), then Closed again. Iterating a
/// closed filter is an `IllegalState` error.
pub trait Filter: Debug {
    /// Name of the filter
    fn name(&self) -> &str;

    /// MIME type of the documents the filter reads
    fn mime_type(&self) -> &str;

    /// Predefined configurations of this filter
    fn configurations(&self) -> Vec<FilterConfiguration>;

    /// Parameters the filter accepts
    fn parameter_schema(&self) -> ParameterSchema;

    /// Set the filter parameters, validated against the schema
    ///
    /// # Arguments
    /// * `params` - Parameter values; missing keys keep their defaults
    ///
    /// # Returns
    /// * `Result<(), ConfigurationError>` - Ok, or an error for unknown keys or wrong types
    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError>;

    /// Open a document and get ready to produce its events
    ///
    /// # Returns
    /// * `Result<(), FilterError>` - `MalformedInput` if the document cannot be read or decoded
    fn open(&mut self, document: &RawDocument) -> Result<(), FilterError>;

    /// Whether another event is available
    fn has_next(&mut self) -> Result<bool, FilterError>;

    /// Produce the next event
    fn next(&mut self) -> Result<Event, FilterError>;

    /// Request early termination: the next event is a final EndDocument
    fn cancel(&mut self);

    /// Release the document; calling it more than once has no effect
    fn close(&mut self);

    /// Create the writer that rebuilds documents of this format
    fn create_skeleton_writer(&self) -> Box<dyn FilterWriter>;
}

/// Closes the wrapped filter when dropped
///
/// Guarantees `close()` on every exit path of the code using the filter.
#[derive(Debug)]
pub struct FilterGuard<'a> {
    filter: &'a mut dyn Filter,
}

impl<'a> FilterGuard<'a> {
    /// Open a document on the filter and guard it
    pub fn open(filter: &'a mut dyn Filter, document: &RawDocument) -> Result<Self, FilterError> {
        if let Err(e) = filter.open(document) {
            filter.close();
            return Err(e);
        }
        Ok(Self { filter })
    }
}

impl<'a> Deref for FilterGuard<'a> {
    type Target = dyn Filter + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.filter
    }
}

impl DerefMut for FilterGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.filter
    }
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        self.filter.close();
    }
}

/// Read all the events of a document
pub fn extract_events(filter: &mut dyn Filter, document: &RawDocument) -> Result<Vec<Event>, FilterError> {
    let mut guard = FilterGuard::open(filter, document)?;
    let mut events = Vec::new();
    while guard.has_next()? {
        events.push(guard.next()?);
    }
    Ok(events)
}
