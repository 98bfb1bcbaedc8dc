/*!
 * Shared machinery of the concrete filters.
 *
 * `EventBuilder` turns "this span is skeleton, this span is text" calls into
 * properly nested events with unique ids. Literal text waiting to be attached
 * to a resource is kept as a pending skeleton; it becomes the prefix of the
 * next resource's skeleton, so the concatenation of all skeletons follows the
 * document order.
 *
 * `FilterCore` holds the open/closed state machine, the cancellation flag and
 * the queue of built events. Concrete filters read their input in chunks,
 * only when the queue runs dry.
 */

use log::{debug, trace};
use std::collections::VecDeque;

use crate::errors::FilterError;
use crate::resource::{
    Annotations, DecodedText, DocumentPart, Ending, Event, RawDocument, StartDocument, StartGroup,
    StartSubDocument, TextFragment, TextUnit,
};
use crate::skeleton::Skeleton;

/// Nesting level opened by the builder
#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Group(String),
    SubDocument(String),
}

/// Builds the events of one document
#[derive(Debug, Default)]
pub struct EventBuilder {
    queue: VecDeque<Event>,
    pending: Skeleton,
    levels: Vec<Level>,
    document_id: String,
    mime_type: Option<String>,
    tu_count: usize,
    dp_count: usize,
    group_count: usize,
    sub_count: usize,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, ready for a new document
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Queue the StartDocument; ids of its resources restart from 1
    pub fn start_document(&mut self, start: StartDocument) {
        self.reset();
        self.document_id = start.id.clone();
        self.mime_type = Some(start.mime_type.clone());
        self.queue.push_back(Event::StartDocument(start));
    }

    /// Add literal text to the pending skeleton
    pub fn add_skeleton(&mut self, text: &str) {
        self.pending.append(text);
    }

    /// Whether literal text is waiting for a resource
    pub fn has_pending_skeleton(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queue a text unit whose skeleton is the pending literal plus a reference to itself
    ///
    /// Unbalanced codes in the content are recorded as an annotation.
    /// Returns the id of the new unit.
    pub fn add_text_unit(&mut self, content: TextFragment, name: Option<&str>) -> String {
        self.tu_count += 1;
        let id = format!("tu{}", self.tu_count);

        let mut skeleton = std::mem::take(&mut self.pending);
        skeleton.add_reference(&id);

        let mut tu = TextUnit::new(&id, content);
        tu.name = name.map(str::to_string);
        tu.mime_type = self.mime_type.clone();
        tu.skeleton = Some(skeleton);
        if !tu.check_balance() {
            debug!("Text unit {} has unbalanced codes", id);
        }
        trace!("Text unit {}: {:?}", id, tu.source().content().to_text());
        self.queue.push_back(Event::TextUnit(tu));
        id
    }

    /// The last queued event, if it is a text unit
    pub fn last_text_unit_mut(&mut self) -> Option<&mut TextUnit> {
        self.queue.back_mut().and_then(Event::as_text_unit_mut)
    }

    /// Queue a document part holding the pending literal followed by `text`
    pub fn add_document_part(&mut self, text: &str) -> String {
        self.dp_count += 1;
        let id = format!("dp{}", self.dp_count);
        let mut skeleton = std::mem::take(&mut self.pending);
        skeleton.append(text);
        self.queue.push_back(Event::DocumentPart(DocumentPart::new(&id, skeleton)));
        id
    }

    /// Move the pending literal, if any, into its own document part
    pub fn flush_pending(&mut self) {
        if self.has_pending_skeleton() {
            self.add_document_part("");
        }
    }

    fn parent_id(&self) -> String {
        match self.levels.last() {
            Some(Level::Group(id)) | Some(Level::SubDocument(id)) => id.clone(),
            None => self.document_id.clone(),
        }
    }

    fn take_pending(&mut self) -> Option<Skeleton> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Open a group; its skeleton is the pending literal followed by `text`
    pub fn start_group(&mut self, name: Option<&str>, group_type: Option<&str>, text: &str) -> String {
        self.group_count += 1;
        let id = format!("g{}", self.group_count);
        self.pending.append(text);
        let group = StartGroup {
            id: id.clone(),
            name: name.map(str::to_string),
            parent_id: self.parent_id(),
            group_type: group_type.map(str::to_string),
            referent: false,
            skeleton: self.take_pending(),
            annotations: Annotations::new(),
        };
        self.levels.push(Level::Group(id.clone()));
        self.queue.push_back(Event::StartGroup(group));
        id
    }

    /// Close the innermost group; its skeleton is the pending literal followed by `text`
    pub fn end_group(&mut self, text: &str) -> Result<(), FilterError> {
        match self.levels.last() {
            Some(Level::Group(id)) => {
                let end_id = format!("{}e", id);
                self.levels.pop();
                self.pending.append(text);
                let mut ending = Ending::new(&end_id);
                ending.skeleton = self.take_pending();
                self.queue.push_back(Event::EndGroup(ending));
                Ok(())
            }
            _ => Err(FilterError::IllegalState("No group to close".to_string())),
        }
    }

    /// Number of groups and sub-documents currently open
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Open an embedded document
    pub fn start_sub_document(&mut self, name: Option<&str>) -> String {
        self.sub_count += 1;
        let id = format!("sd{}", self.sub_count);
        let sub = StartSubDocument {
            id: id.clone(),
            name: name.map(str::to_string),
            parent_id: self.document_id.clone(),
            skeleton: self.take_pending(),
            annotations: Annotations::new(),
        };
        self.levels.push(Level::SubDocument(id.clone()));
        self.queue.push_back(Event::StartSubDocument(sub));
        id
    }

    /// Close the innermost embedded document
    pub fn end_sub_document(&mut self) -> Result<(), FilterError> {
        match self.levels.last() {
            Some(Level::SubDocument(id)) => {
                let end_id = format!("{}e", id);
                self.levels.pop();
                let mut ending = Ending::new(&end_id);
                ending.skeleton = self.take_pending();
                self.queue.push_back(Event::EndSubDocument(ending));
                Ok(())
            }
            _ => Err(FilterError::IllegalState("No sub-document to close".to_string())),
        }
    }

    /// Close every open level and queue the EndDocument with the pending literal
    pub fn end_document(&mut self) {
        while let Some(level) = self.levels.last().cloned() {
            let closed = match level {
                Level::Group(_) => self.end_group(""),
                Level::SubDocument(_) => self.end_sub_document(),
            };
            if closed.is_err() {
                self.levels.pop();
            }
        }
        let mut ending = Ending::new(&format!("{}e", self.document_id));
        ending.skeleton = self.take_pending();
        self.queue.push_back(Event::EndDocument(ending));
    }

    /// A final EndDocument without skeleton, for cancelled documents
    pub fn synthetic_end(&self) -> Event {
        Event::EndDocument(Ending::new(&format!("{}e", self.document_id)))
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending = Skeleton::new();
        self.levels.clear();
    }
}

/// Lifecycle state of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// No document open
    Closed,
    /// Producing events
    Open,
    /// EndDocument delivered
    Finished,
}

/// State machine shared by the concrete filters
#[derive(Debug)]
pub struct FilterCore {
    pub builder: EventBuilder,
    state: FilterState,
    filter_id: String,
    mime_type: String,
    input_done: bool,
    canceled: bool,
    started: bool,
}

impl FilterCore {
    pub fn new(filter_id: &str, mime_type: &str) -> Self {
        Self {
            builder: EventBuilder::new(),
            state: FilterState::Closed,
            filter_id: filter_id.to_string(),
            mime_type: mime_type.to_string(),
            input_done: false,
            canceled: false,
            started: false,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn filter_id(&self) -> &str {
        &self.filter_id
    }

    pub fn set_filter_id(&mut self, filter_id: &str) {
        self.filter_id = filter_id.to_string();
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Decode the document and queue its StartDocument
    ///
    /// Opening an already open filter closes the previous document first.
    pub fn open(&mut self, document: &RawDocument) -> Result<DecodedText, FilterError> {
        if self.state != FilterState::Closed {
            self.close();
        }
        let decoded = document.decode()?;
        debug!(
            "Opened document {} ({}, {} chars) with {}",
            document.name().unwrap_or_else(|| "<memory>".to_string()),
            decoded.encoding,
            decoded.text.chars().count(),
            self.filter_id
        );

        self.builder.start_document(StartDocument {
            id: "doc1".to_string(),
            name: document.name(),
            locale: document.source_locale().clone(),
            encoding: decoded.encoding.clone(),
            has_bom: decoded.has_bom,
            line_break: decoded.line_break.clone(),
            mime_type: self.mime_type.clone(),
            filter_id: self.filter_id.clone(),
            multilingual: false,
            skeleton: None,
            annotations: Annotations::new(),
        });
        self.state = FilterState::Open;
        self.input_done = false;
        self.canceled = false;
        self.started = false;
        Ok(decoded)
    }

    fn ensure_open(&self) -> Result<(), FilterError> {
        match self.state {
            FilterState::Closed => Err(FilterError::IllegalState("Filter is not open".to_string())),
            FilterState::Open | FilterState::Finished => Ok(()),
        }
    }

    /// Whether the concrete filter must read more input before the next event
    pub fn needs_input(&self) -> Result<bool, FilterError> {
        self.ensure_open()?;
        Ok(self.state == FilterState::Open && !self.canceled && !self.input_done && self.builder.is_empty())
    }

    /// Called by the concrete filter when its input is exhausted
    pub fn finish_input(&mut self) {
        if !self.input_done {
            self.builder.end_document();
            self.input_done = true;
        }
    }

    pub fn has_next(&self) -> Result<bool, FilterError> {
        self.ensure_open()?;
        Ok(self.state == FilterState::Open)
    }

    pub fn next_event(&mut self) -> Result<Event, FilterError> {
        self.ensure_open()?;
        if self.state == FilterState::Finished {
            return Err(FilterError::IllegalState("No more events".to_string()));
        }

        if self.canceled && self.started {
            debug!("Filter {} canceled, ending document", self.filter_id);
            let end = self.builder.synthetic_end();
            self.builder.clear();
            self.state = FilterState::Finished;
            return Ok(end);
        }

        let event = self
            .builder
            .pop()
            .ok_or_else(|| FilterError::IllegalState("No event available".to_string()))?;
        match event {
            Event::StartDocument(_) => self.started = true,
            Event::EndDocument(_) => self.state = FilterState::Finished,
            _ => {}
        }
        Ok(event)
    }

    pub fn cancel(&mut self) {
        if self.state == FilterState::Open {
            self.canceled = true;
        }
    }

    pub fn close(&mut self) {
        if self.state != FilterState::Closed {
            trace!("Closing filter {}", self.filter_id);
        }
        self.builder.clear();
        self.state = FilterState::Closed;
    }
}
