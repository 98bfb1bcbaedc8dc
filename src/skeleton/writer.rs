/*!
 * Writers: turning events back into a document.
 *
 * The skeleton writer concatenates the skeleton parts of every event in
 * order. Literal parts are written verbatim. Reference parts are replaced by
 * the current content of the referenced resource: the target for the output
 * locale when there is one, the source otherwise, with each inline code
 * rendered by its original data.
 *
 * Resources flagged as referents are not written where they appear. They are
 * stored and written wherever a later skeleton references their id.
 */

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use log::{debug, trace};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use super::{Skeleton, SkeletonPart};
use crate::errors::WriterError;
use crate::locale::LocaleId;
use crate::resource::{Event, TextFragment, TextUnit};

/// Deepest chain of referents followed before giving up
const MAX_REFERENT_DEPTH: usize = 32;

/// Common trait for all writers
///
/// A writer receives the events of one document, in order, and produces the
/// output document. Events are borrowed: the writer never takes ownership of
/// what flows through the pipeline.
pub trait FilterWriter: std::fmt::Debug {
    /// Name of the writer
    fn name(&self) -> &str;

    /// Set the locale whose targets are written
    ///
    /// # Arguments
    /// * `locale` - Output locale; `None` writes the source content
    fn set_output_locale(&mut self, locale: Option<LocaleId>);

    /// Force the output encoding instead of reusing the input one
    fn set_output_encoding(&mut self, encoding: Option<String>);

    /// Write the document to a file when it is complete
    fn set_output_path(&mut self, path: PathBuf);

    /// Handle one event
    ///
    /// # Arguments
    /// * `event` - The event to write
    ///
    /// # Returns
    /// * `Result<(), WriterError>` - Ok, or an error if the event cannot be written
    fn handle_event(&mut self, event: &Event) -> Result<(), WriterError>;

    /// Finish the document; calling it more than once has no effect
    fn close(&mut self) -> Result<(), WriterError>;

    /// Take the bytes of the last completed document
    fn take_output(&mut self) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Waiting for a StartDocument
    Idle,
    /// Inside a document
    Writing,
    /// EndDocument seen or closed
    Done,
}

/// Generic writer for skeleton-based formats
#[derive(Debug)]
pub struct SkeletonWriter {
    output_locale: Option<LocaleId>,
    forced_encoding: Option<String>,
    output_path: Option<PathBuf>,
    encoding: &'static Encoding,
    write_bom: bool,
    text: String,
    output: Vec<u8>,
    referents: HashMap<String, Event>,
    state: WriterState,
}

impl Default for SkeletonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonWriter {
    pub fn new() -> Self {
        Self {
            output_locale: None,
            forced_encoding: None,
            output_path: None,
            encoding: UTF_8,
            write_bom: false,
            text: String::new(),
            output: Vec::new(),
            referents: HashMap::new(),
            state: WriterState::Idle,
        }
    }

    /// Create a writer for the given output locale
    pub fn for_locale(locale: Option<LocaleId>) -> Self {
        let mut writer = Self::new();
        writer.output_locale = locale;
        writer
    }

    /// Name of the encoding used for the current document
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    fn start_document(&mut self, event: &Event) -> Result<(), WriterError> {
        let Event::StartDocument(sd) = event else {
            return Err(WriterError::IllegalState(format!(
                "Expected START_DOCUMENT, got {}",
                event.event_type()
            )));
        };

        let label = self.forced_encoding.as_deref().unwrap_or(&sd.encoding);
        self.encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| WriterError::UnknownEncoding(label.to_string()))?;
        self.write_bom = sd.has_bom;
        self.text.clear();
        self.output.clear();
        self.referents.clear();
        self.state = WriterState::Writing;
        debug!(
            "Writing document {} as {} (locale: {})",
            sd.id,
            self.encoding.name(),
            self.output_locale
                .as_ref()
                .map(|l| l.as_str())
                .unwrap_or("source")
        );
        self.write_resource(event, 0)
    }

    fn write_resource(&mut self, event: &Event, depth: usize) -> Result<(), WriterError> {
        let Some(skeleton) = event.skeleton() else {
            // Text units without skeleton are written as bare content
            if let Event::TextUnit(tu) = event {
                let content = self.render_unit(tu, None);
                self.text.push_str(&content);
            }
            return Ok(());
        };
        let rendered = self.render_skeleton(skeleton, event, depth)?;
        self.text.push_str(&rendered);
        Ok(())
    }

    fn render_skeleton(&self, skeleton: &Skeleton, owner: &Event, depth: usize) -> Result<String, WriterError> {
        let mut out = String::new();
        for part in skeleton.parts() {
            match part {
                SkeletonPart::Literal(text) => out.push_str(text),
                SkeletonPart::Reference { id, locale } => {
                    if owner.id() == Some(id.as_str()) {
                        if let Event::TextUnit(tu) = owner {
                            out.push_str(&self.render_unit(tu, locale.as_ref()));
                        }
                        continue;
                    }
                    let referent = self
                        .referents
                        .get(id)
                        .ok_or_else(|| WriterError::UnresolvedReference(id.clone()))?;
                    if depth >= MAX_REFERENT_DEPTH {
                        return Err(WriterError::UnresolvedReference(format!(
                            "{} (referent chain too deep)",
                            id
                        )));
                    }
                    trace!("Resolving referent {}", id);
                    match referent.skeleton() {
                        Some(skel) => out.push_str(&self.render_skeleton(skel, referent, depth + 1)?),
                        None => {
                            if let Event::TextUnit(tu) = referent {
                                out.push_str(&self.render_unit(tu, locale.as_ref()));
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Current content of a unit for the output locale (or the given one)
    fn render_unit(&self, tu: &TextUnit, locale: Option<&LocaleId>) -> String {
        let locale = locale.or(self.output_locale.as_ref());
        let source = tu.source().content();
        let content = tu.content_for(locale);
        render_content(content, source)
    }

    fn finish(&mut self) -> Result<(), WriterError> {
        if self.state != WriterState::Writing {
            return Ok(());
        }
        self.state = WriterState::Done;
        self.output = encode(&self.text, self.encoding, self.write_bom)?;
        self.text.clear();
        self.referents.clear();

        if let Some(path) = &self.output_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, &self.output)?;
            debug!("Wrote {} bytes to {}", self.output.len(), path.display());
        }
        Ok(())
    }
}

impl FilterWriter for SkeletonWriter {
    fn name(&self) -> &str {
        "skeleton_writer"
    }

    fn set_output_locale(&mut self, locale: Option<LocaleId>) {
        self.output_locale = locale;
    }

    fn set_output_encoding(&mut self, encoding: Option<String>) {
        self.forced_encoding = encoding;
    }

    fn set_output_path(&mut self, path: PathBuf) {
        self.output_path = Some(path);
    }

    fn handle_event(&mut self, event: &Event) -> Result<(), WriterError> {
        match (self.state, event) {
            (_, Event::NoOp) => Ok(()),
            (_, Event::Multi(events)) => {
                for inner in events {
                    self.handle_event(inner)?;
                }
                Ok(())
            }
            (WriterState::Idle | WriterState::Done, Event::StartDocument(_)) => self.start_document(event),
            (WriterState::Writing, Event::EndDocument(_)) => {
                self.write_resource(event, 0)?;
                self.finish()
            }
            (WriterState::Writing, _) => {
                let referent = match event {
                    Event::TextUnit(tu) => tu.referent,
                    Event::DocumentPart(dp) => dp.referent,
                    _ => false,
                };
                if referent {
                    if let Some(id) = event.id() {
                        self.referents.insert(id.to_string(), event.clone());
                    }
                    return Ok(());
                }
                self.write_resource(event, 0)
            }
            (state, _) => Err(WriterError::IllegalState(format!(
                "Cannot write {} in state {:?}",
                event.event_type(),
                state
            ))),
        }
    }

    fn close(&mut self) -> Result<(), WriterError> {
        self.finish()
    }

    fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

/// Write a complete list of events and return the output bytes
pub fn write_events(writer: &mut dyn FilterWriter, events: &[Event]) -> Result<Vec<u8>, WriterError> {
    for event in events {
        writer.handle_event(event)?;
    }
    writer.close()?;
    Ok(writer.take_output())
}

/// Render a fragment with original code data
///
/// Codes of a target without data take the data of the source code with the
/// same id and tag type.
pub fn render_content(content: &TextFragment, source: &TextFragment) -> String {
    content.render_with(|code| {
        if code.has_data() {
            Cow::Borrowed(code.data.as_str())
        } else {
            source
                .code_by_id(code.id, code.tag_type)
                .map(|c| Cow::Borrowed(c.data.as_str()))
                .unwrap_or(Cow::Borrowed(""))
        }
    })
}

/// Encode text, failing on characters the encoding cannot represent
pub fn encode(text: &str, encoding: &'static Encoding, bom: bool) -> Result<Vec<u8>, WriterError> {
    let mut bytes = Vec::with_capacity(text.len() + 3);

    // encoding_rs only decodes UTF-16, encoding it is done by hand
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let little = encoding == UTF_16LE;
        if bom {
            bytes.extend_from_slice(if little { &[0xFF, 0xFE] } else { &[0xFE, 0xFF] });
        }
        for unit in text.encode_utf16() {
            let pair = if little { unit.to_le_bytes() } else { unit.to_be_bytes() };
            bytes.extend_from_slice(&pair);
        }
        return Ok(bytes);
    }

    if bom && encoding == UTF_8 {
        bytes.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
    }
    let (encoded, _, unmappable) = encoding.encode(text);
    if unmappable {
        let sample = text
            .chars()
            .find(|ch| {
                let mut buf = [0u8; 4];
                encoding.encode(ch.encode_utf8(&mut buf)).2
            })
            .map(String::from)
            .unwrap_or_default();
        return Err(WriterError::Unmappable {
            encoding: encoding.name().to_string(),
            sample,
        });
    }
    bytes.extend_from_slice(&encoded);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Ending, StartDocument, TagType, TextContainer, code::types};
    use crate::resource::annotation::Annotations;

    fn start(encoding: &str, bom: bool) -> Event {
        Event::StartDocument(StartDocument {
            id: "sd1".into(),
            name: None,
            locale: LocaleId::new("en").unwrap(),
            encoding: encoding.into(),
            has_bom: bom,
            line_break: "\n".into(),
            mime_type: "text/plain".into(),
            filter_id: "test".into(),
            multilingual: false,
            skeleton: None,
            annotations: Annotations::new(),
        })
    }

    fn end() -> Event {
        Event::EndDocument(Ending::new("ed1"))
    }

    fn unit_with_skeleton(id: &str, text: &str, before: &str, after: &str) -> TextUnit {
        let mut tu = TextUnit::from_text(id, text);
        let mut skel = Skeleton::from_literal(before);
        skel.add_reference(id);
        skel.append(after);
        tu.skeleton = Some(skel);
        tu
    }

    #[test]
    fn test_writer_handleEvent_shouldPreferTargetForOutputLocale() {
        let fr = LocaleId::new("fr").unwrap();
        let mut tu = unit_with_skeleton("tu1", "Hello", "<p>", "</p>\n");
        tu.set_target(fr.clone(), TextContainer::from_text("Bonjour"));

        let mut writer = SkeletonWriter::for_locale(Some(fr));
        writer.handle_event(&start("UTF-8", false)).unwrap();
        writer.handle_event(&Event::TextUnit(tu.clone())).unwrap();
        writer.handle_event(&end()).unwrap();
        assert_eq!(writer.take_output(), b"<p>Bonjour</p>\n");

        let mut writer = SkeletonWriter::for_locale(Some(LocaleId::new("de").unwrap()));
        writer.handle_event(&start("UTF-8", false)).unwrap();
        writer.handle_event(&Event::TextUnit(tu)).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.take_output(), b"<p>Hello</p>\n");
    }

    #[test]
    fn test_writer_targetCodeWithoutData_shouldUseSourceData() {
        let fr = LocaleId::new("fr").unwrap();
        let mut source = TextFragment::from_text("a");
        source.append_code(TagType::Placeholder, types::LB, "<br/>").unwrap();
        let mut tu = TextUnit::new("tu1", source);
        let mut skel = Skeleton::new();
        skel.add_reference("tu1");
        tu.skeleton = Some(skel);

        let mut target = TextFragment::from_text("b");
        target.append_existing(crate::resource::Code::new(TagType::Placeholder, 0, types::LB, "")).unwrap();
        tu.set_target_content(fr.clone(), target);

        let mut writer = SkeletonWriter::for_locale(Some(fr));
        writer.handle_event(&start("UTF-8", false)).unwrap();
        writer.handle_event(&Event::TextUnit(tu)).unwrap();
        writer.handle_event(&end()).unwrap();
        assert_eq!(writer.take_output(), b"b<br/>");
    }

    #[test]
    fn test_writer_referent_shouldBeWrittenWhereReferenced() {
        let mut referent = TextUnit::from_text("tu1", "alt text");
        referent.referent = true;
        let mut holder = crate::resource::DocumentPart::new("dp1", Skeleton::from_literal("<img alt=\""));
        if let Some(skel) = holder.skeleton.as_mut() {
            skel.add_reference("tu1");
            skel.append("\"/>");
        }

        let mut writer = SkeletonWriter::new();
        writer.handle_event(&start("UTF-8", false)).unwrap();
        writer.handle_event(&Event::TextUnit(referent)).unwrap();
        writer.handle_event(&Event::DocumentPart(holder)).unwrap();
        writer.handle_event(&end()).unwrap();
        assert_eq!(writer.take_output(), b"<img alt=\"alt text\"/>");
    }

    #[test]
    fn test_writer_unknownReference_shouldFail() {
        let holder = crate::resource::DocumentPart::new("dp1", {
            let mut skel = Skeleton::new();
            skel.add_reference("missing");
            skel
        });
        let mut writer = SkeletonWriter::new();
        writer.handle_event(&start("UTF-8", false)).unwrap();
        let err = writer.handle_event(&Event::DocumentPart(holder)).unwrap_err();
        assert!(matches!(err, WriterError::UnresolvedReference(id) if id == "missing"));
    }

    #[test]
    fn test_writer_withoutStartDocument_shouldBeIllegalState() {
        let mut writer = SkeletonWriter::new();
        let tu = Event::TextUnit(TextUnit::from_text("tu1", "x"));
        assert!(matches!(writer.handle_event(&tu), Err(WriterError::IllegalState(_))));
    }

    #[test]
    fn test_encode_shouldWriteBomAndDetectUnmappable() {
        assert_eq!(encode("a", UTF_8, true).unwrap(), vec![0xEF, 0xBB, 0xBF, b'a']);
        assert_eq!(encode("a", UTF_16LE, true).unwrap(), vec![0xFF, 0xFE, b'a', 0]);
        assert_eq!(encode("a", UTF_16BE, false).unwrap(), vec![0, b'a']);

        let latin1 = Encoding::for_label(b"iso-8859-1").unwrap();
        assert_eq!(encode("caf\u{e9}", latin1, false).unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        let err = encode("x\u{0430}", latin1, false).unwrap_err();
        assert!(matches!(err, WriterError::Unmappable { sample, .. } if sample == "\u{0430}"));
    }
}
