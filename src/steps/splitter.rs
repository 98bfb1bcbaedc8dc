/*!
 * Document splitting and joining.
 *
 * A document is cut between its top-level blocks: a single event at the
 * document level, or a whole group or sub-document. Every part is a complete
 * event stream of its own. The first part keeps the byte-order mark and the
 * skeleton of the StartDocument, and the last one keeps the skeleton of the
 * EndDocument, so writing the parts one after the other gives back the
 * original bytes.
 *
 * Referents are not moved across parts: a reference must be in the same
 * part as its referent.
 */

use log::{debug, info};
use std::any::Any;
use std::path::{Path, PathBuf};

use crate::errors::{ConfigurationError, StepError};
use crate::locale::LocaleId;
use crate::params::{ParameterSchema, Parameters};
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::resource::{Ending, Event, StartDocument};
use crate::skeleton::{write_events, FilterWriter, SkeletonWriter};

pub const STEP_NAME: &str = "document_splitter";

const DEFAULT_PARTS: usize = 2;

/// Split the events of one document into `count` parts, or one part per
/// block when there are fewer blocks than that
///
/// Returns the events unchanged as a single part when they do not start with
/// a StartDocument and end with an EndDocument.
pub fn split_events(events: Vec<Event>, count: usize) -> Vec<Vec<Event>> {
    let (start, blocks, ending) = match into_blocks(events) {
        Ok(parsed) => parsed,
        Err(events) => return vec![events],
    };
    let count = count.clamp(1, blocks.len().max(1));
    // Every part gets len / count blocks, the first len % count parts one more
    let base = blocks.len() / count;
    let extra = blocks.len() % count;

    let mut chunks: Vec<Vec<Vec<Event>>> = Vec::with_capacity(count);
    let mut blocks = blocks.into_iter();
    for i in 0..count {
        let size = base + usize::from(i < extra);
        chunks.push(blocks.by_ref().take(size).collect());
    }

    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut part = Vec::new();
            part.push(Event::StartDocument(part_start(&start, i == 0)));
            part.extend(chunk.into_iter().flatten());
            part.push(Event::EndDocument(part_end(&ending, i == last)));
            part
        })
        .collect()
}

/// Join parts made by `split_events` back into one document
pub fn join_parts(parts: Vec<Vec<Event>>) -> Vec<Event> {
    let count = parts.len();
    let mut joined = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        let last_index = part.len().saturating_sub(1);
        for (j, event) in part.into_iter().enumerate() {
            let keep = match event {
                Event::StartDocument(_) => i == 0 && j == 0,
                Event::EndDocument(_) => i + 1 == count && j == last_index,
                _ => true,
            };
            if keep {
                joined.push(event);
            }
        }
    }
    joined
}

type Blocks = (StartDocument, Vec<Vec<Event>>, Ending);

fn into_blocks(mut events: Vec<Event>) -> Result<Blocks, Vec<Event>> {
    let well_formed = matches!(events.first(), Some(Event::StartDocument(_)))
        && matches!(events.last(), Some(Event::EndDocument(_)))
        && events.len() >= 2;
    if !well_formed {
        return Err(events);
    }
    let Some(Event::EndDocument(ending)) = events.pop() else {
        return Err(events);
    };
    let mut events = events.into_iter();
    let Some(Event::StartDocument(start)) = events.next() else {
        return Err(Vec::new());
    };

    let mut blocks = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    for event in events {
        match event {
            Event::StartGroup(_) | Event::StartSubDocument(_) => depth += 1,
            Event::EndGroup(_) | Event::EndSubDocument(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(event);
        if depth == 0 {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    Ok((start, blocks, ending))
}

fn part_start(start: &StartDocument, first: bool) -> StartDocument {
    let mut copy = start.clone();
    if !first {
        copy.has_bom = false;
        copy.skeleton = None;
    }
    copy
}

fn part_end(ending: &Ending, last: bool) -> Ending {
    let mut copy = ending.clone();
    if !last {
        copy.skeleton = None;
    }
    copy
}

fn part_path(dir: &Path, name: &str, index: usize) -> PathBuf {
    let file = Path::new(name);
    let stem = file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| name.to_string());
    let file_name = match file.extension() {
        Some(ext) => format!("{}.part{}.{}", stem, index + 1, ext.to_string_lossy()),
        None => format!("{}.part{}", stem, index + 1),
    };
    dir.join(file_name)
}

/// Splits each document into parts, optionally saved as separate files
#[derive(Debug)]
pub struct DocumentSplitterStep {
    parts: usize,
    output_dir: Option<PathBuf>,
    target_locale: Option<LocaleId>,
    item_target: Option<LocaleId>,
    item_name: String,
    buffer: Vec<Event>,
    last_parts: Vec<Vec<Event>>,
}

impl Default for DocumentSplitterStep {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSplitterStep {
    pub fn new() -> Self {
        Self {
            parts: DEFAULT_PARTS,
            output_dir: None,
            target_locale: None,
            item_target: None,
            item_name: String::new(),
            buffer: Vec::new(),
            last_parts: Vec::new(),
        }
    }

    /// Parts of the last complete document
    pub fn parts(&self) -> &[Vec<Event>] {
        &self.last_parts
    }

    fn save_parts(&self, dir: &Path) -> Result<(), StepError> {
        for (i, part) in self.last_parts.iter().enumerate() {
            let path = part_path(dir, &self.item_name, i);
            let mut writer = SkeletonWriter::for_locale(self.item_target.clone());
            writer.set_output_path(path.clone());
            write_events(&mut writer, part)?;
            debug!("Part {} written to {}", i + 1, path.display());
        }
        Ok(())
    }
}

impl Step for DocumentSplitterStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Split each document into parts at its top-level blocks"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(STEP_NAME)
            .integer("parts", DEFAULT_PARTS as i64, "Number of parts per document")
            .string("output_dir", "", "Directory where parts are written (empty for none)")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        let parts = resolved.get_i64("parts").unwrap_or(DEFAULT_PARTS as i64);
        self.parts = usize::try_from(parts)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| ConfigurationError::InvalidParameter {
                owner: STEP_NAME.to_string(),
                key: "parts".to_string(),
                expected: "a number above 0".to_string(),
            })?;
        self.output_dir = resolved
            .get_str("output_dir")
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);
        Ok(())
    }

    fn set_target_locale(&mut self, locale: Option<&LocaleId>) {
        self.target_locale = locale.cloned();
    }

    fn start_batch_item(&mut self, context: &mut BatchItemContext) -> Result<(), StepError> {
        self.item_target = context.target_locale.clone().or_else(|| self.target_locale.clone());
        self.item_name = context.name.clone();
        self.buffer.clear();
        self.last_parts.clear();
        Ok(())
    }

    fn handle(&mut self, event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        let is_end = matches!(event, Event::EndDocument(_));
        self.buffer.push(event);
        if !is_end {
            return Ok(Event::NoOp);
        }

        let events = std::mem::take(&mut self.buffer);
        self.last_parts = split_events(events.clone(), self.parts);
        info!("{} split into {} part(s)", self.item_name, self.last_parts.len());
        if let Some(dir) = &self.output_dir {
            self.save_parts(dir)?;
        }
        Ok(Event::Multi(events))
    }

    fn cancel(&mut self) {
        self.buffer.clear();
    }

    fn destroy(&mut self) {
        self.buffer.clear();
        self.last_parts.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
