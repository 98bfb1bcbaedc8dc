/*!
 * Text fragments: text interleaved with inline codes.
 *
 * The content is stored as "coded text": plain characters plus two-character
 * markers, one marker character giving the tag type and one character from a
 * private-use plane giving the index of the code in the code list. Steps can
 * move markers around freely (reordering codes for a translation) without ever
 * touching the original markup held by the codes themselves.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use super::code::{Code, TagType};
use crate::errors::FragmentError;

/// Marker character for an opening code
pub const MARKER_OPENING: char = '\u{E101}';
/// Marker character for a closing code
pub const MARKER_CLOSING: char = '\u{E102}';
/// Marker character for a placeholder code
pub const MARKER_PLACEHOLDER: char = '\u{E103}';

/// First index character (supplementary private use area A)
const INDEX_BASE: u32 = 0xF0000;

/// Maximum number of codes a fragment can address
pub const MAX_CODES: usize = 0xFFFD;

/// Regex for generic code notation: `<1>`, `</1>`, `<1/>`, `<b1/>`, `<e1/>`
static GENERIC_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/)?(\d+)(/)?>|<([be])(\d+)/>").expect("Invalid generic code regex")
});

/// Check if a character is one of the code markers
pub fn is_marker(ch: char) -> bool {
    ch == MARKER_OPENING || ch == MARKER_CLOSING || ch == MARKER_PLACEHOLDER
}

fn marker_for(tag_type: TagType) -> char {
    match tag_type {
        TagType::Opening => MARKER_OPENING,
        TagType::Closing => MARKER_CLOSING,
        TagType::Placeholder => MARKER_PLACEHOLDER,
    }
}

fn index_char(index: usize) -> char {
    debug_assert!(index < MAX_CODES, "too many codes in fragment");
    char::from_u32(INDEX_BASE + index as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn char_index(ch: char) -> Option<usize> {
    let value = ch as u32;
    if (INDEX_BASE..INDEX_BASE + MAX_CODES as u32).contains(&value) {
        Some((value - INDEX_BASE) as usize)
    } else {
        None
    }
}

/// One piece of a fragment, in reading order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Piece<'a> {
    /// A run of plain text
    Text(&'a str),
    /// An inline code
    Code(&'a Code),
}

/// Iterator over the pieces of a fragment
pub struct Pieces<'a> {
    fragment: &'a TextFragment,
    pos: usize,
}

impl<'a> Iterator for Pieces<'a> {
    type Item = Piece<'a>;

    fn next(&mut self) -> Option<Piece<'a>> {
        let rest = &self.fragment.coded_text[self.pos..];
        let mut chars = rest.chars();
        let first = chars.next()?;

        if is_marker(first) {
            let index = chars.next()?;
            self.pos += first.len_utf8() + index.len_utf8();
            return char_index(index)
                .and_then(|i| self.fragment.codes.get(i))
                .map(Piece::Code);
        }

        let end = rest.find(is_marker).unwrap_or(rest.len());
        self.pos += end;
        Some(Piece::Text(&rest[..end]))
    }
}

/// Text with inline codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    coded_text: String,
    codes: Vec<Code>,
    next_id: i32,
}

impl TextFragment {
    /// Create an empty fragment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment holding plain text
    pub fn from_text(text: &str) -> Self {
        let mut fragment = Self::new();
        fragment.append_text(text);
        fragment
    }

    /// Append plain text
    pub fn append_text(&mut self, text: &str) -> &mut Self {
        self.coded_text.push_str(text);
        self.invalidate_markers_in_tail(text.len());
        self
    }

    /// Append a new code and return its id
    ///
    /// Opening and placeholder codes get the next free id. A closing code
    /// reuses the id of the last still-open opening code of the same type; if
    /// there is none it gets a fresh id and the fragment becomes unbalanced.
    /// Fails once the fragment already holds `MAX_CODES` codes.
    pub fn append_code(&mut self, tag_type: TagType, code_type: &str, data: &str) -> Result<i32, FragmentError> {
        self.ensure_room(1)?;
        let id = match tag_type {
            TagType::Closing => match self.open_code_id(code_type) {
                Some(id) => id,
                None => self.take_id(),
            },
            _ => self.take_id(),
        };
        self.push_code(Code::new(tag_type, id, code_type, data));
        Ok(id)
    }

    /// Append an existing code, keeping its id
    pub fn append_existing(&mut self, code: Code) -> Result<(), FragmentError> {
        self.ensure_room(1)?;
        self.next_id = self.next_id.max(code.id + 1);
        self.push_code(code);
        Ok(())
    }

    /// Append another fragment, shifting its code ids past the ones already used
    ///
    /// Nothing is appended when the codes of both fragments do not fit together.
    pub fn append_fragment(&mut self, other: &TextFragment) -> Result<(), FragmentError> {
        self.ensure_room(other.codes.len())?;
        let offset = self.next_id;
        for piece in other.pieces() {
            match piece {
                Piece::Text(text) => {
                    self.coded_text.push_str(text);
                }
                Piece::Code(code) => {
                    let mut code = code.clone();
                    code.id += offset;
                    self.push_code(code);
                }
            }
        }
        self.next_id = offset + other.next_id;
        Ok(())
    }

    /// Iterate over text runs and codes in reading order
    pub fn pieces(&self) -> Pieces<'_> {
        Pieces {
            fragment: self,
            pos: 0,
        }
    }

    /// The codes of this fragment
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Find a code by id and tag type
    pub fn code_by_id(&self, id: i32, tag_type: TagType) -> Option<&Code> {
        self.codes
            .iter()
            .find(|c| c.id == id && c.tag_type == tag_type)
    }

    /// The raw coded text, with markers
    pub fn coded_text(&self) -> &str {
        &self.coded_text
    }

    /// Replace the coded text and codes
    ///
    /// Every marker must be complete and point to a code in `codes`, and no
    /// code may be referenced twice. Codes that are not referenced are dropped.
    pub fn set_coded_text(&mut self, coded_text: &str, codes: Vec<Code>) -> Result<(), FragmentError> {
        let mut rebuilt = String::with_capacity(coded_text.len());
        let mut kept = Vec::new();
        let mut seen = HashSet::new();
        let mut chars = coded_text.chars();

        while let Some(ch) = chars.next() {
            if !is_marker(ch) {
                rebuilt.push(ch);
                continue;
            }
            let index = chars
                .next()
                .and_then(char_index)
                .ok_or_else(|| FragmentError::InvalidCodedText("truncated code marker".to_string()))?;
            let code = codes.get(index).ok_or_else(|| {
                FragmentError::InvalidCodedText(format!("code index {} out of range", index))
            })?;
            if !seen.insert(index) {
                return Err(FragmentError::DuplicateCode(code.to_generic()));
            }
            rebuilt.push(marker_for(code.tag_type));
            rebuilt.push(index_char(kept.len()));
            kept.push(code.clone());
        }

        if kept.len() < codes.len() {
            debug!("Dropping {} unreferenced code(s)", codes.len() - kept.len());
        }

        self.next_id = self.next_id.max(kept.iter().map(|c| c.id + 1).max().unwrap_or(0));
        self.coded_text = rebuilt;
        self.codes = kept;
        Ok(())
    }

    /// Plain text, without any code
    pub fn to_text(&self) -> String {
        self.pieces()
            .filter_map(|p| match p {
                Piece::Text(text) => Some(text),
                Piece::Code(_) => None,
            })
            .collect()
    }

    /// Text with each code replaced by its original data
    pub fn to_original(&self) -> String {
        self.render_with(|code| Cow::Borrowed(code.data.as_str()))
    }

    /// Text with each code rendered by the given function
    pub fn render_with<'a, F>(&'a self, mut render: F) -> String
    where
        F: FnMut(&'a Code) -> Cow<'a, str>,
    {
        let mut out = String::with_capacity(self.coded_text.len());
        for piece in self.pieces() {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Code(code) => out.push_str(&render(code)),
            }
        }
        out
    }

    /// Text with codes in generic notation (`<0>bold</0>`, `<1/>`)
    pub fn to_generic(&self) -> String {
        self.render_with(|code| Cow::Owned(code.to_generic()))
    }

    /// Rebuild the content from generic notation, reusing this fragment's codes
    ///
    /// Codes may be moved or removed, but not invented or duplicated.
    pub fn update_from_generic(&mut self, generic: &str) -> Result<(), FragmentError> {
        let mut coded = String::with_capacity(generic.len());
        let mut codes = Vec::new();
        let mut used = HashSet::new();
        let mut last = 0;

        for caps in GENERIC_CODE_REGEX.captures_iter(generic) {
            let whole = caps.get(0).map(|m| (m.start(), m.end(), m.as_str())).unwrap_or_default();
            coded.push_str(&generic[last..whole.0]);
            last = whole.1;

            let (tag_type, id_text) = match caps.get(4) {
                Some(kind) => {
                    let tag_type = if kind.as_str() == "b" {
                        TagType::Opening
                    } else {
                        TagType::Closing
                    };
                    (tag_type, caps.get(5))
                }
                None => {
                    let tag_type = match (caps.get(1).is_some(), caps.get(3).is_some()) {
                        (false, false) => TagType::Opening,
                        (true, false) => TagType::Closing,
                        (false, true) => TagType::Placeholder,
                        (true, true) => return Err(FragmentError::UnknownCode(whole.2.to_string())),
                    };
                    (tag_type, caps.get(2))
                }
            };

            let id: i32 = id_text
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| FragmentError::UnknownCode(whole.2.to_string()))?;
            let code = self
                .code_by_id(id, tag_type)
                .ok_or_else(|| FragmentError::UnknownCode(whole.2.to_string()))?;
            if !used.insert((id, tag_type)) {
                return Err(FragmentError::DuplicateCode(whole.2.to_string()));
            }
            coded.push(marker_for(tag_type));
            coded.push(index_char(codes.len()));
            codes.push(code.clone());
        }
        coded.push_str(&generic[last..]);

        self.coded_text = coded;
        self.codes = codes;
        Ok(())
    }

    /// Ids of opening and closing codes that have no partner
    ///
    /// Codes flagged as isolated are ignored. A closing code must match an
    /// opening code with the same id that is still open at that point.
    pub fn unbalanced_code_ids(&self) -> Vec<i32> {
        self.unbalanced_positions()
            .into_iter()
            .map(|i| self.codes[i].id)
            .collect()
    }

    /// Whether every opening code has exactly one later closing code
    pub fn is_balanced(&self) -> bool {
        self.unbalanced_positions().is_empty()
    }

    /// Flag every unpaired opening or closing code as isolated
    ///
    /// Returns the number of codes changed.
    pub fn balance_markers(&mut self) -> usize {
        let positions = self.unbalanced_positions();
        for &i in &positions {
            self.codes[i].isolated = true;
        }
        positions.len()
    }

    /// Reassign code ids from 0 in reading order, keeping pairs together
    pub fn renumber_codes(&mut self) {
        let mut open: Vec<(i32, i32)> = Vec::new();
        let mut next = 0;
        let order: Vec<usize> = self.code_positions();

        for index in order {
            let code = &mut self.codes[index];
            let old = code.id;
            match code.tag_type {
                TagType::Closing => {
                    match open.iter().rposition(|(o, _)| *o == old) {
                        Some(pos) => code.id = open.remove(pos).1,
                        None => {
                            code.id = next;
                            next += 1;
                        }
                    }
                }
                TagType::Opening => {
                    open.push((old, next));
                    code.id = next;
                    next += 1;
                }
                TagType::Placeholder => {
                    code.id = next;
                    next += 1;
                }
            }
        }
        self.next_id = next;
    }

    /// Whether the fragment contains at least one code
    pub fn has_code(&self) -> bool {
        !self.codes.is_empty()
    }

    /// Whether the fragment contains text other than whitespace
    pub fn has_text(&self) -> bool {
        self.pieces().any(|p| match p {
            Piece::Text(text) => !text.trim().is_empty(),
            Piece::Code(_) => false,
        })
    }

    /// Whether the fragment has no text and no code
    pub fn is_empty(&self) -> bool {
        self.coded_text.is_empty()
    }

    /// Remove all content; ids restart at 0
    pub fn clear(&mut self) {
        self.coded_text.clear();
        self.codes.clear();
        self.next_id = 0;
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn ensure_room(&self, extra: usize) -> Result<(), FragmentError> {
        if self.codes.len() + extra > MAX_CODES {
            return Err(FragmentError::TooManyCodes(MAX_CODES));
        }
        Ok(())
    }

    /// Callers check `ensure_room` first
    fn push_code(&mut self, code: Code) {
        self.coded_text.push(marker_for(code.tag_type));
        self.coded_text.push(index_char(self.codes.len()));
        self.codes.push(code);
    }

    fn open_code_id(&self, code_type: &str) -> Option<i32> {
        let mut open: Vec<&Code> = Vec::new();
        for index in self.code_positions() {
            let code = &self.codes[index];
            if code.isolated {
                continue;
            }
            match code.tag_type {
                TagType::Opening => open.push(code),
                TagType::Closing => {
                    if let Some(pos) = open.iter().rposition(|c| c.id == code.id) {
                        open.remove(pos);
                    }
                }
                TagType::Placeholder => {}
            }
        }
        open.iter()
            .rev()
            .find(|c| c.code_type == code_type)
            .map(|c| c.id)
    }

    /// Indices into `codes` in reading order
    fn code_positions(&self) -> Vec<usize> {
        let mut positions = Vec::with_capacity(self.codes.len());
        let mut chars = self.coded_text.chars();
        while let Some(ch) = chars.next() {
            if is_marker(ch) {
                if let Some(index) = chars.next().and_then(char_index) {
                    positions.push(index);
                }
            }
        }
        positions
    }

    fn unbalanced_positions(&self) -> Vec<usize> {
        let mut stack: Vec<usize> = Vec::new();
        let mut unbalanced = Vec::new();

        for index in self.code_positions() {
            let code = &self.codes[index];
            if code.isolated {
                continue;
            }
            match code.tag_type {
                TagType::Opening => stack.push(index),
                TagType::Closing => {
                    match stack.iter().rposition(|&i| self.codes[i].id == code.id) {
                        Some(pos) => {
                            stack.remove(pos);
                        }
                        None => unbalanced.push(index),
                    }
                }
                TagType::Placeholder => {}
            }
        }
        unbalanced.extend(stack);
        unbalanced.sort_unstable();
        unbalanced
    }

    /// Appended text must not carry marker characters of its own
    fn invalidate_markers_in_tail(&mut self, appended: usize) {
        let start = self.coded_text.len() - appended;
        if self.coded_text[start..].contains(is_marker) {
            let cleaned: String = self.coded_text[start..]
                .chars()
                .filter(|c| !is_marker(*c))
                .collect();
            self.coded_text.truncate(start);
            self.coded_text.push_str(&cleaned);
        }
    }
}

impl fmt::Display for TextFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_original())
    }
}

impl From<&str> for TextFragment {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}
