/*!
 * Pseudo-translation: fills targets with a readable but visibly changed copy
 * of the source, to test that a document survives translation.
 *
 * Inline codes are copied untouched, with their ids, so the writer can still
 * restore the original markup.
 */

use log::warn;
use std::any::Any;

use crate::errors::{ConfigurationError, StepError};
use crate::locale::LocaleId;
use crate::params::{ParameterSchema, Parameters};
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::resource::{Event, Piece, TextFragment, TextUnit};

pub const STEP_NAME: &str = "pseudo_translate";

const LATIN_FROM: &str = "AaEeIiOoUuYyCcDdNn";
const LATIN_TO: &str = "\u{00c2}\u{00e5}\u{00c9}\u{00e8}\u{00cf}\u{00ec}\u{00d8}\u{00f5}\u{00db}\u{00fc}\u{00dd}\u{00ff}\u{00c7}\u{00e7}\u{00d0}\u{00f0}\u{00d1}\u{00f1}";

/// How the text of the target is changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoMode {
    /// Latin letters replaced by accented ones
    Extended,
    /// Letters replaced by `X`/`x`, digits by `N`
    Xn,
    /// Text removed, codes kept
    KeepInline,
}

impl PseudoMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "extended" => Some(Self::Extended),
            "xn" => Some(Self::Xn),
            "keep_inline" => Some(Self::KeepInline),
            _ => None,
        }
    }

    fn convert(self, text: &str) -> String {
        match self {
            Self::Extended => text
                .chars()
                .map(|ch| match LATIN_FROM.chars().position(|c| c == ch) {
                    Some(i) => LATIN_TO.chars().nth(i).unwrap_or(ch),
                    None => ch,
                })
                .collect(),
            Self::Xn => text
                .chars()
                .map(|ch| {
                    if ch.is_uppercase() || (ch.is_alphabetic() && !ch.is_lowercase()) {
                        'X'
                    } else if ch.is_lowercase() {
                        'x'
                    } else if ch.is_ascii_digit() {
                        'N'
                    } else {
                        ch
                    }
                })
                .collect(),
            Self::KeepInline => String::new(),
        }
    }
}

/// Expansion text for a source of `length` characters
///
/// 100% of the length for long strings, 50% (at least one character) for
/// strings of 20 characters or less.
fn expansion(length: usize) -> String {
    let addition = if length <= 20 { length.div_ceil(2) } else { length };
    (0..addition)
        .map(|i| if i % 6 == 0 && i != addition - 1 { ' ' } else { 'z' })
        .collect()
}

#[derive(Debug)]
pub struct PseudoTranslateStep {
    target_locale: Option<LocaleId>,
    item_target: Option<LocaleId>,
    mode: PseudoMode,
    prefix: String,
    suffix: String,
    expand: bool,
    apply_to_existing_target: bool,
}

impl Default for PseudoTranslateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PseudoTranslateStep {
    pub fn new() -> Self {
        Self {
            target_locale: None,
            item_target: None,
            mode: PseudoMode::Extended,
            prefix: String::new(),
            suffix: String::new(),
            expand: false,
            apply_to_existing_target: false,
        }
    }

    fn translate(&self, tu: &mut TextUnit, locale: &LocaleId) -> Result<(), StepError> {
        if !tu.translatable || !tu.source().content().has_text() {
            return Ok(());
        }
        if tu.has_target(locale) && !self.apply_to_existing_target {
            return Ok(());
        }

        let original = match tu.target(locale) {
            Some(target) if target.content().has_text() => target.content().clone(),
            _ => tu.source().content().clone(),
        };

        let mut fragment = TextFragment::new();
        fragment.append_text(&self.prefix);
        let pieces: Vec<Piece<'_>> = original.pieces().collect();
        // Expansion goes after the last text, before trailing codes
        let last_text = pieces.iter().rposition(|p| matches!(p, Piece::Text(_)));
        for (i, piece) in pieces.iter().enumerate() {
            match piece {
                Piece::Text(text) => {
                    fragment.append_text(&self.mode.convert(text));
                    if self.expand && Some(i) == last_text {
                        fragment.append_text(&expansion(tu.source().content().to_text().chars().count()));
                    }
                }
                Piece::Code(code) => fragment.append_existing((*code).clone())?,
            }
        }
        fragment.append_text(&self.suffix);
        tu.set_target_content(locale.clone(), fragment);
        Ok(())
    }
}

impl Step for PseudoTranslateStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Create pseudo-translated targets, keeping inline codes"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(STEP_NAME)
            .string("mode", "extended", "extended, xn or keep_inline")
            .string("prefix", "", "Text added before each target")
            .string("suffix", "", "Text added after each target")
            .boolean("expand", false, "Lengthen targets to simulate text expansion")
            .boolean("apply_to_existing_target", false, "Also change units that already have a target")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        let mode = resolved.get_str("mode").unwrap_or("extended");
        self.mode = PseudoMode::parse(mode).ok_or_else(|| ConfigurationError::InvalidParameter {
            owner: STEP_NAME.to_string(),
            key: "mode".to_string(),
            expected: "one of extended, xn, keep_inline".to_string(),
        })?;
        self.prefix = resolved.get_str("prefix").unwrap_or_default().to_string();
        self.suffix = resolved.get_str("suffix").unwrap_or_default().to_string();
        self.expand = resolved.get_bool("expand").unwrap_or(false);
        self.apply_to_existing_target = resolved.get_bool("apply_to_existing_target").unwrap_or(false);
        Ok(())
    }

    fn set_target_locale(&mut self, locale: Option<&LocaleId>) {
        self.target_locale = locale.cloned();
    }

    fn start_batch(&mut self) -> Result<(), StepError> {
        if self.target_locale.is_none() {
            warn!("{}: no target locale, items without one are left unchanged", STEP_NAME);
        }
        Ok(())
    }

    fn start_batch_item(&mut self, context: &mut BatchItemContext) -> Result<(), StepError> {
        self.item_target = context.target_locale.clone().or_else(|| self.target_locale.clone());
        Ok(())
    }

    fn handle(&mut self, mut event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        if let (Some(locale), Some(tu)) = (self.item_target.as_ref(), event.as_text_unit_mut()) {
            self.translate(tu, locale)?;
        }
        Ok(event)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
