/*!
 * Quality step running the character checks on every text unit.
 *
 * Issues are recorded as annotations on the containers they concern and
 * collected into a report, saved as JSON at the end of the batch when a
 * report path is set.
 */

use log::{info, warn};
use std::any::Any;
use std::path::PathBuf;

use crate::errors::{ConfigurationError, StepError};
use crate::locale::LocaleId;
use crate::params::{ParameterSchema, Parameters};
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::quality::characters::{CharactersChecker, CharactersCheckerConfig};
use crate::quality::QualityCheckReport;
use crate::resource::Event;

pub const STEP_NAME: &str = "characters_check";

#[derive(Debug)]
pub struct CharactersCheckStep {
    config: CharactersCheckerConfig,
    checker: Option<CharactersChecker>,
    source_locale: Option<LocaleId>,
    target_locale: Option<LocaleId>,
    item_target: Option<LocaleId>,
    report: QualityCheckReport,
    report_path: Option<PathBuf>,
}

impl Default for CharactersCheckStep {
    fn default() -> Self {
        Self::new()
    }
}

impl CharactersCheckStep {
    pub fn new() -> Self {
        Self {
            config: CharactersCheckerConfig::default(),
            checker: None,
            source_locale: None,
            target_locale: None,
            item_target: None,
            report: QualityCheckReport::new(),
            report_path: None,
        }
    }

    /// Issues found so far in the batch
    pub fn report(&self) -> &QualityCheckReport {
        &self.report
    }

    fn checker(&mut self) -> Result<&mut CharactersChecker, StepError> {
        if self.checker.is_none() {
            let checker = CharactersChecker::new(self.config.clone())
                .map_err(|e| StepError::failure(STEP_NAME, e.to_string()))?;
            self.checker = Some(checker);
        }
        self.checker
            .as_mut()
            .ok_or_else(|| StepError::failure(STEP_NAME, "checker not initialized"))
    }
}

impl Step for CharactersCheckStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Check the characters of the text units: allowed characters, corruption and charset"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        let defaults = CharactersCheckerConfig::default();
        ParameterSchema::new(STEP_NAME)
            .boolean(
                "check_allowed_characters",
                defaults.check_allowed_characters,
                "Apply the allowed-characters annotations",
            )
            .boolean("check_characters", defaults.check_characters, "Check the target against the charset")
            .boolean(
                "corrupted_characters",
                defaults.corrupted_characters,
                "Look for corrupted characters in the target",
            )
            .string("charset", &defaults.charset, "Charset the target must fit in")
            .string(
                "extra_chars_allowed",
                &defaults.extra_chars_allowed,
                "Regex of characters allowed outside the charset",
            )
            .string("report_path", "", "Where to save the JSON report (empty for none)")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        let config = CharactersCheckerConfig {
            check_allowed_characters: resolved.get_bool("check_allowed_characters").unwrap_or(true),
            check_characters: resolved.get_bool("check_characters").unwrap_or(false),
            corrupted_characters: resolved.get_bool("corrupted_characters").unwrap_or(true),
            charset: resolved.get_str("charset").unwrap_or_default().to_string(),
            extra_chars_allowed: resolved.get_str("extra_chars_allowed").unwrap_or_default().to_string(),
        };
        self.checker = Some(CharactersChecker::new(config.clone())?);
        self.config = config;
        self.report_path = resolved
            .get_str("report_path")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Ok(())
    }

    fn set_source_locale(&mut self, locale: &LocaleId) {
        self.source_locale = Some(locale.clone());
    }

    fn set_target_locale(&mut self, locale: Option<&LocaleId>) {
        self.target_locale = locale.cloned();
    }

    fn start_batch(&mut self) -> Result<(), StepError> {
        self.report = QualityCheckReport::new();
        if self.target_locale.is_none() {
            warn!("No target locale: only source containers will be checked");
        }
        self.checker()?;
        Ok(())
    }

    fn start_batch_item(&mut self, context: &mut BatchItemContext) -> Result<(), StepError> {
        self.item_target = context.target_locale.clone().or_else(|| self.target_locale.clone());
        self.report.start_document(&context.name);
        Ok(())
    }

    fn handle(&mut self, mut event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        let Some(tu) = event.as_text_unit_mut() else {
            return Ok(event);
        };
        // Without a target locale, the unit's own targets or the source are checked
        let locale = self
            .item_target
            .clone()
            .or_else(|| tu.target_locales().next().cloned())
            .or_else(|| self.source_locale.clone());
        let Some(target) = locale else {
            return Ok(event);
        };
        let issues = self.checker()?.check_text_unit(tu, &target);
        for issue in issues {
            self.report.add(issue);
        }
        Ok(event)
    }

    fn end_batch(&mut self) -> Result<(), StepError> {
        info!("Character check: {} issue(s)", self.report.issue_count());
        if let Some(path) = &self.report_path {
            self.report
                .save(path)
                .map_err(|e| StepError::failure(STEP_NAME, format!("{:#}", e)))?;
            info!("Quality report saved to {}", path.display());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
