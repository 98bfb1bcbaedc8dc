/*!
 * Pipeline steps shipped with tkit and the registry that builds them by name.
 */

pub mod characters_check;
pub mod event_list;
pub mod external_command;
pub mod pseudo_translate;
pub mod splitter;
pub mod word_count;
pub mod writer;

pub use characters_check::CharactersCheckStep;
pub use event_list::EventListBuilderStep;
pub use external_command::ExternalCommandStep;
pub use pseudo_translate::{PseudoMode, PseudoTranslateStep};
pub use splitter::{join_parts, split_events, DocumentSplitterStep};
pub use word_count::{count_words, WordCountStep};
pub use writer::FilterEventsWriterStep;

use crate::errors::ConfigurationError;
use crate::params::Parameters;
use crate::pipeline::Step;

/// Names of every registered step
pub const STEP_NAMES: &[&str] = &[
    characters_check::STEP_NAME,
    event_list::STEP_NAME,
    external_command::STEP_NAME,
    pseudo_translate::STEP_NAME,
    splitter::STEP_NAME,
    word_count::STEP_NAME,
    writer::STEP_NAME,
];

/// Create a step with default parameters from its name
pub fn create_step(name: &str) -> Result<Box<dyn Step>, ConfigurationError> {
    let step: Box<dyn Step> = match name {
        characters_check::STEP_NAME => Box::new(CharactersCheckStep::new()),
        event_list::STEP_NAME => Box::new(EventListBuilderStep::new()),
        external_command::STEP_NAME => Box::new(ExternalCommandStep::new()),
        pseudo_translate::STEP_NAME => Box::new(PseudoTranslateStep::new()),
        splitter::STEP_NAME => Box::new(DocumentSplitterStep::new()),
        word_count::STEP_NAME => Box::new(WordCountStep::new()),
        writer::STEP_NAME => Box::new(FilterEventsWriterStep::new()),
        _ => return Err(ConfigurationError::UnknownStep(name.to_string())),
    };
    Ok(step)
}

/// Create a step from its name and set its parameters
pub fn create_configured_step(name: &str, params: &Parameters) -> Result<Box<dyn Step>, ConfigurationError> {
    let mut step = create_step(name)?;
    step.set_parameters(params)?;
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_createStep_shouldKnowEveryRegisteredName() {
        for name in STEP_NAMES {
            let step = create_step(name).unwrap();
            assert_eq!(step.name(), *name);
        }
    }

    #[test]
    fn test_createStep_unknownName_shouldFail() {
        assert_eq!(
            create_step("spell_check").unwrap_err(),
            ConfigurationError::UnknownStep("spell_check".to_string())
        );
    }

    #[test]
    fn test_createConfiguredStep_unknownParameter_shouldFail() {
        let params = Parameters::new().with("colour", "blue");
        assert!(matches!(
            create_configured_step("word_count", &params),
            Err(ConfigurationError::UnknownParameter { .. })
        ));
    }
}
