/*!
 * Registry of every filter configuration shipped with the crate.
 */

use log::debug;

use super::compound::{CompoundFilter, FilterConstructor};
use super::ini::{IniFilter, CONFIG_INI, MIME_TYPE as INI_MIME_TYPE};
use super::{plaintext, Filter, FilterConfiguration};
use crate::errors::ConfigurationError;

fn new_ini() -> Box<dyn Filter> {
    Box::new(IniFilter::new())
}

/// Maps configuration ids and file extensions to filters
#[derive(Debug, Clone)]
pub struct FilterConfigurationMapper {
    entries: Vec<(FilterConfiguration, FilterConstructor)>,
}

impl Default for FilterConfigurationMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterConfigurationMapper {
    /// Mapper holding all built-in configurations
    pub fn new() -> Self {
        let mut entries = plaintext::configurations();
        entries.push((
            FilterConfiguration::new(
                CONFIG_INI,
                "INI",
                "INI files: sections as groups, values as text units",
                INI_MIME_TYPE,
                &[".ini"],
            ),
            new_ini as FilterConstructor,
        ));
        Self { entries }
    }

    /// Add or replace a configuration
    pub fn add_configuration(&mut self, config: FilterConfiguration, constructor: FilterConstructor) {
        self.entries.retain(|(c, _)| c.id != config.id);
        self.entries.push((config, constructor));
    }

    /// All known configurations
    pub fn configurations(&self) -> Vec<&FilterConfiguration> {
        self.entries.iter().map(|(c, _)| c).collect()
    }

    pub fn configuration(&self, config_id: &str) -> Option<&FilterConfiguration> {
        self.entries.iter().map(|(c, _)| c).find(|c| c.id == config_id)
    }

    /// Create a new filter for a configuration id
    ///
    /// # Arguments
    /// * `config_id` - Configuration id, e.g. `okf_plaintext_paragraphs`
    ///
    /// # Returns
    /// * `Result<Box<dyn Filter>, ConfigurationError>` - A fresh filter, or `UnknownFilterConfiguration`
    pub fn create_filter(&self, config_id: &str) -> Result<Box<dyn Filter>, ConfigurationError> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(c, _)| c.id == config_id)
            .ok_or_else(|| ConfigurationError::UnknownFilterConfiguration(config_id.to_string()))?;
        debug!("Creating filter for configuration {}", config_id);
        Ok(constructor())
    }

    /// A compound filter over every configuration, choosing per document
    pub fn create_compound_filter(&self) -> CompoundFilter {
        CompoundFilter::new("okf_any", "text/plain", self.entries.clone())
    }

    /// Find the configuration handling a file extension (with or without the dot)
    pub fn find_by_extension(&self, extension: &str) -> Option<&FilterConfiguration> {
        let wanted = format!(".{}", extension.trim_start_matches('.').to_lowercase());
        self.entries
            .iter()
            .map(|(c, _)| c)
            .find(|c| c.extensions.iter().any(|e| e.eq_ignore_ascii_case(&wanted)))
    }
}
