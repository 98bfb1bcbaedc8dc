/*!
 * Compound filter: one filter front for a family of sub-filters.
 *
 * The family is a fixed table mapping configuration ids to constructor
 * functions. Opening a document creates the sub-filter of the active
 * configuration (or of the configuration named by the document itself);
 * every other call is forwarded to that sub-filter.
 */

use log::debug;

use super::{Filter, FilterConfiguration};
use crate::errors::{ConfigurationError, FilterError};
use crate::params::{ParameterSchema, Parameters};
use crate::resource::{Event, RawDocument};
use crate::skeleton::FilterWriter;

/// Creates a sub-filter
pub type FilterConstructor = fn() -> Box<dyn Filter>;

/// Filter dispatching to sub-filters by configuration id
#[derive(Debug)]
pub struct CompoundFilter {
    name: String,
    mime_type: String,
    entries: Vec<(FilterConfiguration, FilterConstructor)>,
    active_id: Option<String>,
    active: Option<Box<dyn Filter>>,
    parameters: Parameters,
}

impl CompoundFilter {
    /// Create a compound filter; the first configuration is active
    pub fn new(name: &str, mime_type: &str, entries: Vec<(FilterConfiguration, FilterConstructor)>) -> Self {
        let active_id = entries.first().map(|(c, _)| c.id.clone());
        Self {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            entries,
            active_id,
            active: None,
            parameters: Parameters::new(),
        }
    }

    /// Select the configuration used for the next document
    ///
    /// Parameters set earlier are kept only if the new configuration accepts them.
    pub fn set_configuration(&mut self, config_id: &str) -> Result<(), ConfigurationError> {
        let constructor = self.constructor(config_id)?;
        if self.active_id.as_deref() != Some(config_id) {
            debug!("{}: switching to configuration {}", self.name, config_id);
            if !self.parameters.is_empty() && constructor().parameter_schema().validate(&self.parameters).is_err() {
                self.parameters = Parameters::new();
            }
            self.active_id = Some(config_id.to_string());
            self.active = None;
        }
        Ok(())
    }

    /// Id of the active configuration
    pub fn active_configuration(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Whether this filter has a configuration with the given id
    pub fn has_configuration(&self, config_id: &str) -> bool {
        self.entries.iter().any(|(c, _)| c.id == config_id)
    }

    fn constructor(&self, config_id: &str) -> Result<FilterConstructor, ConfigurationError> {
        self.entries
            .iter()
            .find(|(c, _)| c.id == config_id)
            .map(|(_, ctor)| *ctor)
            .ok_or_else(|| ConfigurationError::UnknownFilterConfiguration(config_id.to_string()))
    }

    fn active_constructor(&self) -> Result<FilterConstructor, ConfigurationError> {
        match &self.active_id {
            Some(id) => self.constructor(id),
            None => Err(ConfigurationError::UnknownFilterConfiguration(format!(
                "{} has no configuration",
                self.name
            ))),
        }
    }

    fn sub_filter(&mut self) -> Result<&mut Box<dyn Filter>, FilterError> {
        self.active
            .as_mut()
            .ok_or_else(|| FilterError::IllegalState(format!("{} has no open document", self.name)))
    }
}

impl Filter for CompoundFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn configurations(&self) -> Vec<FilterConfiguration> {
        self.entries.iter().map(|(c, _)| c.clone()).collect()
    }

    fn parameter_schema(&self) -> ParameterSchema {
        match self.active_constructor() {
            Ok(constructor) => constructor().parameter_schema(),
            Err(_) => ParameterSchema::new(&self.name),
        }
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let constructor = self.active_constructor()?;
        let mut candidate = constructor();
        candidate.set_parameters(params)?;
        self.parameters = params.clone();
        Ok(())
    }

    fn open(&mut self, document: &RawDocument) -> Result<(), FilterError> {
        if let Some(config_id) = document.filter_config_id() {
            if self.has_configuration(config_id) {
                self.set_configuration(config_id)?;
            }
        }
        if let Some(previous) = self.active.as_mut() {
            previous.close();
        }

        let constructor = self.active_constructor()?;
        let mut sub_filter = constructor();
        sub_filter.set_parameters(&self.parameters)?;
        sub_filter.open(document)?;
        self.active = Some(sub_filter);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, FilterError> {
        self.sub_filter()?.has_next()
    }

    fn next(&mut self) -> Result<Event, FilterError> {
        self.sub_filter()?.next()
    }

    fn cancel(&mut self) {
        if let Some(filter) = self.active.as_mut() {
            filter.cancel();
        }
    }

    fn close(&mut self) {
        if let Some(filter) = self.active.as_mut() {
            filter.close();
        }
    }

    fn create_skeleton_writer(&self) -> Box<dyn FilterWriter> {
        match self.active_constructor() {
            Ok(constructor) => constructor().create_skeleton_writer(),
            Err(_) => Box::new(crate::skeleton::SkeletonWriter::new()),
        }
    }
}
