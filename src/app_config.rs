use anyhow::{anyhow, Context, Result};
use encoding_rs::Encoding;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::filters::FilterConfigurationMapper;
use crate::locale::LocaleId;
use crate::params::Parameters;
use crate::pipeline::Pipeline;
use crate::steps;

/// Application configuration module
/// This module handles the batch configuration: locales, encodings, the
/// filter to read documents with and the ordered list of steps to run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    // @field: Source locale (e.g. "en", "en-us")
    pub source_locale: String,

    // @field: Target locale, none for extraction only
    #[serde(default)]
    pub target_locale: Option<String>,

    // @field: Encoding of the input documents
    #[serde(default = "default_input_encoding")]
    pub input_encoding: String,

    // @field: Encoding of the output, the input one when absent
    #[serde(default)]
    pub output_encoding: Option<String>,

    // @field: Filter used to read documents
    #[serde(default)]
    pub filter: FilterSettings,

    // @field: Steps in pipeline order
    #[serde(default = "default_steps")]
    pub steps: Vec<StepConfig>,

    // @field: Root for relative input paths
    #[serde(default)]
    pub input_root: Option<PathBuf>,

    // @field: Root for output files
    #[serde(default)]
    pub output_root: Option<PathBuf>,

    // @field: Inserted before the extension of output files
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    // @field: Log verbosity
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Filter configuration id and its parameters
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FilterSettings {
    // @field: Configuration id (e.g. "okf_plaintext"), guessed from the extension when absent
    #[serde(default)]
    pub config_id: Option<String>,

    // @field: Filter parameters
    #[serde(default)]
    pub parameters: Parameters,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            config_id: Some(default_filter_id()),
            parameters: Parameters::new(),
        }
    }
}

/// One step of the pipeline
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StepConfig {
    // @field: Registered step name
    pub name: String,

    // @field: Step parameters, defaults for missing keys
    #[serde(default)]
    pub parameters: Parameters,
}

impl StepConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Parameters::new(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching filter for the log facade
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_input_encoding() -> String {
    "UTF-8".to_string()
}

fn default_filter_id() -> String {
    "okf_plaintext".to_string()
}

fn default_output_suffix() -> String {
    String::new()
}

fn default_steps() -> Vec<StepConfig> {
    vec![StepConfig::new(steps::writer::STEP_NAME)]
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Cannot open configuration {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Cannot write configuration {}", path.display()))?;
        Ok(())
    }

    /// Load the configuration, writing the default one first if the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Default configuration written to {}", path.display());
            return Ok(config);
        }
        Self::load(path)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.source()?;
        self.target()?;

        for encoding in std::iter::once(&self.input_encoding).chain(self.output_encoding.iter()) {
            if Encoding::for_label(encoding.as_bytes()).is_none() {
                return Err(anyhow!("Unknown encoding: {}", encoding));
            }
        }

        if let Some(config_id) = &self.filter.config_id {
            let mut filter = FilterConfigurationMapper::new().create_filter(config_id)?;
            filter.set_parameters(&self.filter.parameters)?;
        }

        if self.steps.is_empty() {
            return Err(anyhow!("At least one step is required"));
        }
        for step in &self.steps {
            steps::create_configured_step(&step.name, &step.parameters)
                .with_context(|| format!("Invalid step '{}'", step.name))?;
        }
        Ok(())
    }

    // @returns: Parsed source locale
    pub fn source(&self) -> Result<LocaleId> {
        Ok(LocaleId::new(&self.source_locale)?)
    }

    // @returns: Parsed target locale, if any
    pub fn target(&self) -> Result<Option<LocaleId>> {
        self.target_locale
            .as_deref()
            .map(LocaleId::new)
            .transpose()
            .map_err(Into::into)
    }

    /// Build the pipeline of configured steps
    pub fn create_pipeline(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new();
        for step in &self.steps {
            pipeline.add_step(steps::create_configured_step(&step.name, &step.parameters)?);
        }
        Ok(pipeline)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_locale: "en".to_string(),
            target_locale: Some("fr".to_string()),
            input_encoding: default_input_encoding(),
            output_encoding: None,
            filter: FilterSettings::default(),
            steps: default_steps(),
            input_root: None,
            output_root: None,
            output_suffix: default_output_suffix(),
            log_level: LogLevel::default(),
        }
    }
}
