/*!
 * Error types for the tkit framework.
 *
 * Each layer of the round-trip engine has its own error enum, built with
 * the thiserror crate. Failures are reported per batch item by the pipeline,
 * so none of these errors ever aborts a whole batch on its own, except for
 * configuration errors which are raised before the batch starts.
 *
 * Unbalanced inline codes are not errors: they are recorded as an
 * annotation (see `resource::annotation::UnbalancedCodeWarning`).
 */

use thiserror::Error;

/// Errors raised while validating step, filter or application configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A parameter key is not declared by the owner's schema
    #[error("Unknown parameter '{key}' for {owner}")]
    UnknownParameter {
        /// Name of the step or filter owning the parameters
        owner: String,
        /// The offending key
        key: String,
    },

    /// A parameter has a value of the wrong type or out of range
    #[error("Invalid value for parameter '{key}' of {owner}: expected {expected}")]
    InvalidParameter {
        /// Name of the step or filter owning the parameters
        owner: String,
        /// The offending key
        key: String,
        /// Human readable description of the expected value
        expected: String,
    },

    /// No step is registered under this name
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// No filter is registered under this configuration id
    #[error("Unknown filter configuration: {0}")]
    UnknownFilterConfiguration(String),

    /// The locale code could not be parsed or validated
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    /// An encoding label is not known
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// A regular expression parameter does not compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The pattern as given
        pattern: String,
        /// Compiler message
        message: String,
    },
}

/// Errors raised when coded text or generic markup does not match a fragment's codes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FragmentError {
    /// A code marker is truncated or points past the code list
    #[error("Invalid coded text: {0}")]
    InvalidCodedText(String),

    /// Generic markup references a code the fragment does not have
    #[error("Unknown code in generic markup: {0}")]
    UnknownCode(String),

    /// The same code is referenced twice
    #[error("Code referenced more than once: {0}")]
    DuplicateCode(String),

    /// The fragment cannot address another code
    #[error("Too many codes in one fragment (limit {0})")]
    TooManyCodes(usize),
}

/// Errors that can occur while a filter reads a document
#[derive(Error, Debug)]
pub enum FilterError {
    /// The document cannot be parsed or decoded at all
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The filter was used outside of its open state
    #[error("Illegal filter state: {0}")]
    IllegalState(String),

    /// The declared encoding is not supported
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Error reading the input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid filter parameters
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Extracted content does not fit in a fragment
    #[error("Fragment error: {0}")]
    Fragment(#[from] FragmentError),
}

/// Errors that can occur while a writer rebuilds a document
#[derive(Error, Debug)]
pub enum WriterError {
    /// The writer was used outside of its open state
    #[error("Illegal writer state: {0}")]
    IllegalState(String),

    /// Output text cannot be represented in the output encoding
    #[error("Characters not representable in {encoding}: {sample}")]
    Unmappable {
        /// Name of the output encoding
        encoding: String,
        /// Excerpt of the offending text
        sample: String,
    },

    /// The output encoding is not known
    #[error("Unknown output encoding: {0}")]
    UnknownEncoding(String),

    /// A skeleton references a resource the writer has not seen
    #[error("Unresolved skeleton reference: {0}")]
    UnresolvedReference(String),

    /// Error writing the output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a pipeline step for the current batch item
#[derive(Error, Debug)]
pub enum StepError {
    /// The step could not complete its work for the item
    #[error("Step '{step}' failed: {message}")]
    Failure {
        /// Name of the failing step
        step: String,
        /// What went wrong
        message: String,
    },

    /// An external process did not finish in time and was killed
    #[error("Step '{step}' timed out after {seconds}s")]
    Timeout {
        /// Name of the failing step
        step: String,
        /// Configured timeout
        seconds: u64,
    },

    /// Error from the filter feeding the pipeline
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Error from a writer owned by the step
    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),

    /// Content built by the step does not fit in a fragment
    #[error("Fragment error: {0}")]
    Fragment(#[from] FragmentError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    /// Convenience constructor for a step failure
    pub fn failure(step: &str, message: impl Into<String>) -> Self {
        Self::Failure {
            step: step.to_string(),
            message: message.into(),
        }
    }
}

/// Batch level pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The pipeline or one of its steps is misconfigured
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A step failed outside of any batch item (start or end of batch)
    #[error("Step error: {0}")]
    Step(#[from] StepError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error from the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Error from a filter
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
