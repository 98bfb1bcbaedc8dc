/*!
 * # tkit - translation toolkit
 *
 * A Rust library to extract translatable text from documents, process it
 * through a pipeline of steps, and write the documents back.
 *
 * ## Features
 *
 * - Filters turning documents into a stream of events (plain text, INI)
 * - Inline codes kept apart from the text, so markup survives translation
 * - Skeleton writers rebuilding documents byte for byte
 * - Configurable pipelines of steps (pseudo-translation, quality checks,
 *   word count, splitting, external commands)
 * - Round-trip comparison harness
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `resource`: events, text units, fragments and inline codes
 * - `skeleton`: skeletons and the writers that consume them
 * - `filters`: filter contract, concrete filters and their registry
 * - `pipeline`: steps, batches and the pipeline driver
 * - `steps`: the steps shipped with the crate and their registry
 * - `quality`: character checks and quality reports
 * - `roundtrip`: extract, write and re-extract comparison
 * - `app_config`: configuration file for batch runs
 * - `errors`: error types for each layer
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod file_utils;
pub mod filters;
pub mod locale;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod quality;
pub mod resource;
pub mod roundtrip;
pub mod skeleton;
pub mod steps;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ConfigurationError, FilterError, PipelineError, StepError, WriterError};
pub use filters::{Filter, FilterConfigurationMapper};
pub use locale::LocaleId;
pub use params::Parameters;
pub use pipeline::{Batch, BatchItem, Pipeline, Step};
pub use resource::{Event, RawDocument, TextFragment, TextUnit};
pub use roundtrip::RoundTripComparison;
