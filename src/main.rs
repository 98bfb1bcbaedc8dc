// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, LevelFilter};
use std::path::{Path, PathBuf};

use tkit::app_config::{self, Config};
use tkit::errors::AppError;
use tkit::file_utils::FileManager;
use tkit::filters::{extract_events, Filter, FilterConfigurationMapper};
use tkit::locale::LocaleId;
use tkit::logging;
use tkit::pipeline::{Batch, BatchItem};
use tkit::resource::{Event, RawDocument};
use tkit::roundtrip::RoundTripComparison;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the events a filter extracts from a document
    Extract(ExtractArgs),

    /// Run the configured pipeline over a file or a directory
    Run(RunArgs),

    /// Check that documents survive extraction and writing unchanged
    Roundtrip(RoundtripArgs),

    /// Generate shell completions for tkit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Document to read
    input_path: PathBuf,

    /// Filter configuration id (guessed from the extension when absent)
    #[arg(long)]
    filter: Option<String>,

    /// Input encoding
    #[arg(short, long, default_value = "UTF-8")]
    encoding: String,

    /// Source locale
    #[arg(short, long, default_value = "en")]
    source_locale: String,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input file or directory
    input_path: PathBuf,

    /// Configuration file (created with defaults if missing)
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Source locale, overrides the configuration
    #[arg(short, long)]
    source_locale: Option<String>,

    /// Target locale, overrides the configuration
    #[arg(short, long)]
    target_locale: Option<String>,

    /// Overwrite existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Log level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Write the batch report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RoundtripArgs {
    /// Input file or directory
    input_path: PathBuf,

    /// Filter configuration id (guessed from the extension when absent)
    #[arg(long)]
    filter: Option<String>,

    /// Input encoding
    #[arg(short, long, default_value = "UTF-8")]
    encoding: String,

    /// Ignore inline code ids in the comparison
    #[arg(long)]
    ignore_code_ids: bool,

    /// Also require the output to be byte-identical to the input
    #[arg(long)]
    bytes: bool,
}

#[derive(Parser, Debug)]
#[command(name = "tkit", version, about = "Extract, process and merge translatable text", long_about = None)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Level is adjusted once the configuration is loaded
    logging::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "tkit", &mut std::io::stdout());
            Ok(())
        }
        Commands::Extract(args) => run_extract(args),
        Commands::Run(args) => run_batch(args),
        Commands::Roundtrip(args) => run_roundtrip(args),
    }
}

/// Configuration id for a file: the explicit one, else the one of its extension
fn filter_id_for(mapper: &FilterConfigurationMapper, explicit: Option<&str>, path: &Path) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
    mapper
        .find_by_extension(&extension)
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow!("No filter for {:?}, use --filter", path))
}

fn input_files(mapper: &FilterConfigurationMapper, input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(AppError::File(format!("Input path does not exist: {:?}", input)).into());
    }
    let extensions: Vec<&str> = mapper
        .configurations()
        .into_iter()
        .flat_map(|c| c.extensions.iter().map(String::as_str))
        .collect();
    FileManager::find_files(input, &extensions)
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let mapper = FilterConfigurationMapper::new();
    let config_id = filter_id_for(&mapper, args.filter.as_deref(), &args.input_path)?;
    let mut filter = mapper.create_filter(&config_id)?;
    let document = RawDocument::from_path(&args.input_path, &args.encoding, LocaleId::new(&args.source_locale)?, None);

    for event in extract_events(filter.as_mut(), &document)? {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match &event {
            Event::TextUnit(tu) => println!(
                "{:<16} {:<6} {}",
                event.event_type().to_string(),
                tu.id,
                tu.source().content().to_generic()
            ),
            _ => println!("{:<16} {}", event.event_type().to_string(), event.id().unwrap_or_default()),
        }
    }
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<Config> {
    if let Some(level) = args.log_level {
        logging::set_level(app_config::LogLevel::from(level).to_level_filter());
    }

    if !Path::new(&args.config_path).exists() {
        warn!("Config file not found at '{}', creating default config.", args.config_path);
    }
    let mut config = Config::load_or_create(&args.config_path)?;
    if let Some(source) = &args.source_locale {
        config.source_locale = source.clone();
    }
    if let Some(target) = &args.target_locale {
        config.target_locale = Some(target.clone());
    }
    if let Some(level) = args.log_level {
        config.log_level = level.into();
    }

    config.validate().context("Configuration validation failed")?;
    if args.log_level.is_none() {
        logging::set_level(config.log_level.to_level_filter());
    }
    Ok(config)
}

fn run_batch(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let mapper = FilterConfigurationMapper::new();
    let target = config.target()?;
    // The output suffix, if set, replaces the locale in output names
    let tag = if config.output_suffix.is_empty() {
        target.as_ref().map(|l| l.to_string()).unwrap_or_default()
    } else {
        config.output_suffix.clone()
    };

    let input_root = config
        .input_root
        .clone()
        .or_else(|| args.input_path.is_dir().then(|| args.input_path.clone()));
    let files = input_files(&mapper, &args.input_path)?;
    if files.is_empty() {
        warn!("No input files found in {:?}", args.input_path);
        return Ok(());
    }

    let mut batch = Batch::new(config.source()?, target.clone()).with_roots(input_root.clone(), None);
    batch.output_encoding = config.output_encoding.clone();
    for file in &files {
        let output = match (&config.output_root, &input_root) {
            (Some(out), Some(root)) => FileManager::mirrored_output_path(file, root, out),
            (Some(out), None) => FileManager::generate_output_path(file, Some(out), &tag),
            _ => FileManager::generate_output_path(file, None, &tag),
        };
        if output.exists() && !args.force_overwrite {
            warn!("Output file already exists: {:?}. Use -f to force overwrite.", output);
            continue;
        }
        let config_id = filter_id_for(&mapper, config.filter.config_id.as_deref(), file)?;
        batch.add(
            BatchItem::from_path(file, &config.input_encoding)
                .with_output(&output)
                .with_filter_config(&config_id),
        );
    }

    let mut filter: Box<dyn Filter> = match &config.filter.config_id {
        Some(id) => {
            let mut filter = mapper.create_filter(id)?;
            filter.set_parameters(&config.filter.parameters)?;
            filter
        }
        None => Box::new(mapper.create_compound_filter()),
    };
    let mut pipeline = config.create_pipeline()?;

    let progress_bar = ProgressBar::new(batch.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("=> "));

    let report = pipeline.process_batch_with(&batch, filter.as_mut(), |result| {
        progress_bar.set_message(result.name.clone());
        progress_bar.inc(1);
        if let Some(err) = &result.error {
            progress_bar.suspend(|| error!("{}: {}", result.name, err));
        }
    })?;
    progress_bar.finish_and_clear();
    pipeline.destroy();

    info!("{}", report.summary());
    if let Some(path) = &args.report {
        FileManager::write_bytes(path, serde_json::to_string_pretty(&report)?.as_bytes())?;
    }
    if !report.is_success() {
        return Err(anyhow!("{} item(s) failed", report.failed().count()));
    }
    Ok(())
}

fn run_roundtrip(args: RoundtripArgs) -> Result<()> {
    let mapper = FilterConfigurationMapper::new();
    let files = input_files(&mapper, &args.input_path)?;
    let mut failures = 0;

    for file in &files {
        let config_id = filter_id_for(&mapper, args.filter.as_deref(), file)?;
        // Fail on unknown ids before building the factory
        mapper.create_filter(&config_id)?;
        let factory_mapper = mapper.clone();
        let factory_id = config_id.clone();
        let comparison = RoundTripComparison::new(Box::new(move || {
            factory_mapper
                .create_filter(&factory_id)
                .unwrap_or_else(|_| Box::new(factory_mapper.create_compound_filter()))
        }))
        .ignore_code_ids(args.ignore_code_ids)
        .check_bytes(args.bytes);

        let document = RawDocument::from_path(file, &args.encoding, LocaleId::new("en")?, None);
        match comparison.compare(&document) {
            Ok(outcome) if outcome.is_success() => info!("OK   {} ({} events)", file.display(), outcome.events),
            Ok(outcome) => {
                failures += 1;
                error!("FAIL {}: {}", file.display(), outcome.differences.join("; "));
            }
            Err(e) => {
                failures += 1;
                error!("FAIL {}: {:#}", file.display(), e);
            }
        }
    }

    info!("Round trip: {}/{} file(s) passed", files.len() - failures, files.len());
    if failures > 0 {
        return Err(anyhow!("{} file(s) failed the round trip", failures));
    }
    Ok(())
}
