/*!
 * Tests for loading, saving and validating the configuration file
 */

use tkit::app_config::{Config, StepConfig};
use tkit::params::Parameters;
use tkit::steps::PseudoTranslateStep;

use crate::common;

/// Test that a saved configuration loads back unchanged
#[test]
fn test_config_saveThenLoad_shouldKeepSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("conf.json");

    let mut config = Config::default();
    config.target_locale = Some("de-CH".to_string());
    config.steps.insert(
        0,
        StepConfig {
            name: "pseudo_translate".to_string(),
            parameters: Parameters::new().with("mode", "xn"),
        },
    );
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.target_locale.as_deref(), Some("de-CH"));
    assert_eq!(loaded.steps, config.steps);
    assert!(loaded.validate().is_ok());
}

/// Test that a missing file is created with the defaults
#[test]
fn test_config_loadOrCreate_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.source_locale, "en");
    assert_eq!(Config::load(&path).unwrap().steps, config.steps);
}

/// Test that a malformed file is reported with its path
#[test]
fn test_config_loadMalformed_shouldFailWithPath() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ not json").unwrap();

    let error = Config::load(&path).unwrap_err();
    assert!(format!("{:#}", error).contains("conf.json"));
}

/// Test that step parameters are checked by validation
#[test]
fn test_config_validate_withBadStepParameter_shouldFail() {
    let mut config = Config::default();
    config.steps = vec![StepConfig {
        name: "pseudo_translate".to_string(),
        parameters: Parameters::new().with("mode", "klingon"),
    }];
    assert!(config.validate().is_err());
}

/// Test that the pipeline holds the configured steps in order
#[test]
fn test_config_createPipeline_shouldConfigureSteps() {
    let mut config = Config::default();
    config.steps.insert(0, StepConfig::new("pseudo_translate"));

    let pipeline = config.create_pipeline().unwrap();
    let names: Vec<&str> = pipeline.steps().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["pseudo_translate", "filter_events_writer"]);
    assert!(pipeline.step::<PseudoTranslateStep>().is_some());
}
