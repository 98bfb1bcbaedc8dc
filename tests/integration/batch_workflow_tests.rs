/*!
 * Batches over files on disk, from input folder to output folder
 */

use std::fs;
use std::path::PathBuf;

use tkit::filters::{FilterConfigurationMapper, LineFilter};
use tkit::params::Parameters;
use tkit::pipeline::{Batch, BatchItem, Pipeline};
use tkit::steps::{self, DocumentSplitterStep, FilterEventsWriterStep, WordCountStep};

use crate::common;

/// Test that a mixed folder is pseudo-translated into mirrored outputs
#[test]
fn test_batch_mixedFolder_shouldWriteTranslatedOutputs() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input_root = dir.path().join("in");
    let output_root = dir.path().join("out");
    common::create_test_file(&input_root, "readme.txt", "Hello world\n").unwrap();
    common::create_test_file(&input_root, "conf/app.ini", "[s]\nkey = Hi 7\n").unwrap();

    let mapper = FilterConfigurationMapper::new();
    let mut batch = Batch::new(common::en(), Some(common::fr()))
        .with_roots(Some(input_root.clone()), Some(output_root.clone()));
    for (path, config) in [("readme.txt", "okf_plaintext"), ("conf/app.ini", "okf_ini")] {
        batch.add(
            BatchItem::from_path(path, "UTF-8")
                .with_output(path)
                .with_filter_config(config),
        );
    }

    let mut pipeline = Pipeline::new()
        .with_step(Box::new(WordCountStep::new()))
        .with_step(steps::create_configured_step("pseudo_translate", &Parameters::new().with("mode", "xn")).unwrap())
        .with_step(Box::new(FilterEventsWriterStep::new()));
    let report = pipeline
        .process_batch(&batch, &mut mapper.create_compound_filter())
        .unwrap();

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(fs::read_to_string(output_root.join("readme.txt")).unwrap(), "Xxxxx xxxxx\n");
    assert_eq!(
        fs::read_to_string(output_root.join("conf").join("app.ini")).unwrap(),
        "[s]\nkey = Xx N\n"
    );
    assert_eq!(pipeline.step::<WordCountStep>().unwrap().batch_total(), 4);

    // Inputs are left untouched
    assert_eq!(fs::read_to_string(input_root.join("readme.txt")).unwrap(), "Hello world\n");
}

/// Test that split parts saved to disk concatenate back to the input
#[test]
fn test_batch_splitterParts_shouldRebuildOriginalBytes() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "notes.txt", common::SAMPLE_TEXT).unwrap();
    let parts_dir = dir.path().join("parts");

    let params = Parameters::new()
        .with("parts", 2)
        .with("output_dir", parts_dir.to_string_lossy().as_ref());
    let mut batch = Batch::new(common::en(), None);
    batch.add(BatchItem::from_path(&input, "UTF-8").with_output(dir.path().join("notes.out.txt")));

    let mut pipeline = Pipeline::new()
        .with_step(steps::create_configured_step("document_splitter", &params).unwrap())
        .with_step(Box::new(FilterEventsWriterStep::new()));
    let report = pipeline.process_batch(&batch, &mut LineFilter::new()).unwrap();
    assert!(report.is_success(), "{}", report.summary());

    let part_names: Vec<PathBuf> = (1..=pipeline.step::<DocumentSplitterStep>().unwrap().parts().len())
        .map(|i| parts_dir.join(format!("notes.part{}.txt", i)))
        .collect();
    assert_eq!(part_names.len(), 2);

    let mut joined = Vec::new();
    for part in &part_names {
        joined.extend(fs::read(part).unwrap());
    }
    assert_eq!(joined, common::SAMPLE_TEXT.as_bytes());

    // The whole document still reaches the writer
    assert_eq!(fs::read(dir.path().join("notes.out.txt")).unwrap(), common::SAMPLE_TEXT.as_bytes());
}

/// Test that joined parts give back the same document
#[test]
fn test_splitJoin_shouldKeepDocument() {
    let events = common::extract(&mut tkit::filters::IniFilter::new(), common::SAMPLE_INI);
    let parts = steps::split_events(events.clone(), 3);
    assert!(parts.len() > 1);

    let joined = steps::join_parts(parts);
    assert_eq!(common::write(&joined, None), common::SAMPLE_INI.as_bytes());
}

/// Test that the command runs once the output exists, with variables expanded
#[cfg(unix)]
#[test]
fn test_batch_externalCommand_shouldSeeWrittenOutput() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "a.txt", "text\n").unwrap();
    let output = dir.path().join("a.fr.txt");
    let marker = dir.path().join("marker");

    let command = format!("test -f ${{outputPath}} && echo ${{srcLang}}-${{trgLang}} > {}", marker.display());
    let mut batch = Batch::new(common::en(), Some(common::fr()));
    batch.add(BatchItem::from_path(&input, "UTF-8").with_output(&output));

    let mut pipeline = Pipeline::new()
        .with_step(Box::new(FilterEventsWriterStep::new()))
        .with_step(steps::create_configured_step("external_command", &Parameters::new().with("command", command)).unwrap());
    let report = pipeline.process_batch(&batch, &mut LineFilter::new()).unwrap();

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(fs::read_to_string(&marker).unwrap().trim(), "en-fr");
}
