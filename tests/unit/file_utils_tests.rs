/*!
 * Tests for file and folder utilities
 */

use std::path::Path;

use tkit::file_utils::FileManager;

use crate::common;

/// Test that files are found recursively by extension, sorted
#[test]
fn test_findFiles_withExtensions_shouldMatchRecursively() {
    let dir = common::create_temp_dir().unwrap();
    common::create_test_file(dir.path(), "b.txt", "b").unwrap();
    common::create_test_file(dir.path(), "a.INI", "a").unwrap();
    common::create_test_file(dir.path(), "sub/c.txt", "c").unwrap();
    common::create_test_file(dir.path(), "sub/d.srt", "d").unwrap();

    let found = FileManager::find_files(dir.path(), &["txt", ".ini"]).unwrap();
    let names: Vec<_> = found
        .iter()
        .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        names,
        vec![
            Path::new("a.INI").to_path_buf(),
            Path::new("b.txt").to_path_buf(),
            Path::new("sub").join("c.txt"),
        ]
    );

    assert_eq!(FileManager::find_files(dir.path(), &[]).unwrap().len(), 4);
}

/// Test that outputs mirror the input tree under the output root
#[test]
fn test_mirroredOutputPath_shouldKeepRelativeLayout() {
    let input = Path::new("/data/in/docs/readme.txt");
    let output = FileManager::mirrored_output_path(input, Path::new("/data/in"), Path::new("/data/out"));
    assert_eq!(output, Path::new("/data/out/docs/readme.txt"));

    // Inputs outside the root land directly in the output root
    let output = FileManager::mirrored_output_path("/elsewhere/x.txt", Path::new("/data/in"), Path::new("/data/out"));
    assert_eq!(output, Path::new("/data/out/x.txt"));
}

/// Test that writing bytes creates missing directories
#[test]
fn test_writeBytes_shouldCreateParents() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("a").join("b").join("out.bin");
    FileManager::write_bytes(&path, b"\x00\xff").unwrap();
    assert!(FileManager::file_exists(&path));
    assert!(FileManager::dir_exists(dir.path().join("a")));
    assert_eq!(std::fs::read(&path).unwrap(), b"\x00\xff");
}
