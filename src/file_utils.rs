use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Resolve a path against a root; absolute paths are kept as they are
    pub fn resolve<P: AsRef<Path>>(root: Option<&Path>, path: P) -> PathBuf {
        let path = path.as_ref();
        match root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Output path `<stem>.<locale>.<ext>` next to the input or in `output_dir`
    ///
    /// # Arguments
    /// * `input_file` - The input document
    /// * `output_dir` - Directory of the output, the input's one when `None`
    /// * `locale` - Locale tag inserted before the extension
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P, output_dir: Option<&Path>, locale: &str) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();

        let mut output_filename = stem.to_string();
        if !locale.is_empty() {
            output_filename.push('.');
            output_filename.push_str(locale);
        }
        if let Some(ext) = input_file.extension() {
            output_filename.push('.');
            output_filename.push_str(&ext.to_string_lossy());
        }

        let dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| input_file.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        dir.join(output_filename)
    }

    /// Same file name as the input, mirrored from `input_root` into `output_root`
    pub fn mirrored_output_path<P: AsRef<Path>>(input_file: P, input_root: &Path, output_root: &Path) -> PathBuf {
        let input_file = input_file.as_ref();
        match input_file.strip_prefix(input_root) {
            Ok(relative) => output_root.join(relative),
            Err(_) => output_root.join(input_file.file_name().unwrap_or_default()),
        }
    }

    /// Find files with one of the given extensions in a directory tree
    ///
    /// Extensions are matched without case and with or without a leading dot.
    /// An empty list matches every file. Results are sorted.
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let wanted: Vec<String> = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = wanted.is_empty()
                || path
                    .extension()
                    .map(|ext| wanted.contains(&ext.to_string_lossy().to_ascii_lowercase()))
                    .unwrap_or(false);
            if matches {
                result.push(path.to_path_buf());
            }
        }
        result.sort();
        Ok(result)
    }

    /// Write bytes to a file, creating parent directories
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
