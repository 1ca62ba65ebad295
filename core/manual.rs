use crate::assemble::OutputAssembler;
use crate::error::ItemError;
use crate::path_info::{PathInfo, absolutize};
use crate::scan_result::ScanAccumulator;
use log;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads explicitly requested files ahead of the walk. No exclusion rule or
/// ignore file is consulted here; failures land in the error map.
///
/// Every resolved path is marked processed so the walk skips it later.
pub fn process_manual_files(
    paths: &[PathBuf],
    cwd: &Path,
    acc: &mut ScanAccumulator,
    output: &mut OutputAssembler,
) {
    if paths.is_empty() {
        return;
    }
    log::info!("Processing {} manual files...", paths.len());

    for requested in paths {
        let absolute = absolutize(requested, cwd);
        let display = PathInfo::classify(&absolute, cwd, false).relative;

        if !acc.mark_processed(&absolute) {
            log::debug!("Manual file {} listed more than once, skipping", display);
            continue;
        }

        let metadata = match fs::metadata(&absolute) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                acc.record_error(display, ItemError::ManualNotFound);
                continue;
            }
            Err(e) => {
                acc.record_error(display, ItemError::from(e));
                continue;
            }
        };
        if metadata.is_dir() {
            acc.record_error(display, ItemError::IsDirectory);
            continue;
        }

        match fs::read(&absolute) {
            Ok(content) => {
                log::trace!("Read manual file {} ({} bytes)", display, content.len());
                acc.record_manual(display, &content, output);
            }
            Err(e) => acc.record_error(display, ItemError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(paths: &[&str], cwd: &Path) -> (crate::scan_result::ScanResult, Vec<u8>) {
        let mut acc = ScanAccumulator::new();
        let mut out = OutputAssembler::new("", "---");
        let owned: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        process_manual_files(&owned, cwd, &mut acc, &mut out);
        let result = acc.finish(&mut out);
        (result, out.into_bytes())
    }

    #[test]
    fn reads_files_in_given_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "bee").unwrap();
        fs::write(tmp.path().join("a.txt"), "ay").unwrap();
        let (result, out) = run(&["b.txt", "a.txt"], tmp.path());
        let names: Vec<&str> = result.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert!(result.files.iter().all(|f| f.manual));
        assert_eq!(result.total_size, 5);
        assert_eq!(String::from_utf8(out).unwrap(), "--- b.txt\nbee\n---\n--- a.txt\nay\n---\n");
    }

    #[test]
    fn missing_and_directory_paths_are_errors() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("dir")).unwrap();
        let (result, out) = run(&["nope.txt", "dir"], tmp.path());
        assert!(result.files.is_empty());
        assert_eq!(result.errors.get("nope.txt"), Some(&ItemError::ManualNotFound));
        assert_eq!(result.errors.get("dir"), Some(&ItemError::IsDirectory));
        assert!(out.is_empty());
    }

    #[test]
    fn empty_manual_file_goes_to_empty_list() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blank"), "").unwrap();
        let (result, _) = run(&["blank"], tmp.path());
        assert!(result.files.is_empty());
        assert_eq!(result.empty, vec!["blank".to_string()]);
    }

    #[test]
    fn duplicate_spellings_are_processed_once() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.rs"), "fn x() {}").unwrap();
        let abs = tmp.path().join("x.rs");
        let abs = abs.to_str().unwrap();
        let (result, _) = run(&["x.rs", "./x.rs", abs], tmp.path());
        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn absolute_paths_outside_cwd_are_displayed_relative() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("cwd")).unwrap();
        fs::write(tmp.path().join("outside.txt"), "o").unwrap();
        let outside = tmp.path().join("outside.txt");
        let (result, _) = run(&[outside.to_str().unwrap()], &tmp.path().join("cwd"));
        assert_eq!(result.files[0].path, "../outside.txt");
    }
}
