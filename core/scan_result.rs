use crate::assemble::OutputAssembler;
use crate::error::{ItemError, Result};
use crate::exclusion::ExclusionReason;
use log;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// A file that made it into the output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub path: String,
    pub reason: ExclusionReason,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Manual files in the order given, then scanned files sorted by path.
    pub files: Vec<FileInfo>,
    pub empty: Vec<String>,
    pub errors: BTreeMap<String, ItemError>,
    pub excluded: Vec<Exclusion>,
    pub total_size: u64,
}

impl ScanResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Shared sink for the manual pass and the walk. Owns the dedup set of
/// absolute paths and holds scanned blocks back until [`finish`] so they can
/// be emitted in lexicographic order.
///
/// [`finish`]: ScanAccumulator::finish
#[derive(Debug, Default)]
pub struct ScanAccumulator {
    processed: HashSet<PathBuf>,
    result: ScanResult,
    pending: Vec<(FileInfo, Vec<u8>)>,
}

impl ScanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `absolute` already contributed to this scan.
    pub fn mark_processed(&mut self, absolute: &Path) -> bool {
        self.processed.insert(absolute.to_path_buf())
    }

    pub fn is_processed(&self, absolute: &Path) -> bool {
        self.processed.contains(absolute)
    }

    /// Manual content goes straight to the stream, in the order given.
    pub fn record_manual(&mut self, path: String, content: &[u8], output: &mut OutputAssembler) {
        if content.is_empty() {
            self.record_empty(path);
            return;
        }
        output.append(&path, content);
        let size = content.len() as u64;
        self.result.total_size += size;
        self.result.files.push(FileInfo {
            path,
            size,
            manual: true,
        });
    }

    pub fn record_scanned(&mut self, path: String, content: Vec<u8>) {
        if content.is_empty() {
            self.record_empty(path);
            return;
        }
        let size = content.len() as u64;
        self.result.total_size += size;
        self.pending.push((
            FileInfo {
                path,
                size,
                manual: false,
            },
            content,
        ));
    }

    pub fn record_empty(&mut self, path: String) {
        log::debug!("Empty file: {}", path);
        self.result.empty.push(path);
    }

    pub fn record_error(&mut self, path: String, error: ItemError) {
        log::warn!("{}: {}", path, error);
        self.result.errors.insert(path, error);
    }

    pub fn record_excluded(&mut self, path: String, reason: ExclusionReason, pattern: String) {
        self.result.excluded.push(Exclusion {
            path,
            reason,
            pattern,
        });
    }

    pub fn file_count(&self) -> usize {
        self.result.files.len() + self.pending.len()
    }

    pub fn finish(mut self, output: &mut OutputAssembler) -> ScanResult {
        self.pending.sort_by(|a, b| a.0.path.cmp(&b.0.path));
        for (info, content) in self.pending {
            output.append(&info.path, &content);
            self.result.files.push(info);
        }
        self.result.empty.sort();
        self.result.excluded.sort_by(|a, b| a.path.cmp(&b.path));
        log::info!(
            "Scan finished: {} files ({} bytes), {} empty, {} errors, {} excluded",
            self.result.files.len(),
            self.result.total_size,
            self.result.empty.len(),
            self.result.errors.len(),
            self.result.excluded.len()
        );
        self.result
    }
}
