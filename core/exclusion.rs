//! INCLUDE/EXCLUDE decisions for paths discovered during a scan.
//!
//! Ancestor directories are re-evaluated against the pattern lists for
//! every path, so a decision never depends on which directories the walker
//! happened to visit first. The excluded-directory cache is only consulted
//! for diagnostics.

use crate::error::Result;
use crate::path_info::{PathInfo, slash_basename};
use crate::rules::{RuleScope, RuleSet};
use log;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ExclusionReason {
    #[serde(rename = "basename match")]
    BasenameMatch,
    #[serde(rename = "CWD match")]
    CwdMatch,
    #[serde(rename = "CWD prefix match")]
    CwdPrefixMatch,
    #[serde(rename = "ancestor basename match")]
    AncestorBasenameMatch,
    #[serde(rename = "ancestor CWD match")]
    AncestorCwdMatch,
    #[serde(rename = "ancestor CWD prefix match")]
    AncestorCwdPrefixMatch,
    #[serde(rename = "ignore file match")]
    IgnoreFile,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::BasenameMatch => "basename match",
            ExclusionReason::CwdMatch => "CWD match",
            ExclusionReason::CwdPrefixMatch => "CWD prefix match",
            ExclusionReason::AncestorBasenameMatch => "ancestor basename match",
            ExclusionReason::AncestorCwdMatch => "ancestor CWD match",
            ExclusionReason::AncestorCwdPrefixMatch => "ancestor CWD prefix match",
            ExclusionReason::IgnoreFile => "ignore file match",
        }
    }

    pub fn is_ancestor(&self) -> bool {
        matches!(
            self,
            ExclusionReason::AncestorBasenameMatch
                | ExclusionReason::AncestorCwdMatch
                | ExclusionReason::AncestorCwdPrefixMatch
        )
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Include,
    Exclude {
        reason: ExclusionReason,
        pattern: String,
    },
}

impl Decision {
    fn exclude(reason: ExclusionReason, pattern: &str) -> Self {
        Decision::Exclude {
            reason,
            pattern: pattern.to_string(),
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, Decision::Exclude { .. })
    }
}

/// Capability seam for the coordinator; test doubles implement it too.
pub trait Excluder {
    fn decide(&mut self, info: &PathInfo) -> Decision;

    /// Snapshot of directories recorded as excluded, for reporting.
    fn excluded_directories(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Default [`Excluder`]: basename globs, then CWD-relative globs, applied to
/// every ancestor (nearest first) and then to the path itself.
#[derive(Debug)]
pub struct ExclusionEngine {
    basename: RuleSet,
    cwd_relative: RuleSet,
    excluded_dirs: BTreeMap<String, String>,
}

impl ExclusionEngine {
    pub fn new(basename: RuleSet, cwd_relative: RuleSet) -> Self {
        debug_assert_eq!(basename.scope(), RuleScope::Basename);
        debug_assert_eq!(cwd_relative.scope(), RuleScope::CwdRelative);
        ExclusionEngine {
            basename,
            cwd_relative,
            excluded_dirs: BTreeMap::new(),
        }
    }

    pub fn from_patterns<B, C>(basename: &[B], cwd_relative: &[C]) -> Result<Self>
    where
        B: AsRef<str>,
        C: AsRef<str>,
    {
        Ok(Self::new(
            RuleSet::basename(basename)?,
            RuleSet::cwd_relative(cwd_relative)?,
        ))
    }

    /// Directories proven excluded so far: CWD-relative path → pattern.
    pub fn excluded_dirs(&self) -> &BTreeMap<String, String> {
        &self.excluded_dirs
    }

    /// Pure decision for `info`; does not touch the cache.
    pub fn evaluate(&self, info: &PathInfo) -> Decision {
        if let Some(decision) = self.check_ancestors(info) {
            return decision;
        }
        self.check_self(info).unwrap_or(Decision::Include)
    }

    fn check_ancestors(&self, info: &PathInfo) -> Option<Decision> {
        for ancestor in info.ancestors() {
            let name = slash_basename(ancestor);
            let decision = if is_traversal_segment(name) {
                None
            } else {
                self.basename
                    .match_exact(name)
                    .map(|p| Decision::exclude(ExclusionReason::AncestorBasenameMatch, p))
            }
            .or_else(|| {
                self.cwd_relative
                    .match_exact(ancestor)
                    .map(|p| Decision::exclude(ExclusionReason::AncestorCwdMatch, p))
            })
            .or_else(|| {
                self.cwd_relative
                    .match_prefix(ancestor)
                    .map(|p| Decision::exclude(ExclusionReason::AncestorCwdPrefixMatch, p))
            });

            if let Some(decision) = decision {
                if let Some(cached) = self.excluded_dirs.get(ancestor) {
                    log::trace!(
                        "{} lies under {} (excluded earlier by '{}')",
                        info.relative,
                        ancestor,
                        cached
                    );
                } else {
                    log::trace!(
                        "{} lies under {} (not yet visited as a directory)",
                        info.relative,
                        ancestor
                    );
                }
                return Some(decision);
            }
        }
        None
    }

    fn check_self(&self, info: &PathInfo) -> Option<Decision> {
        self.basename
            .match_exact(&info.basename)
            .map(|p| Decision::exclude(ExclusionReason::BasenameMatch, p))
            .or_else(|| {
                self.cwd_relative
                    .match_exact(&info.relative)
                    .map(|p| Decision::exclude(ExclusionReason::CwdMatch, p))
            })
            .or_else(|| {
                self.cwd_relative
                    .match_prefix(&info.relative)
                    .map(|p| Decision::exclude(ExclusionReason::CwdPrefixMatch, p))
            })
    }
}

impl Excluder for ExclusionEngine {
    fn decide(&mut self, info: &PathInfo) -> Decision {
        let decision = self.evaluate(info);
        match &decision {
            Decision::Exclude { reason, pattern } => {
                if info.is_dir {
                    log::debug!(
                        "Excluding directory {} ({}: '{}')",
                        info.relative,
                        reason,
                        pattern
                    );
                    self.excluded_dirs
                        .entry(info.relative.clone())
                        .or_insert_with(|| pattern.clone());
                } else {
                    log::trace!("Excluding {} ({}: '{}')", info.relative, reason, pattern);
                }
            }
            Decision::Include => log::trace!("Including {}", info.relative),
        }
        decision
    }

    fn excluded_directories(&self) -> BTreeMap<String, String> {
        self.excluded_dirs.clone()
    }
}

fn is_traversal_segment(name: &str) -> bool {
    matches!(name, "" | "." | "..")
}
