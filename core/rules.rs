use crate::error::{AppError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    /// Matched against the final path segment only, wherever it sits in the tree.
    Basename,
    /// Matched against the whole CWD-relative path, exactly or as a directory prefix.
    CwdRelative,
}

impl fmt::Display for RuleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleScope::Basename => f.write_str("basename"),
            RuleScope::CwdRelative => f.write_str("cwd-relative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub pattern: String,
    pub scope: RuleScope,
}

/// Active glob patterns of one scope, compiled once per invocation.
///
/// Globs are single-segment shell globs: `*` and `?` never cross a `/`
/// unless the pattern spells the separator out. Every CWD-relative pattern
/// also gets a `<pattern>/**` companion so `build` covers everything under a
/// `build` directory without a trailing slash.
#[derive(Debug, Clone)]
pub struct RuleSet {
    scope: RuleScope,
    rules: Vec<ExclusionRule>,
    exact: GlobSet,
    prefix: GlobSet,
}

impl RuleSet {
    pub fn basename<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::compile(RuleScope::Basename, patterns)
    }

    pub fn cwd_relative<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::compile(RuleScope::CwdRelative, patterns)
    }

    pub fn empty(scope: RuleScope) -> Self {
        RuleSet {
            scope,
            rules: Vec::new(),
            exact: GlobSet::empty(),
            prefix: GlobSet::empty(),
        }
    }

    /// Malformed patterns are logged and dropped; the rest stay active.
    pub fn compile<I, S>(scope: RuleScope, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exact_builder = GlobSetBuilder::new();
        let mut prefix_builder = GlobSetBuilder::new();
        let mut rules = Vec::new();

        for raw in patterns {
            let raw = raw.as_ref();
            let processed = normalize_pattern(raw, scope);
            if processed.is_empty() {
                log::trace!("Skipping empty {} pattern", scope);
                continue;
            }

            let exact = match build_glob(&processed) {
                Ok(glob) => glob,
                Err(e) => {
                    log::warn!("Dropping invalid {} pattern \"{}\": {}", scope, raw, e);
                    continue;
                }
            };
            if scope == RuleScope::CwdRelative {
                let prefix_pattern = format!("{}/**", processed);
                match build_glob(&prefix_pattern) {
                    Ok(glob) => {
                        prefix_builder.add(glob);
                    }
                    Err(e) => {
                        log::warn!("Dropping invalid {} pattern \"{}\": {}", scope, raw, e);
                        continue;
                    }
                }
            }
            log::trace!(
                "Adding {} pattern: {} (processed as {})",
                scope,
                raw,
                processed
            );
            exact_builder.add(exact);
            rules.push(ExclusionRule {
                pattern: processed,
                scope,
            });
        }

        let exact = exact_builder.build().map_err(|e| {
            log::error!("Error building {} glob set: {}", scope, e);
            AppError::Glob(e.to_string())
        })?;
        let prefix = prefix_builder.build().map_err(|e| {
            log::error!("Error building {} prefix glob set: {}", scope, e);
            AppError::Glob(e.to_string())
        })?;

        log::debug!("Compiled {} active {} patterns", rules.len(), scope);
        Ok(RuleSet {
            scope,
            rules,
            exact,
            prefix,
        })
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First pattern (in configured order) whose glob matches `candidate` whole.
    pub fn match_exact(&self, candidate: &str) -> Option<&str> {
        first_match(&self.exact, &self.rules, candidate)
    }

    /// First pattern that names a directory root above `candidate`.
    pub fn match_prefix(&self, candidate: &str) -> Option<&str> {
        first_match(&self.prefix, &self.rules, candidate)
    }
}

fn first_match<'a>(set: &GlobSet, rules: &'a [ExclusionRule], candidate: &str) -> Option<&'a str> {
    if set.is_empty() {
        return None;
    }
    set.matches(candidate)
        .into_iter()
        .min()
        .and_then(|idx| rules.get(idx))
        .map(|rule| rule.pattern.as_str())
}

fn build_glob(pattern: &str) -> std::result::Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

fn normalize_pattern(raw: &str, scope: RuleScope) -> String {
    let mut pattern = raw.trim();
    if scope == RuleScope::CwdRelative {
        while let Some(rest) = pattern.strip_prefix("./") {
            pattern = rest;
        }
    }
    if pattern.len() > 1 {
        pattern = pattern.trim_end_matches('/');
    }
    pattern.to_string()
}

/// Allowed file extensions, stored dot-prefixed and lowercase.
/// An empty set admits every file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeSet<String>,
}

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        ExtensionSet { extensions }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn allows(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .is_some_and(|ext| self.extensions.contains(&ext))
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!(".{}", trimmed.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_does_not_cross_separators() {
        let set = RuleSet::cwd_relative(["src/*.rs"]).unwrap();
        assert_eq!(set.match_exact("src/main.rs"), Some("src/*.rs"));
        assert_eq!(set.match_exact("src/bin/main.rs"), None);
    }

    #[test]
    fn basename_globs_support_classes_and_question_mark() {
        let set = RuleSet::basename(["*.log", "file?.[ch]"]).unwrap();
        assert_eq!(set.match_exact("c.log"), Some("*.log"));
        assert_eq!(set.match_exact("file1.c"), Some("file?.[ch]"));
        assert_eq!(set.match_exact("file10.c"), None);
        assert_eq!(set.match_prefix("c.log/x"), None);
    }

    #[test]
    fn invalid_pattern_is_dropped_and_rest_stay_active() {
        let set = RuleSet::basename(["[unclosed", "*.tmp"]).unwrap();
        assert_eq!(set.rules().len(), 1);
        assert_eq!(set.match_exact("x.tmp"), Some("*.tmp"));
    }

    #[test]
    fn cwd_pattern_matches_directory_prefix_without_trailing_slash() {
        let set = RuleSet::cwd_relative(["build"]).unwrap();
        assert_eq!(set.match_exact("build"), Some("build"));
        assert_eq!(set.match_exact("build/out.o"), None);
        assert_eq!(set.match_prefix("build/out.o"), Some("build"));
        assert_eq!(set.match_prefix("build/deep/out.o"), Some("build"));
        assert_eq!(set.match_prefix("buildx/out.o"), None);
    }

    #[test]
    fn trailing_slash_and_dot_prefix_are_normalized() {
        let set = RuleSet::cwd_relative(["./docs/", "  "]).unwrap();
        assert_eq!(set.rules().len(), 1);
        assert_eq!(set.rules()[0].pattern, "docs");
        assert_eq!(set.match_exact("docs"), Some("docs"));
    }

    #[test]
    fn earliest_configured_pattern_is_reported() {
        let set = RuleSet::basename(["*.txt", "a.*"]).unwrap();
        assert_eq!(set.match_exact("a.txt"), Some("*.txt"));
    }

    #[test]
    fn empty_set_matches_nothing() {
        let set = RuleSet::empty(RuleScope::CwdRelative);
        assert!(set.is_empty());
        assert_eq!(set.match_exact("anything"), None);
        assert_eq!(set.match_prefix("anything/below"), None);
    }

    #[test]
    fn extension_set_normalizes_case_and_dot() {
        let set = ExtensionSet::new(["TXT", ".Rs", " ", "."]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![".rs", ".txt"]);
        assert!(set.allows(Path::new("dir/NOTES.Txt")));
        assert!(set.allows(Path::new("main.rs")));
        assert!(!set.allows(Path::new("Makefile")));
        assert!(!set.allows(Path::new("c.log")));
    }

    #[test]
    fn empty_extension_set_allows_everything() {
        let set = ExtensionSet::default();
        assert!(set.allows(Path::new("Makefile")));
        assert!(set.allows(Path::new("x.bin")));
    }
}
