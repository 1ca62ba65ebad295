use log;
use std::path::{Component, Path, PathBuf};

/// One filesystem entry under consideration, described relative to the
/// current working directory. Exclusion patterns and displayed paths are
/// always CWD-relative, even when the scan root is a subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub absolute: PathBuf,
    pub relative: String,
    pub basename: String,
    pub is_dir: bool,
}

impl PathInfo {
    pub fn classify(absolute: &Path, cwd: &Path, is_dir: bool) -> Self {
        let relative = match pathdiff::diff_paths(absolute, cwd) {
            Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Some(rel) => to_slash(&rel),
            None => {
                log::debug!(
                    "Could not relativize {} against {}, using absolute path",
                    absolute.display(),
                    cwd.display()
                );
                to_slash(absolute)
            }
        };
        let basename = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative.clone());

        PathInfo {
            absolute: absolute.to_path_buf(),
            relative,
            basename,
            is_dir,
        }
    }

    /// Parent directories of `relative`, nearest first, stopping before the
    /// root marker (`.`, `/` or an empty path).
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            remaining: Some(self.relative.as_str()),
        }
    }
}

pub struct Ancestors<'a> {
    remaining: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.remaining?;
        match current.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() && parent != "." => {
                self.remaining = Some(parent);
                Some(parent)
            }
            _ => {
                self.remaining = None;
                None
            }
        }
    }
}

/// Final segment of a slash-separated path.
pub fn slash_basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Joins path components with `/` regardless of the platform separator.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Lexically removes `.` and resolves `..` without touching the filesystem,
/// so symlinked entries keep the path the walker reports for them.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves `path` against `cwd` when relative, then normalizes it.
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_relative_to_cwd_not_scan_root() {
        let info = PathInfo::classify(
            Path::new("/work/proj/sub/src/main.rs"),
            Path::new("/work/proj"),
            false,
        );
        assert_eq!(info.relative, "sub/src/main.rs");
        assert_eq!(info.basename, "main.rs");
        assert!(!info.is_dir);
    }

    #[test]
    fn classify_outside_cwd_uses_parent_segments() {
        let info = PathInfo::classify(Path::new("/work/other/a.txt"), Path::new("/work/proj"), false);
        assert_eq!(info.relative, "../other/a.txt");
    }

    #[test]
    fn classify_cwd_itself_is_dot() {
        let info = PathInfo::classify(Path::new("/work/proj"), Path::new("/work/proj"), true);
        assert_eq!(info.relative, ".");
        assert_eq!(info.basename, "proj");
    }

    #[test]
    fn classify_keeps_absolute_path_against_relative_cwd() {
        let info = PathInfo::classify(Path::new("/data/x/y.txt"), Path::new("rel/base"), false);
        assert_eq!(info.relative, "/data/x/y.txt");
        assert_eq!(info.basename, "y.txt");
    }

    #[test]
    fn classify_unrelatable_path_is_kept_slash_normalized() {
        let info = PathInfo::classify(Path::new("rel/x.txt"), Path::new("/abs"), false);
        assert_eq!(info.relative, "rel/x.txt");
        assert_eq!(info.basename, "x.txt");
    }

    #[test]
    fn ancestors_nearest_first() {
        let info = PathInfo::classify(Path::new("/p/a/b/c.txt"), Path::new("/p"), false);
        let chain: Vec<&str> = info.ancestors().collect();
        assert_eq!(chain, vec!["a/b", "a"]);
    }

    #[test]
    fn ancestors_of_absolute_fallback_stop_at_root() {
        let info = PathInfo::classify(Path::new("/data/x/y.txt"), Path::new("rel"), false);
        let chain: Vec<&str> = info.ancestors().collect();
        assert_eq!(chain, vec!["/data/x", "/data"]);
    }

    #[test]
    fn top_level_entry_has_no_ancestors() {
        let info = PathInfo::classify(Path::new("/p/a.txt"), Path::new("/p"), false);
        assert_eq!(info.ancestors().count(), 0);
    }

    #[test]
    fn slash_basename_takes_last_segment() {
        assert_eq!(slash_basename("a/b/c"), "c");
        assert_eq!(slash_basename("c"), "c");
    }

    #[test]
    fn normalize_resolves_dots_lexically() {
        assert_eq!(
            normalize_path(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(absolutize(Path::new("./x/../y.txt"), Path::new("/w")), PathBuf::from("/w/y.txt"));
        assert_eq!(absolutize(Path::new("/abs/f"), Path::new("/w")), PathBuf::from("/abs/f"));
    }
}
