use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const IGNORE_FILE_NAMES: [&str; 2] = [".gitignore", ".ignore"];

/// Answers whether recursive ignore-file rules exclude a path. Consulted
/// only after the local exclusion rules have let the path through.
pub trait IgnoreOracle {
    fn is_ignored(&mut self, absolute: &Path, is_dir: bool) -> bool;
}

/// `.gitignore` / `.ignore` semantics delegated to the `ignore` crate.
/// Matchers are loaded lazily per directory between the scan root and the
/// path, and the deepest directory with an opinion wins.
#[derive(Debug)]
pub struct IgnoreFileOracle {
    root: PathBuf,
    matchers: HashMap<PathBuf, Option<Gitignore>>,
}

impl IgnoreFileOracle {
    pub fn new(root: &Path) -> Self {
        IgnoreFileOracle {
            root: root.to_path_buf(),
            matchers: HashMap::new(),
        }
    }

    fn matcher_for(&mut self, dir: &Path) -> Option<&Gitignore> {
        self.matchers
            .entry(dir.to_path_buf())
            .or_insert_with(|| load_dir_matcher(dir))
            .as_ref()
    }

    /// Deepest directory in `dirs` with an opinion on `path` decides.
    fn deepest_match(&mut self, dirs: &[PathBuf], path: &Path, is_dir: bool) -> Option<bool> {
        for dir in dirs.iter().rev() {
            let Some(matcher) = self.matcher_for(dir) else {
                continue;
            };
            match matcher.matched(path, is_dir) {
                Match::Ignore(glob) => {
                    log::trace!(
                        "{} ignored by '{}' in {}",
                        path.display(),
                        glob.original(),
                        dir.display()
                    );
                    return Some(true);
                }
                Match::Whitelist(glob) => {
                    log::trace!(
                        "{} re-included by '{}' in {}",
                        path.display(),
                        glob.original(),
                        dir.display()
                    );
                    return Some(false);
                }
                Match::None => {}
            }
        }
        None
    }
}

impl IgnoreOracle for IgnoreFileOracle {
    fn is_ignored(&mut self, absolute: &Path, is_dir: bool) -> bool {
        let Ok(relative) = absolute.strip_prefix(&self.root) else {
            log::trace!(
                "{} is outside the scan root, ignore files do not apply",
                absolute.display()
            );
            return false;
        };

        // Scan root first, then each directory down to the path's parent.
        let mut dirs = vec![self.root.clone()];
        if let Some(parent) = relative.parent() {
            let mut current = self.root.clone();
            for component in parent.components() {
                current.push(component);
                dirs.push(current.clone());
            }
        }

        // An ignored directory cannot have anything below it re-included,
        // so ancestors are settled top-down before the path itself.
        for depth in 1..dirs.len() {
            let ancestor = dirs[depth].clone();
            if self.deepest_match(&dirs[..depth], &ancestor, true) == Some(true) {
                log::trace!(
                    "{} lies under ignored directory {}",
                    absolute.display(),
                    ancestor.display()
                );
                return true;
            }
        }

        self.deepest_match(&dirs, absolute, is_dir).unwrap_or(false)
    }
}

fn load_dir_matcher(dir: &Path) -> Option<Gitignore> {
    let mut builder = GitignoreBuilder::new(dir);
    let mut found = false;
    for name in IGNORE_FILE_NAMES {
        let file = dir.join(name);
        if !file.is_file() {
            continue;
        }
        found = true;
        if let Some(err) = builder.add(&file) {
            log::warn!("Problem reading ignore file {}: {}", file.display(), err);
        }
    }
    if !found {
        return None;
    }
    match builder.build() {
        Ok(gitignore) if gitignore.is_empty() => None,
        Ok(gitignore) => {
            log::debug!(
                "Loaded {} ignore rules from {}",
                gitignore.num_ignores() + gitignore.num_whitelists(),
                dir.display()
            );
            Some(gitignore)
        }
        Err(e) => {
            log::warn!("Skipping ignore files in {}: {}", dir.display(), e);
            None
        }
    }
}
