use crate::error::{AppError, Result};
use crate::path_info::absolutize;
use crate::rules::ExtensionSet;
use crate::walk::ScanRequest;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "ctxcat";
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";
pub const PROJECT_CONFIG_FILENAME: &str = ".ctxcat.toml";
pub const DEFAULT_MARKER: &str = "---";
pub const DEFAULT_HEADER: &str = "The following files are concatenated as context. Each file starts with a marker line carrying its path and ends with a closing marker line.\n\n";

const DEFAULT_EXTENSIONS: &[&str] = &[
    ".c", ".cc", ".cpp", ".cs", ".css", ".go", ".h", ".hpp", ".html", ".java", ".js", ".json",
    ".jsx", ".kt", ".md", ".php", ".py", ".rb", ".rs", ".scala", ".sh", ".sql", ".swift",
    ".toml", ".ts", ".tsx", ".txt", ".xml", ".yaml", ".yml",
];

const DEFAULT_EXCLUDE_BASENAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".venv",
    "__pycache__",
    "node_modules",
    "target",
];

/// Global configuration, read from `<config_dir>/ctxcat/config.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_exclude_basenames")]
    pub exclude_basenames: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default = "default_marker")]
    pub marker: String,
}

/// Per-project settings from `.ctxcat.toml` in the current working directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// CWD-relative exclusion globs.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Replaces the global extension allow-set when present.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}
fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}
fn default_exclude_basenames() -> Vec<String> {
    DEFAULT_EXCLUDE_BASENAMES.iter().map(|s| s.to_string()).collect()
}
fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}
fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
        }
    }
}
impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_basenames: default_exclude_basenames(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            marker: default_marker(),
        }
    }
}

impl Config {
    /// Working directory, canonicalized when possible so walker paths and
    /// CWD-relative display paths agree.
    pub fn determine_cwd() -> Result<PathBuf> {
        let cwd = env::current_dir().map_err(AppError::Io)?;
        Ok(cwd.canonicalize().unwrap_or(cwd))
    }

    /// Resolves the scan root against `cwd`. A root that does not exist is
    /// returned as-is: the scan reports it, manual files still go through.
    pub fn determine_scan_root(cli_dir: Option<&Path>, cwd: &Path) -> PathBuf {
        let requested = match cli_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).into_owned()),
            None => PathBuf::from("."),
        };
        let absolute = absolutize(&requested, cwd);
        match absolute.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) => {
                log::debug!(
                    "Could not canonicalize scan root {}: {}",
                    absolute.display(),
                    e
                );
                absolute
            }
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_FILENAME))
    }

    pub fn resolve_config_path(
        cli_config_file: Option<&str>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let path = PathBuf::from(shellexpand::tilde(p_str).into_owned());
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => match Self::default_config_path() {
                Some(default_path) if default_path.is_file() => {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                }
                Some(default_path) => {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
                None => {
                    log::debug!("No config directory available on this platform.");
                    Ok(None)
                }
            },
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn load(cli_config_file: Option<&str>, cli_disable_config: bool) -> Result<Self> {
        match Self::resolve_config_path(cli_config_file, cli_disable_config)? {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Baseline request from global and project settings; the caller layers
    /// command-line overrides on top.
    pub fn scan_request(
        &self,
        project: Option<&ProjectConfig>,
        root: PathBuf,
        cwd: PathBuf,
    ) -> ScanRequest {
        let extensions = project
            .and_then(|p| p.extensions.as_ref())
            .unwrap_or(&self.filters.extensions);
        ScanRequest {
            root,
            cwd,
            extensions: ExtensionSet::new(extensions),
            manual_paths: Vec::new(),
            basename_patterns: self.filters.exclude_basenames.clone(),
            cwd_patterns: project.map(|p| p.exclude.clone()).unwrap_or_default(),
            use_ignore_files: self.general.use_gitignore,
            prune_excluded_dirs: true,
            header: self.output.header.clone(),
            marker: self.output.marker.clone(),
        }
    }
}

impl ProjectConfig {
    pub fn path_in(cwd: &Path) -> PathBuf {
        cwd.join(PROJECT_CONFIG_FILENAME)
    }

    /// `Ok(None)` when the project file does not exist.
    pub fn load(cwd: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(cwd);
        if !path.is_file() {
            log::debug!("No project file at {}", path.display());
            return Ok(None);
        }
        log::info!("Loading project settings from: {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| AppError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let project = toml::from_str::<ProjectConfig>(&content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing project file '{}': {}",
                path.display(),
                e
            ))
        })?;
        log::debug!(
            "Project file supplies {} exclude patterns",
            project.exclude.len()
        );
        Ok(Some(project))
    }
}
