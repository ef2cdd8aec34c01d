use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};
use log::debug;

use crate::config::env_vars::{expand_env_vars, normalize_path_for_os};
use crate::error::ConfigError;

// Configurations shipped inside the binary; the fallback for includes
static BUNDLED_CONFIG_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/config");

/// Identity of a configuration document, used for cycle detection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    /// A file on disk, canonicalized where possible
    File(PathBuf),
    /// A document in the bundled configuration directory
    Bundled(String),
}

impl SourceId {
    /// Short name used to derive report file names
    pub fn stem(&self) -> String {
        let path = match self {
            SourceId::File(path) => path.clone(),
            SourceId::Bundled(name) => PathBuf::from(name),
        };
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::File(path) => write!(f, "{}", path.display()),
            SourceId::Bundled(name) => write!(f, "bundled:{}", name),
        }
    }
}

/// Finds and reads configuration documents
pub trait ConfigLocator: Send + Sync {
    /// Locate `name`, relative to the including document when given
    fn locate(&self, name: &str, including: Option<&SourceId>) -> Option<SourceId>;

    /// Read the text of a located document
    fn read(&self, source: &SourceId) -> Result<String, ConfigError>;

    /// Human-readable list of the places `locate` looks, for error messages
    fn search_description(&self, name: &str, including: Option<&SourceId>) -> String;
}

/// Locator over the filesystem with the bundled directory as fallback
#[derive(Debug, Clone)]
pub struct FsLocator {
    bundled: Option<&'static Dir<'static>>,
}

impl Default for FsLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FsLocator {
    pub fn new() -> Self {
        Self {
            bundled: Some(&BUNDLED_CONFIG_DIR),
        }
    }

    /// Locator that only looks on disk
    pub fn without_bundled() -> Self {
        Self { bundled: None }
    }

    fn disk_candidate(&self, name: &str, including: Option<&SourceId>) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        match including {
            Some(SourceId::File(parent)) => {
                let base = parent.parent().unwrap_or_else(|| Path::new("."));
                Some(base.join(path))
            }
            Some(SourceId::Bundled(_)) => None,
            None => Some(path.to_path_buf()),
        }
    }

    fn bundled_candidates(&self, name: &str, including: Option<&SourceId>) -> Vec<String> {
        let mut candidates = Vec::new();
        if let Some(SourceId::Bundled(parent)) = including {
            if let Some((dir, _)) = parent.rsplit_once('/') {
                candidates.push(normalize_bundled(&format!("{}/{}", dir, name)));
            }
        }
        candidates.push(normalize_bundled(name));
        candidates.dedup();
        candidates
    }
}

impl ConfigLocator for FsLocator {
    fn locate(&self, name: &str, including: Option<&SourceId>) -> Option<SourceId> {
        let name = normalize_path_for_os(&expand_env_vars(name.trim()));

        if let Some(path) = self.disk_candidate(&name, including) {
            if path.is_file() {
                let canonical = fs::canonicalize(&path).unwrap_or(path);
                debug!("Located configuration {} on disk", canonical.display());
                return Some(SourceId::File(canonical));
            }
        }

        let bundled = self.bundled?;
        self.bundled_candidates(&name, including)
            .into_iter()
            .find(|candidate| bundled.get_file(candidate).is_some())
            .map(|candidate| {
                debug!("Located configuration {} in bundled directory", candidate);
                SourceId::Bundled(candidate)
            })
    }

    fn read(&self, source: &SourceId) -> Result<String, ConfigError> {
        match source {
            SourceId::File(path) => fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            }),
            SourceId::Bundled(name) => self
                .bundled
                .and_then(|dir| dir.get_file(name))
                .and_then(|file| file.contents_utf8())
                .map(str::to_string)
                .ok_or_else(|| ConfigError::NotFound {
                    name: name.clone(),
                    searched: "bundled configuration directory".to_string(),
                }),
        }
    }

    fn search_description(&self, name: &str, including: Option<&SourceId>) -> String {
        let mut places = Vec::new();
        if let Some(path) = self.disk_candidate(name, including) {
            places.push(path.display().to_string());
        }
        if self.bundled.is_some() {
            places.extend(
                self.bundled_candidates(name, including)
                    .into_iter()
                    .map(|c| format!("bundled:{}", c)),
            );
        }
        places.join(", ")
    }
}

/// Names of every configuration shipped in the bundled directory
pub fn list_bundled_configs() -> Vec<String> {
    let mut names = Vec::new();
    collect_yaml_files(&BUNDLED_CONFIG_DIR, &mut names);
    names.sort();
    names
}

fn collect_yaml_files(dir: &Dir<'_>, names: &mut Vec<String>) {
    for file in dir.files() {
        let path = file.path().to_string_lossy().replace('\\', "/");
        if path.ends_with(".yaml") || path.ends_with(".yml") {
            names.push(path);
        }
    }
    for child in dir.dirs() {
        collect_yaml_files(child, names);
    }
}

/// Collapse `.` and `..` segments of a bundled path
fn normalize_bundled(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
