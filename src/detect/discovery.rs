use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use walkdir::WalkDir;

/// Wildcard file-name matcher for `--file-spec`.
///
/// Supports `*` and `?`; several patterns may be separated by `,` or `;`.
/// Matching is case-insensitive since evidence often comes off Windows shares.
#[derive(Debug, Clone)]
pub struct FileSpec {
    matcher: Regex,
}

impl FileSpec {
    pub fn parse(spec: &str) -> Result<Self, regex::Error> {
        let patterns: Vec<String> = spec
            .split([',', ';'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        let alternatives: Vec<String> = if patterns.is_empty() {
            vec![".*".to_string()]
        } else {
            patterns.iter().map(|p| wildcard_to_regex(p)).collect()
        };

        let matcher = RegexBuilder::new(&format!("^(?:{})$", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;

        Ok(Self { matcher })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}

/// Result of walking the source directory
#[derive(Debug, Default)]
pub struct Discovered {
    pub files: Vec<PathBuf>,
    /// Entries the walk could not read
    pub errors: Vec<(PathBuf, String)>,
}

/// Collect candidate files under `root` in sorted walk order.
///
/// `max_depth` counts directory levels below `root`; `Some(0)` only looks at
/// files directly inside it.
pub fn discover_files(root: &Path, spec: &FileSpec, max_depth: Option<usize>) -> Discovered {
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth.saturating_add(1));
    }

    let mut discovered = Discovered::default();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if spec.matches(&name) {
                    discovered.files.push(entry.into_path());
                } else {
                    debug!("Skipping {} (does not match file spec)", entry.path().display());
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                warn!("Failed to read {}: {}", path.display(), e);
                discovered.errors.push((path, e.to_string()));
            }
        }
    }

    discovered
}
