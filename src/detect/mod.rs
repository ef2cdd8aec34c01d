//! System detection: discover evidence files, decode them and classify each
//! one into a [`System`].
//!
//! Reading and classification run on the rayon pool; the collected order is
//! the sorted walk order, and discovery indices are assigned afterwards so
//! they stay dense and deterministic even when files are skipped.

mod classifier;
mod discovery;
mod encoding;
mod sections;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::constants::{DEFAULT_FILE_SPEC, DEFAULT_MAX_FILE_SIZE, DEFAULT_MIN_CONFIDENCE};
use crate::error::DetectError;
use crate::models::System;
use crate::utils::hash::sha256_hex;

pub use classifier::{system_name_for, Evidence, SignatureClassifier, SystemClassifier};
pub use discovery::{discover_files, FileSpec};
pub use encoding::{decode, detect_encoding, DetectedEncoding};
pub use sections::list_sections;

/// Knobs for discovery and decoding
#[derive(Debug, Clone)]
pub struct DetectOptions {
    pub file_spec: String,
    /// Directory levels below the source root; `None` is unbounded
    pub max_depth: Option<usize>,
    /// Files above this many bytes are skipped
    pub max_file_size: u64,
    /// Files decoded with lower confidence are skipped
    pub min_confidence: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            file_spec: DEFAULT_FILE_SPEC.to_string(),
            max_depth: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// A file that was discovered but not turned into a system
#[derive(Debug, Clone, Serialize)]
pub struct DetectionWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Systems in discovery order plus every skipped file
#[derive(Debug, Default)]
pub struct Detection {
    pub systems: Vec<Arc<System>>,
    pub warnings: Vec<DetectionWarning>,
}

pub struct SystemDetector {
    classifier: Box<dyn SystemClassifier>,
    options: DetectOptions,
}

impl SystemDetector {
    pub fn new(options: DetectOptions) -> Self {
        Self::with_classifier(Box::new(SignatureClassifier), options)
    }

    pub fn with_classifier(classifier: Box<dyn SystemClassifier>, options: DetectOptions) -> Self {
        Self { classifier, options }
    }

    pub fn options(&self) -> &DetectOptions {
        &self.options
    }

    /// Discover and classify every evidence file under `root`
    pub fn enumerate(&self, root: &Path) -> Result<Detection, DetectError> {
        if !root.is_dir() {
            return Err(DetectError::SourceUnavailable {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let spec = FileSpec::parse(&self.options.file_spec).map_err(|e| DetectError::SourceUnavailable {
            path: root.to_path_buf(),
            reason: format!("invalid file spec '{}': {}", self.options.file_spec, e),
        })?;

        let discovered = discover_files(root, &spec, self.options.max_depth);
        info!(
            "Found {} candidate file(s) matching '{}' in {}",
            discovered.files.len(),
            self.options.file_spec,
            root.display()
        );

        let outcomes: Vec<Result<System, DetectError>> = discovered
            .files
            .par_iter()
            .map(|path| self.load(path).and_then(|evidence| self.classifier.classify(evidence)))
            .collect();

        let mut detection = Detection::default();
        for (path, reason) in discovered.errors {
            detection.warnings.push(DetectionWarning { path, reason });
        }

        for (path, outcome) in discovered.files.into_iter().zip(outcomes) {
            match outcome {
                Ok(mut system) => {
                    system.discovery_index = detection.systems.len();
                    detection.systems.push(Arc::new(system));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    detection.warnings.push(DetectionWarning {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Detected {} system(s), skipped {} file(s)",
            detection.systems.len(),
            detection.warnings.len()
        );
        Ok(detection)
    }

    /// Read and decode one file under the size and confidence limits
    fn load(&self, path: &Path) -> Result<Evidence, DetectError> {
        let read_error = |source| DetectError::FileRead {
            path: path.to_path_buf(),
            source,
        };

        let size = fs::metadata(path).map_err(read_error)?.len();
        if size > self.options.max_file_size {
            return Err(DetectError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.options.max_file_size,
            });
        }

        let bytes = fs::read(path).map_err(read_error)?;
        let detected = detect_encoding(&bytes);
        if detected.confidence < self.options.min_confidence {
            return Err(DetectError::Encoding {
                path: path.to_path_buf(),
                guess: detected.name().to_string(),
                confidence: detected.confidence,
            });
        }

        let content = decode(&bytes, &detected)
            .ok_or_else(|| DetectError::Decode {
                path: path.to_path_buf(),
                encoding: detected.name().to_string(),
            })?
            .into_owned();

        Ok(Evidence {
            path: path.to_path_buf(),
            content,
            encoding: detected.name(),
            encoding_confidence: detected.confidence,
            sha256: sha256_hex(&bytes),
        })
    }
}

/// Enumerate systems under `root` with the default classifier
pub fn enumerate(root: &Path, options: DetectOptions) -> Result<Detection, DetectError> {
    SystemDetector::new(options).enumerate(root)
}
