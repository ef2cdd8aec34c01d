use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::constants::SIGNATURE_SCAN_BYTES;
use crate::error::DetectError;
use crate::models::{DistroFamily, OsFamily, Producer, System};

lazy_static! {
    static ref PRODUCER_MARKER: Regex =
        Regex::new(r"\b(KPWINVERSION|KPNIXVERSION|KPMACVERSION):[ \t]*([^\s]*)").unwrap();

    static ref DARWIN_EVIDENCE: Regex =
        Regex::new(r"(?m)Darwin Kernel Version|^(?:[\w-]+::)*[ \t]*Darwin[ \t]*\r?$").unwrap();

    static ref OS_RELEASE: Regex =
        Regex::new(r#"(?m)^(?:[\w-]+::)*[ \t]*(ID|ID_LIKE)=["']?([^"'\r\n]*)"#).unwrap();

    static ref PACKAGE_MANAGERS: Vec<(DistroFamily, Regex)> = vec![
        (DistroFamily::Debian, Regex::new(r"\b(?:dpkg|apt-get|apt)\b").unwrap()),
        (DistroFamily::RedHat, Regex::new(r"\b(?:rpm|yum|dnf)\b").unwrap()),
        (DistroFamily::Suse, Regex::new(r"\bzypper\b").unwrap()),
        (DistroFamily::Alpine, Regex::new(r"\bapk\b").unwrap()),
        (DistroFamily::Arch, Regex::new(r"\bpacman\b").unwrap()),
    ];
}

/// A decoded evidence file awaiting classification
#[derive(Debug, Clone)]
pub struct Evidence {
    pub path: PathBuf,
    pub content: String,
    pub encoding: &'static str,
    pub encoding_confidence: f32,
    pub sha256: String,
}

/// Turns decoded evidence into a [`System`]
pub trait SystemClassifier: Send + Sync {
    fn classify(&self, evidence: Evidence) -> Result<System, DetectError>;
}

/// Classifier driven by producer markers and content signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureClassifier;

impl SystemClassifier for SignatureClassifier {
    fn classify(&self, evidence: Evidence) -> Result<System, DetectError> {
        let head = head_of(&evidence.content, SIGNATURE_SCAN_BYTES);
        let (producer, producer_version) = find_producer(head).ok_or_else(|| DetectError::Unrecognized {
            path: evidence.path.clone(),
        })?;

        let mut os_family = producer.default_os_family();
        if producer == Producer::KpNixAudit && DARWIN_EVIDENCE.is_match(&evidence.content) {
            os_family = OsFamily::Darwin;
        }

        let distro_family = if os_family == OsFamily::Linux {
            detect_distro(&evidence.content)
        } else {
            None
        };

        let system_name = system_name_for(&evidence.path);
        debug!(
            "Classified {} as {} {} {} ({})",
            evidence.path.display(),
            os_family,
            producer,
            producer_version,
            distro_family.map(|d| d.as_str()).unwrap_or("no distro")
        );

        Ok(System {
            system_name,
            os_family,
            distro_family,
            producer,
            producer_version,
            source_path: evidence.path,
            content: evidence.content,
            encoding: evidence.encoding,
            encoding_confidence: evidence.encoding_confidence,
            sha256: evidence.sha256,
            discovery_index: 0,
        })
    }
}

/// Longest prefix of `text` no longer than `limit` bytes
fn head_of(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// First producer marker in the scanned head and the version following it
fn find_producer(head: &str) -> Option<(Producer, String)> {
    let caps = PRODUCER_MARKER.captures(head)?;
    let producer = Producer::from_marker(caps.get(1)?.as_str())?;
    let version = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
    Some((producer, version))
}

/// Distribution family from os-release lines, else package-manager evidence
fn detect_distro(content: &str) -> Option<DistroFamily> {
    let mut id = None;
    let mut id_like = None;
    for caps in OS_RELEASE.captures_iter(content) {
        let tokens = caps[2].split_whitespace().filter_map(DistroFamily::from_token).next();
        match &caps[1] {
            "ID" if id.is_none() => id = tokens,
            "ID_LIKE" if id_like.is_none() => id_like = tokens,
            _ => {}
        }
    }
    if let Some(family) = id.or(id_like) {
        return Some(family);
    }

    let counts: Vec<(DistroFamily, usize)> = PACKAGE_MANAGERS
        .iter()
        .map(|(family, re)| (*family, re.find_iter(content).count()))
        .filter(|(_, hits)| *hits > 0)
        .collect();

    let best = counts.iter().map(|(_, hits)| *hits).max()?;
    let mut leaders = counts.iter().filter(|(_, hits)| *hits == best);
    match (leaders.next(), leaders.next()) {
        (Some((family, _)), None) => Some(*family),
        _ => None,
    }
}

/// Host name is the evidence file stem
pub fn system_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
