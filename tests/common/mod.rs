//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use audit_parser::config::{SearchDefinition, SearchFlags};
use audit_parser::models::{OsFamily, Producer, System};
use audit_parser::utils::hash::sha256_hex;

/// Write `content` to `dir/name`, creating parent directories
pub fn write_file(dir: &Path, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Build a system directly, bypassing detection
pub fn system(name: &str, producer: Producer, version: &str, content: &str, index: usize) -> Arc<System> {
    Arc::new(System {
        system_name: name.to_string(),
        os_family: producer.default_os_family(),
        distro_family: None,
        producer,
        producer_version: version.to_string(),
        source_path: PathBuf::from(format!("{}.txt", name)),
        content: content.to_string(),
        encoding: "UTF-8",
        encoding_confidence: 1.0,
        sha256: sha256_hex(content.as_bytes()),
        discovery_index: index,
    })
}

pub fn nix(name: &str, version: &str, body: &str, index: usize) -> Arc<System> {
    let content = format!("KPNIXVERSION: {}\n{}", version, body);
    system(name, Producer::KpNixAudit, version, &content, index)
}

pub fn win(name: &str, body: &str, index: usize) -> Arc<System> {
    let content = format!("KPWINVERSION: 0.4.8\r\n{}", body);
    system(name, Producer::KpWinAudit, "0.4.8", &content, index)
}

pub fn definition(name: &str, pattern: &str, fields: &[&str], flags: SearchFlags) -> SearchDefinition {
    let mut definition = SearchDefinition::new(name, pattern, flags).unwrap();
    if !fields.is_empty() {
        definition.field_list = Some(fields.iter().map(|f| f.to_string()).collect());
    }
    definition
}

pub fn os_of(systems: &[Arc<System>]) -> Vec<OsFamily> {
    systems.iter().map(|s| s.os_family).collect()
}

/// UTF-16LE bytes with a byte order mark
pub fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
