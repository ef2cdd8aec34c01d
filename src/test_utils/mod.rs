//! Test utilities for audit-parser
//!
//! Builders for systems, evidence files and configuration documents shared
//! by the unit test modules.

#![cfg(test)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{SearchDefinition, SearchFlags};
use crate::models::{OsFamily, Producer, System};
use crate::utils::hash::sha256_hex;

/// Build a classified system directly, bypassing detection
pub fn test_system(name: &str, producer: Producer, version: &str, content: &str) -> System {
    System {
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
        discovery_index: 0,
    }
}

/// Shared systems with discovery indices assigned in order
pub fn indexed_systems(systems: Vec<System>) -> Vec<Arc<System>> {
    systems
        .into_iter()
        .enumerate()
        .map(|(index, mut system)| {
            system.discovery_index = index;
            Arc::new(system)
        })
        .collect()
}

/// A nix system whose content starts with the producer marker
pub fn nix_system(name: &str, body: &str) -> System {
    let content = format!("KPNIXVERSION: 0.6.22\n{}", body);
    test_system(name, Producer::KpNixAudit, "0.6.22", &content)
}

/// A windows system whose content starts with the producer marker
pub fn win_system(name: &str, body: &str) -> System {
    let content = format!("KPWINVERSION: 0.4.8\r\n{}", body);
    let mut system = test_system(name, Producer::KpWinAudit, "0.4.8", &content);
    system.os_family = OsFamily::Windows;
    system
}

/// Definition with the given flags; panics on an invalid pattern
pub fn definition(name: &str, pattern: &str, flags: SearchFlags) -> SearchDefinition {
    SearchDefinition::new(name, pattern, flags).unwrap()
}

/// Definition extracting the listed named groups
pub fn definition_with_fields(name: &str, pattern: &str, fields: &[&str]) -> SearchDefinition {
    let mut definition = definition(name, pattern, SearchFlags::default());
    definition.field_list = Some(fields.iter().map(|f| f.to_string()).collect());
    definition
}

/// Write a configuration document and return its path
pub fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Write an evidence file and return its path
pub fn write_evidence(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Encode text as UTF-16LE with a byte order mark
pub fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
