use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Operating-system family of an audited host
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OsFamily {
    Windows,
    Linux,
    Darwin,
    Unknown,
}

impl OsFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "Windows",
            OsFamily::Linux => "Linux",
            OsFamily::Darwin => "Darwin",
            OsFamily::Unknown => "Unknown",
        }
    }

    /// Parse a family name, accepting the common aliases used in configs
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" => Some(OsFamily::Windows),
            "linux" => Some(OsFamily::Linux),
            "darwin" | "macos" | "mac" | "osx" => Some(OsFamily::Darwin),
            "unknown" => Some(OsFamily::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Linux distribution family, derived from package-manager evidence
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistroFamily {
    Debian,
    RedHat,
    Suse,
    Alpine,
    Arch,
}

impl DistroFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistroFamily::Debian => "Debian",
            DistroFamily::RedHat => "RedHat",
            DistroFamily::Suse => "Suse",
            DistroFamily::Alpine => "Alpine",
            DistroFamily::Arch => "Arch",
        }
    }

    /// Map an os-release `ID`/`ID_LIKE` token or a family name to its family
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "debian" | "ubuntu" | "linuxmint" | "kali" | "raspbian" | "pop" => {
                Some(DistroFamily::Debian)
            }
            "redhat" | "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" | "amzn" => {
                Some(DistroFamily::RedHat)
            }
            "suse" | "sles" | "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => {
                Some(DistroFamily::Suse)
            }
            "alpine" => Some(DistroFamily::Alpine),
            "arch" | "manjaro" | "endeavouros" => Some(DistroFamily::Arch),
            _ => None,
        }
    }
}

impl fmt::Display for DistroFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit-collector family that produced an evidence file
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Producer {
    KpWinAudit,
    KpNixAudit,
    KpMacAudit,
}

impl Producer {
    pub const ALL: [Producer; 3] = [Producer::KpWinAudit, Producer::KpNixAudit, Producer::KpMacAudit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Producer::KpWinAudit => "KPWINAUDIT",
            Producer::KpNixAudit => "KPNIXAUDIT",
            Producer::KpMacAudit => "KPMACAUDIT",
        }
    }

    /// Version marker written at the top of every file the producer emits
    pub fn marker(&self) -> &'static str {
        match self {
            Producer::KpWinAudit => "KPWINVERSION",
            Producer::KpNixAudit => "KPNIXVERSION",
            Producer::KpMacAudit => "KPMACVERSION",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.marker() == marker)
    }

    pub fn default_os_family(&self) -> OsFamily {
        match self {
            Producer::KpWinAudit => OsFamily::Windows,
            Producer::KpNixAudit => OsFamily::Linux,
            Producer::KpMacAudit => OsFamily::Darwin,
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audited host, classified from a single evidence file
#[derive(Debug, Clone)]
pub struct System {
    pub system_name: String,
    pub os_family: OsFamily,
    pub distro_family: Option<DistroFamily>,
    pub producer: Producer,
    pub producer_version: String,
    pub source_path: PathBuf,
    pub content: String,
    pub encoding: &'static str,
    pub encoding_confidence: f32,
    pub sha256: String,
    pub discovery_index: usize,
}

/// One extracted row for a (definition, system) pair
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub definition: String,
    pub system: Arc<System>,
    pub fields: IndexMap<String, String>,
}

/// All rows produced by one definition, in system discovery order
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub definition: String,
    pub results: Vec<SearchResult>,
    /// Set when `max_results` dropped rows for at least one system
    pub truncated: bool,
    pub truncated_systems: Vec<String>,
    /// Discovery indices of the systems that passed `sys_filter`
    pub evaluated_systems: Vec<usize>,
    /// Distinct rows found per system before truncation, by discovery index.
    /// Exact only for `full_scan` definitions.
    pub match_counts: IndexMap<usize, usize>,
}

impl SearchResults {
    pub fn new(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
