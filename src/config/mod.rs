//! Configuration resolution: YAML documents with includes flattened into an
//! ordered list of validated search definitions.

mod definition;
mod env_vars;
mod locator;
mod parser;
mod resolver;
mod sys_filter;
mod version;

// Re-export definition types
pub use definition::{compile_pattern, MergeFieldRule, RawDefinition, SearchDefinition, SearchFlags};

// Re-export collaborators
pub use locator::{list_bundled_configs, ConfigLocator, FsLocator, SourceId};
pub use parser::{ConfigDocument, DocumentEntry, DocumentParser, GlobalDefaults, YamlDocumentParser};

// Re-export the resolver
pub use resolver::{resolve, ConfigResolver, ConfigWarning, ResolvedConfig, WarningKind};

// Re-export filters and version comparison
pub use sys_filter::{passes_all, Comparator, FilterAttribute, SystemFilterClause};
pub use version::compare_versions;

// Re-export environment variable functions
pub use env_vars::{expand_env_vars, expand_with, normalize_path_for_os};
