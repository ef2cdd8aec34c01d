use std::collections::HashSet;
use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::definition::{RawDefinition, SearchDefinition};
use crate::config::locator::{ConfigLocator, FsLocator, SourceId};
use crate::config::parser::{DocumentEntry, DocumentParser, YamlDocumentParser};
use crate::config::sys_filter::SystemFilterClause;
use crate::error::ConfigError;

/// Category of a non-fatal configuration diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    /// A `field_list` entry has no matching named capture group
    FieldNotInRegex,
    /// A `merge_fields` source is not listed in `field_list`
    MergeSourceUnknown,
    /// A key the resolver does not understand
    UnknownKey,
    /// A later definition reused an existing name and was dropped
    DuplicateName,
    /// The pattern did not compile; the definition was dropped
    RegexCompile,
}

/// Non-fatal diagnostic returned alongside a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub kind: WarningKind,
    pub definition: Option<String>,
    pub origin: String,
    pub message: String,
}

impl ConfigWarning {
    /// True when the warning removed the definition from the run
    pub fn rejects_definition(&self) -> bool {
        matches!(self.kind, WarningKind::RegexCompile | WarningKind::DuplicateName)
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.definition {
            Some(name) => write!(f, "{} [{}]: {}", self.origin, name, self.message),
            None => write!(f, "{}: {}", self.origin, self.message),
        }
    }
}

/// Flattened, validated configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub root: SourceId,
    /// Every document that contributed, in first-visit order
    pub sources: Vec<SourceId>,
    pub definitions: Vec<SearchDefinition>,
    pub warnings: Vec<ConfigWarning>,
}

impl ResolvedConfig {
    pub fn rejected(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.warnings.iter().filter(|w| w.rejects_definition())
    }
}

/// A definition collected during the include walk, not yet validated
struct PendingDefinition {
    name: String,
    origin: String,
    raw: RawDefinition,
    sys_filter: Vec<SystemFilterClause>,
}

/// State of one include walk
#[derive(Default)]
struct IncludeWalk {
    /// Documents on the current include path, outermost first
    path: Vec<SourceId>,
    on_path: HashSet<SourceId>,
    completed: HashSet<SourceId>,
    visit_order: Vec<SourceId>,
    pending: Vec<PendingDefinition>,
    warnings: Vec<ConfigWarning>,
}

/// Resolves a root configuration into an ordered list of definitions.
///
/// Collaborators are injected so tests and embedders can supply their own
/// document sources and syntaxes.
pub struct ConfigResolver {
    locator: Box<dyn ConfigLocator>,
    parser: Box<dyn DocumentParser>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Resolver over disk + bundled configs with YAML syntax
    pub fn new() -> Self {
        Self::with_collaborators(Box::new(FsLocator::new()), Box::new(YamlDocumentParser))
    }

    pub fn with_collaborators(
        locator: Box<dyn ConfigLocator>,
        parser: Box<dyn DocumentParser>,
    ) -> Self {
        Self { locator, parser }
    }

    /// Load `root`, resolve every include and validate the result.
    ///
    /// Structural problems (missing file, bad syntax, include cycle) fail the
    /// whole resolution. Per-definition problems become warnings.
    pub fn resolve(&self, root: &str) -> Result<ResolvedConfig, ConfigError> {
        let root_id = self.locator.locate(root, None).ok_or_else(|| ConfigError::NotFound {
            name: root.to_string(),
            searched: self.locator.search_description(root, None),
        })?;

        info!("Resolving configuration {}", root_id);
        let mut walk = IncludeWalk::default();
        self.walk(&root_id, &mut walk)?;

        let IncludeWalk {
            visit_order,
            pending,
            mut warnings,
            ..
        } = walk;
        let definitions = validate(pending, &mut warnings);

        for warning in &warnings {
            warn!("Configuration warning: {}", warning);
        }
        info!(
            "Resolved {} search definitions from {} configuration file(s)",
            definitions.len(),
            visit_order.len()
        );

        Ok(ResolvedConfig {
            root: root_id,
            sources: visit_order,
            definitions,
            warnings,
        })
    }

    fn walk(&self, source: &SourceId, state: &mut IncludeWalk) -> Result<(), ConfigError> {
        if state.on_path.contains(source) {
            let mut chain: Vec<String> = state
                .path
                .iter()
                .skip_while(|s| *s != source)
                .map(|s| s.to_string())
                .collect();
            chain.push(source.to_string());
            return Err(ConfigError::Cycle { chain });
        }
        if state.completed.contains(source) {
            debug!("Skipping {} (already included)", source);
            return Ok(());
        }

        state.on_path.insert(source.clone());
        state.path.push(source.clone());
        state.visit_order.push(source.clone());

        let text = self.locator.read(source)?;
        let document = self.parser.parse(&text, source)?;
        let origin = source.to_string();

        let defaults: Vec<SystemFilterClause> = match document.global() {
            Some(global) => {
                for key in global.unknown.keys() {
                    state.warnings.push(ConfigWarning {
                        kind: WarningKind::UnknownKey,
                        definition: None,
                        origin: origin.clone(),
                        message: format!("unknown key '{}' in global block", key),
                    });
                }
                global.sys_filter.clone().unwrap_or_default()
            }
            None => Vec::new(),
        };

        for entry in document.entries {
            match entry {
                DocumentEntry::Global(_) => {}
                DocumentEntry::Include { block, files } => {
                    for file in files {
                        let included = self.locator.locate(&file, Some(source)).ok_or_else(|| {
                            ConfigError::NotFound {
                                name: format!("{} (from {} in {})", file, block, origin),
                                searched: self.locator.search_description(&file, Some(source)),
                            }
                        })?;
                        self.walk(&included, state)?;
                    }
                }
                DocumentEntry::Definition { name, raw } => {
                    // Own sys_filter replaces the file default outright
                    let sys_filter = raw.sys_filter.clone().unwrap_or_else(|| defaults.clone());
                    state.pending.push(PendingDefinition {
                        name,
                        origin: origin.clone(),
                        raw,
                        sys_filter,
                    });
                }
            }
        }

        state.path.pop();
        state.on_path.remove(source);
        state.completed.insert(source.clone());
        Ok(())
    }
}

/// Compile and cross-check flattened definitions
fn validate(pending: Vec<PendingDefinition>, warnings: &mut Vec<ConfigWarning>) -> Vec<SearchDefinition> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut definitions = Vec::with_capacity(pending.len());

    for PendingDefinition {
        name,
        origin,
        raw,
        sys_filter,
    } in pending
    {
        let mut note = |kind: WarningKind, message: String| {
            warnings.push(ConfigWarning {
                kind,
                definition: Some(name.clone()),
                origin: origin.clone(),
                message,
            })
        };

        if seen.contains(&name) {
            note(
                WarningKind::DuplicateName,
                "duplicate definition name; the first declaration is kept".to_string(),
            );
            continue;
        }

        for key in raw.unknown.keys() {
            note(WarningKind::UnknownKey, format!("unknown key '{}'", key));
        }

        let definition = match SearchDefinition::from_raw(&name, &origin, raw, sys_filter) {
            Ok(definition) => definition,
            Err(e) => {
                note(WarningKind::RegexCompile, format!("regex does not compile: {}", e));
                continue;
            }
        };

        let groups = definition.capture_names();
        if let Some(fields) = &definition.field_list {
            for field in fields.iter().filter(|f| !groups.contains(&f.as_str())) {
                note(
                    WarningKind::FieldNotInRegex,
                    format!("field '{}' is not a named capture group of the regex", field),
                );
            }
        }

        let extracted = definition.extracted_fields();
        for rule in &definition.merge_fields {
            for source in rule.source_columns.iter().filter(|c| !extracted.contains(c)) {
                note(
                    WarningKind::MergeSourceUnknown,
                    format!(
                        "merge source '{}' for '{}' is not an extracted field",
                        source, rule.dest_column
                    ),
                );
            }
        }

        seen.insert(name.clone());
        definitions.push(definition);
    }

    definitions
}

/// Resolve `root` with the default collaborators
pub fn resolve(root: &str) -> Result<ResolvedConfig, ConfigError> {
    ConfigResolver::new().resolve(root)
}
