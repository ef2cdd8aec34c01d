use std::collections::BTreeMap;

use serde::Deserialize;
use serde_yaml::Value;

use crate::config::definition::RawDefinition;
use crate::config::locator::SourceId;
use crate::config::sys_filter::SystemFilterClause;
use crate::error::ConfigError;

/// File-scoped defaults applied to definitions declared in the same file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct GlobalDefaults {
    #[serde(default)]
    pub sys_filter: Option<Vec<SystemFilterClause>>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct IncludeBlock {
    files: Vec<String>,
}

/// One top-level entry of a configuration document, in document order
#[derive(Debug, Clone)]
pub enum DocumentEntry {
    Global(GlobalDefaults),
    Include { block: String, files: Vec<String> },
    Definition { name: String, raw: RawDefinition },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    pub entries: Vec<DocumentEntry>,
}

impl ConfigDocument {
    /// The document's `global` block, wherever it appears in the file
    pub fn global(&self) -> Option<&GlobalDefaults> {
        self.entries.iter().find_map(|entry| match entry {
            DocumentEntry::Global(global) => Some(global),
            _ => None,
        })
    }
}

/// Turns configuration text into a [`ConfigDocument`]
pub trait DocumentParser: Send + Sync {
    fn parse(&self, text: &str, origin: &SourceId) -> Result<ConfigDocument, ConfigError>;
}

/// YAML implementation of [`DocumentParser`]
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDocumentParser;

impl DocumentParser for YamlDocumentParser {
    fn parse(&self, text: &str, origin: &SourceId) -> Result<ConfigDocument, ConfigError> {
        let parse_error = |reason: String| ConfigError::Parse {
            origin: origin.to_string(),
            reason,
        };

        let root: Value = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;
        let mapping = match root {
            Value::Null => return Ok(ConfigDocument::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(parse_error(format!(
                    "top level must be a mapping of named blocks, found {}",
                    value_kind(&other)
                )))
            }
        };

        let mut document = ConfigDocument::default();
        for (key, value) in mapping {
            let name = match key {
                Value::String(name) => name,
                other => return Err(parse_error(format!("block names must be strings, found {:?}", other))),
            };

            let entry = if name == "global" {
                let global: GlobalDefaults = serde_yaml::from_value(value)
                    .map_err(|e| parse_error(format!("global: {}", e)))?;
                DocumentEntry::Global(global)
            } else if name.starts_with("include_") {
                let block: IncludeBlock = serde_yaml::from_value(value)
                    .map_err(|e| parse_error(format!("{}: {}", name, e)))?;
                DocumentEntry::Include {
                    block: name,
                    files: block.files,
                }
            } else {
                if !matches!(value, Value::Mapping(_)) {
                    return Err(parse_error(format!(
                        "definition '{}' must be a mapping, found {}",
                        name,
                        value_kind(&value)
                    )));
                }
                let raw: RawDefinition = serde_yaml::from_value(value)
                    .map_err(|e| parse_error(format!("definition '{}': {}", name, e)))?;
                DocumentEntry::Definition { name, raw }
            };
            document.entries.push(entry);
        }

        Ok(document)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> SourceId {
        SourceId::Bundled("test.yaml".to_string())
    }

    #[test]
    fn test_entries_keep_document_order() {
        let yaml = r#"
first:
  regex: 'a'
include_common:
  files: [common.yaml, extra.yaml]
global:
  sys_filter:
    - { attribute: os_family, comparison: "==", value: Linux }
second:
  regex: 'b'
"#;
        let document = YamlDocumentParser.parse(yaml, &origin()).unwrap();
        assert_eq!(document.entries.len(), 4);
        assert!(matches!(&document.entries[0], DocumentEntry::Definition { name, .. } if name == "first"));
        assert!(matches!(&document.entries[1], DocumentEntry::Include { files, .. } if files.len() == 2));
        assert!(matches!(&document.entries[3], DocumentEntry::Definition { name, .. } if name == "second"));

        let global = document.global().unwrap();
        assert_eq!(global.sys_filter.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_document() {
        let document = YamlDocumentParser.parse("", &origin()).unwrap();
        assert!(document.entries.is_empty());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = YamlDocumentParser.parse("a: [unclosed", &origin());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_non_mapping_root() {
        let result = YamlDocumentParser.parse("- a\n- b\n", &origin());
        match result {
            Err(ConfigError::Parse { reason, .. }) => assert!(reason.contains("sequence")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_include_block() {
        let result = YamlDocumentParser.parse("include_x:\n  file: a.yaml\n", &origin());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_definition_must_be_mapping() {
        let result = YamlDocumentParser.parse("version: 3\n", &origin());
        match result {
            Err(ConfigError::Parse { reason, .. }) => assert!(reason.contains("'version'")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
