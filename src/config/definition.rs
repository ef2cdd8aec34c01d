use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::sys_filter::{passes_all, SystemFilterClause};
use crate::constants::{IMPLICIT_FIELD, REGEX_SIZE_LIMIT};
use crate::models::System;

/// Collapse several optional columns into one destination column
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MergeFieldRule {
    pub source_columns: Vec<String>,
    pub dest_column: String,
}

/// Matching and post-processing switches of a definition
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SearchFlags {
    #[serde(default)]
    pub only_matching: bool,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub full_scan: bool,
    #[serde(default)]
    pub unique: bool,
    /// Rows kept per system; zero or negative means unlimited
    #[serde(default)]
    pub max_results: i64,
}

/// A definition exactly as written in a configuration document
#[derive(Debug, Deserialize, Clone)]
pub struct RawDefinition {
    pub regex: String,
    #[serde(default)]
    pub excel_sheet_name: Option<String>,
    #[serde(flatten)]
    pub flags: SearchFlags,
    #[serde(default)]
    pub field_list: Option<Vec<String>>,
    #[serde(default)]
    pub merge_fields: Vec<MergeFieldRule>,
    #[serde(default)]
    pub sys_filter: Option<Vec<SystemFilterClause>>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Keys this version does not understand; reported as warnings
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

/// A resolved, validated search definition. Immutable once built.
#[derive(Debug, Clone)]
pub struct SearchDefinition {
    pub name: String,
    pub pattern: String,
    regex: Regex,
    pub flags: SearchFlags,
    pub field_list: Option<Vec<String>>,
    pub merge_fields: Vec<MergeFieldRule>,
    pub sys_filter: Vec<SystemFilterClause>,
    pub excel_sheet_name: String,
    pub comment: Option<String>,
    /// Configuration source the definition was declared in
    pub origin: String,
}

impl PartialEq for SearchDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.pattern == other.pattern
            && self.flags == other.flags
            && self.field_list == other.field_list
            && self.merge_fields == other.merge_fields
            && self.sys_filter == other.sys_filter
            && self.excel_sheet_name == other.excel_sheet_name
            && self.comment == other.comment
            && self.origin == other.origin
    }
}

/// Compile a configuration pattern the way the engine will run it
pub fn compile_pattern(pattern: &str, multiline: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .multi_line(multiline)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
}

impl SearchDefinition {
    /// Build a definition with default attributes around a pattern
    pub fn new(name: &str, pattern: &str, flags: SearchFlags) -> Result<Self, regex::Error> {
        let regex = compile_pattern(pattern, flags.multiline)?;
        Ok(Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            regex,
            flags,
            field_list: None,
            merge_fields: Vec::new(),
            sys_filter: Vec::new(),
            excel_sheet_name: name.to_string(),
            comment: None,
            origin: String::new(),
        })
    }

    /// Build from a raw document entry with the effective `sys_filter` applied
    pub fn from_raw(
        name: &str,
        origin: &str,
        raw: RawDefinition,
        sys_filter: Vec<SystemFilterClause>,
    ) -> Result<Self, regex::Error> {
        let mut definition = Self::new(name, &raw.regex, raw.flags)?;
        definition.field_list = raw.field_list;
        definition.merge_fields = raw.merge_fields;
        definition.sys_filter = sys_filter;
        definition.comment = raw.comment;
        definition.origin = origin.to_string();
        if let Some(sheet) = raw.excel_sheet_name.filter(|s| !s.trim().is_empty()) {
            definition.excel_sheet_name = sheet;
        }
        Ok(definition)
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Per-system row limit, `None` when unlimited
    pub fn result_limit(&self) -> Option<usize> {
        if self.flags.max_results > 0 {
            Some(self.flags.max_results as usize)
        } else {
            None
        }
    }

    pub fn applies_to(&self, system: &System) -> bool {
        passes_all(&self.sys_filter, system)
    }

    /// Named capture groups declared by the pattern
    pub fn capture_names(&self) -> Vec<&str> {
        self.regex.capture_names().flatten().collect()
    }

    /// Field names extracted before `merge_fields` is applied
    pub fn extracted_fields(&self) -> Vec<String> {
        match &self.field_list {
            Some(fields) => fields.clone(),
            None => vec![IMPLICIT_FIELD.to_string()],
        }
    }

    /// Final column order of the field map.
    ///
    /// A merge destination takes the slot of its first source column; merge
    /// sources are dropped; destinations without a listed source go last.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();

        for field in self.extracted_fields() {
            let column = match self.merge_rule_for(&field) {
                Some(rule) => rule.dest_column.clone(),
                None => field,
            };
            if !columns.contains(&column) {
                columns.push(column);
            }
        }

        for rule in &self.merge_fields {
            if !columns.contains(&rule.dest_column) {
                columns.push(rule.dest_column.clone());
            }
        }

        columns
    }

    fn merge_rule_for(&self, field: &str) -> Option<&MergeFieldRule> {
        self.merge_fields
            .iter()
            .find(|rule| rule.source_columns.iter().any(|c| c == field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(sources: &[&str], dest: &str) -> MergeFieldRule {
        MergeFieldRule {
            source_columns: sources.iter().map(|s| s.to_string()).collect(),
            dest_column: dest.to_string(),
        }
    }

    #[test]
    fn test_raw_definition_defaults() {
        let yaml = r#"
regex: 'KPNIXVERSION: (?P<v>\S+)'
"#;
        let raw: RawDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(!raw.flags.only_matching);
        assert!(!raw.flags.unique);
        assert_eq!(raw.flags.max_results, 0);
        assert!(raw.field_list.is_none());
        assert!(raw.unknown.is_empty());

        let definition = SearchDefinition::from_raw("version", "test.yaml", raw, Vec::new()).unwrap();
        assert_eq!(definition.excel_sheet_name, "version");
        assert_eq!(definition.result_limit(), None);
        assert_eq!(definition.output_columns(), vec![IMPLICIT_FIELD.to_string()]);
    }

    #[test]
    fn test_raw_definition_collects_unknown_keys() {
        let yaml = r#"
regex: 'x'
max_results: 3
unique: true
colour: blue
"#;
        let raw: RawDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(raw.flags.max_results, 3);
        assert!(raw.flags.unique);
        assert!(raw.unknown.contains_key("colour"));
        assert!(!raw.unknown.contains_key("unique"));
    }

    #[test]
    fn test_missing_regex_fails() {
        let result: Result<RawDefinition, _> = serde_yaml::from_str("field_list: [a]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_max_results_is_unlimited() {
        let flags = SearchFlags {
            max_results: -1,
            ..Default::default()
        };
        let definition = SearchDefinition::new("d", "x", flags).unwrap();
        assert_eq!(definition.result_limit(), None);
    }

    #[test]
    fn test_output_columns_with_merge() {
        let mut definition = SearchDefinition::new("users", "x", SearchFlags::default()).unwrap();
        definition.field_list = Some(vec!["user".into(), "a".into(), "b".into(), "shell".into()]);
        definition.merge_fields = vec![merge(&["a", "b"], "home"), merge(&["missing"], "extra")];

        assert_eq!(
            definition.output_columns(),
            vec!["user", "home", "shell", "extra"]
        );
    }

    #[test]
    fn test_capture_names() {
        let definition =
            SearchDefinition::new("d", r"(?P<user>\w+):(?P<uid>\d+):(\w+)", SearchFlags::default()).unwrap();
        assert_eq!(definition.capture_names(), vec!["user", "uid"]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(SearchDefinition::new("d", "(unclosed", SearchFlags::default()).is_err());
    }
}
