use std::collections::HashSet;

use crate::constants::{MAX_CELL_LEN, MAX_SHEET_NAME_LEN, RESERVED_SHEET_NAMES};

const ILLEGAL_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Make a sheet name acceptable to spreadsheet applications.
///
/// Illegal characters become `_`, surrounding apostrophes are trimmed, the
/// result is cut to the sheet-name limit and an empty name becomes `Sheet`.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if ILLEGAL_SHEET_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = truncate_chars(replaced.trim().trim_matches('\''), MAX_SHEET_NAME_LEN);
    let trimmed = trimmed.trim_end_matches('\'');
    if trimmed.is_empty() {
        "Sheet".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Hands out unique sheet names within one workbook
#[derive(Debug, Clone)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl Default for SheetNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetNamer {
    /// Namer with the reserved names already taken
    pub fn new() -> Self {
        Self {
            used: RESERVED_SHEET_NAMES.iter().map(|n| n.to_lowercase()).collect(),
        }
    }

    /// Claim a reserved name for the workbook's own use
    pub fn claim_reserved(&mut self, name: &str) -> String {
        self.used.insert(name.to_lowercase());
        name.to_string()
    }

    /// Unique sanitized name for `requested`; clashes get `_2`, `_3`, ...
    pub fn assign(&mut self, requested: &str) -> String {
        let base = sanitize_sheet_name(requested);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let mut n = 2usize;
        loop {
            let suffix = format!("_{}", n);
            let stem = truncate_chars(&base, MAX_SHEET_NAME_LEN - suffix.chars().count());
            let candidate = format!("{}{}", stem, suffix);
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Column headers without control characters, made unique with suffixes
pub fn sanitize_column_names(columns: &[String]) -> Vec<String> {
    let mut used = HashSet::new();
    columns
        .iter()
        .map(|column| {
            let cleaned: String = column.chars().filter(|c| !c.is_control()).collect();
            let base = if cleaned.trim().is_empty() {
                "column".to_string()
            } else {
                cleaned
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.to_lowercase()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Cut a cell value to the per-cell character limit
pub fn truncate_cell(value: &str) -> String {
    truncate_chars(value, MAX_CELL_LEN).to_string()
}

fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_illegal_characters() {
        assert_eq!(sanitize_sheet_name("Users [local]: a/b\\c*?"), "Users _local__ a_b_c__");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name("''"), "Sheet");
        assert_eq!(sanitize_sheet_name("   "), "Sheet");
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "A".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("Report"), "Report");
        assert_eq!(namer.assign("report"), "report_2");
        assert_eq!(namer.assign("Report"), "Report_3");
    }

    #[test]
    fn test_reserved_names_are_never_assigned() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("Summary"), "Summary_2");
        assert_eq!(namer.assign("history"), "history_2");
    }

    #[test]
    fn test_suffix_respects_length_limit() {
        let mut namer = SheetNamer::new();
        let long = "B".repeat(40);
        let first = namer.assign(&long);
        let second = namer.assign(&long);
        assert_eq!(first.chars().count(), MAX_SHEET_NAME_LEN);
        assert_eq!(second.chars().count(), MAX_SHEET_NAME_LEN);
        assert!(second.ends_with("_2"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_sanitize_is_applied_before_suffixing() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("a/b"), "a_b");
        assert_eq!(namer.assign("a:b"), "a_b_2");
    }

    #[test]
    fn test_column_names() {
        let columns = vec!["system_name".to_string(), "na\tme".to_string(), "System_Name".to_string(), "".to_string()];
        assert_eq!(
            sanitize_column_names(&columns),
            vec!["system_name", "name", "System_Name_2", "column"]
        );
    }

    #[test]
    fn test_truncate_cell() {
        let long = "x".repeat(MAX_CELL_LEN + 10);
        assert_eq!(truncate_cell(&long).len(), MAX_CELL_LEN);
        assert_eq!(truncate_cell("short"), "short");
    }
}
