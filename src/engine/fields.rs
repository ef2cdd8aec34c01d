use std::collections::HashSet;

use indexmap::IndexMap;

use crate::config::SearchDefinition;

pub type Row = IndexMap<String, String>;

#[derive(Debug, Clone)]
enum ColumnSource {
    Field(String),
    /// First non-empty value among the sources, in order
    Merge(Vec<String>),
}

/// Final column layout of a definition, applying its `merge_fields`
#[derive(Debug, Clone)]
pub struct RowShape {
    columns: Vec<(String, ColumnSource)>,
}

impl RowShape {
    pub fn for_definition(definition: &SearchDefinition) -> Self {
        let columns = definition
            .output_columns()
            .into_iter()
            .map(|column| {
                let source = match definition.merge_fields.iter().find(|r| r.dest_column == column) {
                    Some(rule) => {
                        let mut sources = rule.source_columns.clone();
                        // A destination that is itself extracted is the last fallback
                        if !sources.contains(&column) {
                            sources.push(column.clone());
                        }
                        ColumnSource::Merge(sources)
                    }
                    None => ColumnSource::Field(column.clone()),
                };
                (column, source)
            })
            .collect();
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn shape(&self, extracted: &Row) -> Row {
        self.columns
            .iter()
            .map(|(name, source)| {
                let value = match source {
                    ColumnSource::Field(field) => extracted.get(field).cloned(),
                    ColumnSource::Merge(sources) => sources
                        .iter()
                        .filter_map(|s| extracted.get(s))
                        .find(|v| !v.is_empty())
                        .cloned(),
                };
                (name.clone(), value.unwrap_or_default())
            })
            .collect()
    }
}

/// Rows of one unit, optionally deduplicated on full field-map equality
#[derive(Debug, Default)]
pub struct RowSet {
    unique: bool,
    seen: HashSet<Vec<String>>,
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            ..Default::default()
        }
    }

    /// Add a row; false when it duplicates an earlier row under `unique`
    pub fn push(&mut self, row: Row) -> bool {
        if self.unique && !self.seen.insert(row.values().cloned().collect()) {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Drop duplicate rows, keeping first occurrences in order
pub fn dedup_rows(rows: Vec<Row>) -> Vec<Row> {
    let mut set = RowSet::new(true);
    for row in rows {
        set.push(row);
    }
    set.into_rows()
}

/// Cut `rows` to `limit`; true when rows were dropped
pub fn truncate_rows(rows: &mut Vec<Row>, limit: Option<usize>) -> bool {
    match limit {
        Some(limit) if rows.len() > limit => {
            rows.truncate(limit);
            true
        }
        _ => false,
    }
}
