use indexmap::IndexMap;
use regex::Captures;

use crate::config::SearchDefinition;
use crate::constants::IMPLICIT_FIELD;
use crate::engine::watchdog::Watchdog;
use crate::error::UnitError;

/// Whether the scanner should keep going after a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Run a definition's pattern over one system's content.
///
/// Every extracted row is handed to `emit` in content order. The watchdog
/// is consulted between lines and between matches.
pub fn scan<F>(
    definition: &SearchDefinition,
    content: &str,
    watchdog: &mut Watchdog,
    mut emit: F,
) -> Result<(), UnitError>
where
    F: FnMut(IndexMap<String, String>) -> Flow,
{
    let regex = definition.regex();
    let only_matching = definition.flags.only_matching;

    if definition.flags.multiline {
        for caps in regex.captures_iter(content) {
            watchdog.check()?;
            let Some(whole) = caps.get(0) else { continue };
            let span = if only_matching {
                whole.as_str()
            } else {
                enclosing_lines(content, whole.start(), whole.end())
            };
            if emit(extract(definition, &caps, span)) == Flow::Stop {
                return Ok(());
            }
        }
        return Ok(());
    }

    for line in content.lines() {
        watchdog.check()?;
        if only_matching {
            for caps in regex.captures_iter(line) {
                watchdog.check()?;
                let span = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                if emit(extract(definition, &caps, span)) == Flow::Stop {
                    return Ok(());
                }
            }
        } else if let Some(caps) = regex.captures(line) {
            if emit(extract(definition, &caps, line)) == Flow::Stop {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Field map for one match: listed named groups, or the implicit span
pub fn extract(definition: &SearchDefinition, caps: &Captures<'_>, span: &str) -> IndexMap<String, String> {
    let mut row = IndexMap::new();
    match &definition.field_list {
        Some(fields) => {
            for field in fields {
                let value = caps.name(field).map(|m| clean(m.as_str())).unwrap_or_default();
                row.insert(field.clone(), value);
            }
        }
        None => {
            row.insert(IMPLICIT_FIELD.to_string(), clean(span));
        }
    }
    row
}

/// Whole lines covering the byte range `start..end`, without line terminators
pub fn enclosing_lines(content: &str, start: usize, end: usize) -> &str {
    let line_start = content[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);

    let mut span_end = end;
    if end > start && content[..end].ends_with('\n') {
        span_end = end - 1;
    }
    let line_end = content[span_end..]
        .find('\n')
        .map(|i| span_end + i)
        .unwrap_or(content.len());

    content[line_start..line_end].trim_end_matches(['\r', '\n'])
}

fn clean(value: &str) -> String {
    value.trim_end_matches('\r').to_string()
}
