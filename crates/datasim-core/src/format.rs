//! Delimited-text rendering of tabular JSON records.

use serde_json::{Map, Value};

/// Returned instead of a table when there is nothing to render.
pub const NO_DATA_SENTINEL: &str = "No data available";

/// Renders records as quoted, comma-delimited text.
///
/// The header comes from the first record's keys in insertion order. Every
/// field is quoted with embedded quotes doubled, and lines are joined with
/// `\n`. Keys missing from later records, and nulls, render as `""`.
pub fn to_delimited_text(rows: &[Map<String, Value>]) -> String {
    let Some(first) = rows.first() else {
        return String::from(NO_DATA_SENTINEL);
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(join_quoted(headers.iter().map(|header| (*header).to_owned())));

    for row in rows {
        lines.push(join_quoted(
            headers
                .iter()
                .map(|header| cell_text(row.get(*header))),
        ));
    }

    lines.join("\n")
}

/// Like [`to_delimited_text`], for an arbitrary JSON value. Anything other
/// than a non-empty array of objects renders as the sentinel; non-object
/// array entries are treated as empty records.
pub fn to_delimited_text_value(value: &Value) -> String {
    let Value::Array(items) = value else {
        return String::from(NO_DATA_SENTINEL);
    };

    let rows: Vec<Map<String, Value>> = items
        .iter()
        .map(|item| match item {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        })
        .collect();
    to_delimited_text(&rows)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn join_quoted(cells: impl Iterator<Item = String>) -> String {
    cells
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}
