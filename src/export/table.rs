//! Table normalization and CSV rendering shared by the export documents.

use serde_json::Value;

/// Normalize an arbitrary JSON shape into table rows (header row first).
///
/// Handles the shapes generation services actually return: a list of maps
/// (headers from the first item), a list of lists (used verbatim), a plain
/// map (Field/Value rows), or a string (single Text cell, fences stripped and
/// re-parsed when it is stringified JSON). Returns None for null or empty
/// input.
pub fn rows_from_any(data: &Value) -> Option<Vec<Vec<String>>> {
    match data {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => {
            let txt = crate::plan::coerce::strip_code_fences(s);
            match serde_json::from_str::<Value>(txt) {
                Ok(inner) if !matches!(inner, Value::String(_)) => rows_from_any(&inner),
                _ => Some(vec![
                    vec!["Text".to_string()],
                    vec![txt.to_string()],
                ]),
            }
        }
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => match &items[0] {
            Value::Object(first) => {
                let headers: Vec<String> = first.keys().cloned().collect();
                let mut rows = vec![headers.clone()];
                for item in items {
                    let obj = item.as_object();
                    rows.push(
                        headers
                            .iter()
                            .map(|h| {
                                obj.and_then(|o| o.get(h))
                                    .map(cell_text)
                                    .unwrap_or_default()
                            })
                            .collect(),
                    );
                }
                Some(rows)
            }
            Value::Array(_) => Some(
                items
                    .iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect(),
            ),
            _ => Some(
                std::iter::once(vec!["Value".to_string()])
                    .chain(items.iter().map(|v| vec![cell_text(v)]))
                    .collect(),
            ),
        },
        Value::Object(map) => Some(
            std::iter::once(vec!["Field".to_string(), "Value".to_string()])
                .chain(map.iter().map(|(k, v)| vec![k.clone(), cell_text(v)]))
                .collect(),
        ),
        _ => Some(vec![vec!["Text".to_string()], vec![cell_text(data)]]),
    }
}

/// Render a value as one table cell.
fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a money-like string ("£123,456.78", "$1,000") into a float.
pub fn parse_money(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}
