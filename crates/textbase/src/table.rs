use derive_more::{Display, Error};
use itertools::Itertools;
use serde_json::{Map, Value};

/// A single flat table row, as an ordered list of column name and cell pairs.
pub(crate) type Record = Vec<(String, String)>;

/// Returned by [`render`] when there is nothing to display.
#[derive(Debug, Display, Error)]
#[display(fmt = "no records to display")]
pub(crate) struct NoRecords;

/// Render records as an aligned text table with a single header row.
///
/// Columns follow the key order of the first record. Cells missing from
/// subsequent records are left blank. An empty sequence, or one starting
/// with a record without columns, yields [`NoRecords`].
pub(crate) fn render(records: &[Record]) -> Result<String, NoRecords> {
    let Some(first) = records.first().filter(|record| !record.is_empty()) else {
        return Err(NoRecords);
    };

    let headers = first.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>();

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|header| {
                    record
                        .iter()
                        .find(|(key, _)| key.as_str() == *header)
                        .map(|(_, value)| value.as_str())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            rows.iter()
                .map(|row| row[column].chars().count())
                .chain([header.chars().count()])
                .max()
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    let border = format!(
        "+{}+",
        widths.iter().map(|width| "-".repeat(width + 2)).join("+")
    );

    let line = |cells: &[&str]| {
        format!(
            "| {} |",
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:^width$}"))
                .join(" | ")
        )
    };

    let mut lines = vec![border.clone(), line(&headers), border.clone()];
    lines.extend(rows.iter().map(|row| line(row)));
    lines.push(border);

    Ok(lines.join("\n"))
}

/// Flatten a JSON object into a [`Record`], preserving key order.
pub(crate) fn record_from_object(object: &Map<String, Value>) -> Record {
    object
        .iter()
        .map(|(key, value)| (key.clone(), cell(value)))
        .collect()
}

/// Convert a JSON value into a table cell.
///
/// Strings are used verbatim, `null` becomes an empty cell and
/// everything else is rendered as compact JSON.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
