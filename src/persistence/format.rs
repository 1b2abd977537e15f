//! Text renderings of query results and schema metadata
//!
//! These are the strings handed back to the reasoning service as tool output,
//! so they favour compact, deterministic layouts.

use serde_json::Value;

use crate::persistence::executor::QueryResult;
use crate::persistence::introspect::{ColumnInfo, TableSnapshot};

/// Number of distinct values listed per column in a sample summary
const SAMPLE_VALUES_PER_COLUMN: usize = 3;

/// Render a single cell for display
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(&['\r', '\n'][..], " ")
}

/// Render a result as a markdown table
pub fn markdown_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "Query returned no rows.".to_string();
    }

    let mut out = String::new();
    out.push_str("| ");
    out.push_str(
        &result
            .columns
            .iter()
            .map(|c| escape_cell(c))
            .collect::<Vec<_>>()
            .join(" | "),
    );
    out.push_str(" |\n| ");
    out.push_str(&vec!["---"; result.columns.len()].join(" | "));
    out.push_str(" |\n");

    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|v| escape_cell(&cell_text(v))).collect();
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
    }

    if result.truncated {
        out.push_str(&format!(
            "\n(showing the first {} rows; more rows were available)\n",
            result.row_count
        ));
    }

    out
}

/// Render a table's column list
///
/// ```text
/// Table Name: "public"."orders"
/// ----------
/// id(integer)
/// total(numeric) - Order total in EUR
/// ```
pub fn table_info(schema: &str, table: &str, columns: &[ColumnInfo]) -> String {
    let mut out = format!("Table Name: \"{}\".\"{}\"\n----------\n", schema, table);
    for column in columns {
        out.push_str(&format!("{}({})", column.name, column.data_type));
        if let Some(description) = column.description.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!(" - {}", description));
        }
        out.push('\n');
    }
    out
}

/// Summarise sample rows as a few distinct non-empty values per column
pub fn sample_summary(rows: &QueryResult) -> String {
    let mut out = String::new();
    for (index, column) in rows.columns.iter().enumerate() {
        let mut distinct: Vec<String> = Vec::new();
        for row in &rows.rows {
            let value = match row.get(index) {
                Some(Value::Null) | None => continue,
                Some(v) => cell_text(v),
            };
            if value.is_empty() || distinct.contains(&value) {
                continue;
            }
            distinct.push(value);
        }
        if distinct.is_empty() {
            continue;
        }

        let shown = distinct
            .iter()
            .take(SAMPLE_VALUES_PER_COLUMN)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("{}: {}", column, shown));
        if distinct.len() > SAMPLE_VALUES_PER_COLUMN {
            out.push_str(", ...");
        }
        out.push('\n');
    }
    out
}

/// Full schema context for one table: columns followed by sample values
pub fn table_snapshot(schema: &str, snapshot: &TableSnapshot) -> String {
    let mut out = table_info(schema, &snapshot.name, &snapshot.columns);
    let samples = sample_summary(&snapshot.sample_rows);
    if !samples.is_empty() {
        out.push_str("Sample values:\n");
        out.push_str(&samples);
    }
    out
}
