//! Text rendering of statement outcomes for the shell.

use reldb::{DeleteCount, Outcome, QueryResult, Table};

const RULE: &str = "-----------------------------------------------------------------";

/// The text printed for an outcome, or `None` when there is nothing to show.
pub fn render(outcome: &Outcome) -> Option<String> {
    Some(match outcome {
        Outcome::TableCreated(name) => format!("'{name}' table is created"),
        Outcome::TableDropped(name) => format!("'{name}' table is dropped"),
        Outcome::Described(table) => describe(table),
        Outcome::Tables(names) => table_list(names),
        Outcome::Inserted => "The row is inserted".to_string(),
        Outcome::Deleted(count) => deleted(*count),
        Outcome::Rows(result) => result_table(result),
        Outcome::Exit => return None,
    })
}

fn deleted(count: DeleteCount) -> String {
    let mut out = format!("{} row(s) deleted", count.deleted);
    if count.skipped > 0 {
        out.push_str(&format!(
            "\n{} row(s) are not deleted due to referential integrity",
            count.skipped
        ));
    }
    out
}

/// Key marker of a column in `DESC` output.
fn key_marker(table: &Table, column: &str) -> &'static str {
    match (table.is_primary_key(column), table.is_foreign_key(column)) {
        (true, true) => "PRI/FOR",
        (true, false) => "PRI",
        (false, true) => "FOR",
        (false, false) => "",
    }
}

pub fn describe(table: &Table) -> String {
    let mut out = format!("\n{RULE}\ntable_name [{}]\n", table.name);
    out.push_str(&format!(
        "{:<25}{:<15}{:<10}{:<10}\n",
        "column_name", "type", "null", "key"
    ));
    for col in &table.columns {
        let null = if table.is_not_null(&col.name) { "N" } else { "Y" };
        out.push_str(&format!(
            "{:<25}{:<15}{:<10}{:<10}\n",
            col.name,
            col.data_type.to_string(),
            null,
            key_marker(table, &col.name)
        ));
    }
    out.push_str(RULE);
    out
}

fn table_list(names: &[String]) -> String {
    let rule = "------------------------";
    let mut out = format!("\n{rule}\n");
    for name in names {
        out.push_str(name);
        out.push('\n');
    }
    out.push_str(rule);
    out
}

/// Bordered table with upper-cased headers. NULL prints as `null`.
pub fn result_table(result: &QueryResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = format!(
        "+-{}-+",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    let line = |items: &mut dyn Iterator<Item = String>| -> String {
        let padded: Vec<String> = items
            .zip(&widths)
            .map(|(item, width)| format!("{item:<width$}", width = *width))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut out = format!("\n{separator}\n");
    out.push_str(&line(&mut result.columns.iter().map(|h| h.to_uppercase())));
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    for row in cells {
        out.push_str(&line(&mut row.into_iter()));
        out.push('\n');
    }
    out.push_str(&separator);
    out
}
