use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use crate::types::{FieldRow, FormReport, ReplayReport};

const MAX_VALUE_WIDTH: usize = 48;

pub fn print_form_report(report: &FormReport, payload_only: bool) {
    if payload_only {
        println!("{}", pretty_json(&report.payload));
        return;
    }
    println!("Form: {}", report.name);
    println!("{}", field_table(report));
    println!(
        "Dirty: {}  Valid: {}",
        yes_no(report.dirty),
        yes_no(report.valid)
    );
    if !report.errors.is_empty() {
        eprintln!("Errors:");
        for error in &report.errors {
            eprintln!("- {error}");
        }
    }
    println!();
    println!("Payload:");
    println!("{}", pretty_json(&report.payload));
}

pub fn print_replay_report(report: &ReplayReport) {
    println!("Form: {}", report.name);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Save"), header_cell("Payload")]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, payload) in report.saves.iter().enumerate() {
        table.add_row(vec![Cell::new(index + 1), Cell::new(pretty_json(payload))]);
    }
    println!("{table}");
    println!(
        "Saves started: {}  Unsaved changes: {}",
        report.saves_started,
        yes_no(report.dirty)
    );
    if let Some(error) = &report.last_error {
        eprintln!("Last save failed: {error}");
    }
}

/// One row per field, nested object and list row.
pub fn field_table(report: &FormReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Kind"),
        header_cell("Dirty"),
        header_cell("Touched"),
        header_cell("Read-only"),
        header_cell("Value"),
        header_cell("Errors"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Center);
    for row in &report.rows {
        table.add_row(vec![
            path_cell(row),
            dim_cell(row.kind),
            flag_cell(row.dirty, Color::Yellow),
            flag_cell(row.touched, Color::Blue),
            flag_cell(row.read_only, Color::Magenta),
            value_cell(&row.value),
            errors_cell(&row.errors),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
    if table.column_count() >= 7 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::LowerBoundary(Width::Fixed(7)),
            ColumnConstraint::LowerBoundary(Width::Fixed(9)),
            ColumnConstraint::LowerBoundary(Width::Fixed(11)),
            ColumnConstraint::UpperBoundary(Width::Percentage(35)),
            ColumnConstraint::UpperBoundary(Width::Percentage(35)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn path_cell(row: &FieldRow) -> Cell {
    match row.kind {
        "object" | "list" => Cell::new(&row.path)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        _ => Cell::new(&row.path),
    }
}

fn flag_cell(flag: bool, color: Color) -> Cell {
    if flag {
        Cell::new("✓").fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn value_cell(value: &serde_json::Value) -> Cell {
    match value {
        serde_json::Value::Null => dim_cell("null"),
        other => Cell::new(truncate(&other.to_string(), MAX_VALUE_WIDTH)),
    }
}

fn errors_cell(errors: &[String]) -> Cell {
    if errors.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(errors.join(", ")).fg(Color::Red)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Shorten to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("abc", 5), "abc");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("äöüäöü", 4), "äöü…");
    }
}
