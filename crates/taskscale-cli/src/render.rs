//! Terminal rendering for reports and comparisons.

use colored::Colorize;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use taskscale_core::table::ColumnKind;
use taskscale_core::{ChartPoint, ChartValue, Comparison, ComparisonSeries, Report, Totals};

use crate::config::rgb;

const BAR_WIDTH: usize = 40;

pub fn format_hours(hours: f64) -> String {
    let rounded = (hours * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.2}", rounded)
            .trim_end_matches('0')
            .to_string()
    }
}

pub fn format_change(change: f64) -> String {
    if change > 0.0 {
        format!("+{:.1}%", change)
    } else {
        format!("{:.1}%", change)
    }
}

fn change_cell(change: f64) -> Cell {
    let color = if change > 0.0 {
        Color::Green
    } else if change < 0.0 {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new(format_change(change))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

pub fn print_table(report: &Report) {
    if report.table_columns.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(report.table_columns.iter().map(|c| c.title.clone()));

    for row in &report.table_data {
        let cells: Vec<Cell> = report
            .table_columns
            .iter()
            .map(|column| {
                let text = match column.kind {
                    ColumnKind::Label => row.label.clone(),
                    ColumnKind::Tasks if row.is_placeholder && row.task_count == 0 => String::new(),
                    ColumnKind::Tasks => row.task_count.to_string(),
                    ColumnKind::Hours if row.is_placeholder && row.task_count == 0 => String::new(),
                    ColumnKind::Hours => format_hours(row.hours),
                    ColumnKind::Dimension => match row.cells.get(&column.key) {
                        Some(cell) => match cell.percentage {
                            Some(pct) => format!("{} ({}%)", cell.count, pct),
                            None => cell.count.to_string(),
                        },
                        None => String::new(),
                    },
                };
                let mut cell = Cell::new(text);
                if column.kind != ColumnKind::Label {
                    cell = cell.set_alignment(CellAlignment::Right);
                }
                if row.is_total {
                    cell = cell.add_attribute(Attribute::Bold);
                }
                if row.is_placeholder {
                    cell = cell.add_attribute(Attribute::Dim);
                }
                cell
            })
            .collect();
        table.add_row(cells);
    }

    println!("{table}");
    print_totals(&report.totals);
}

pub fn print_totals(totals: &Totals) {
    println!(
        "\nTotal: {} tasks | {} hours",
        totals.task_count,
        format_hours(totals.hours)
    );
}

fn point_magnitude(value: &ChartValue) -> f64 {
    match value {
        ChartValue::Single(v) => *v,
        ChartValue::Split { tasks, .. } => *tasks as f64,
    }
}

fn point_text(value: &ChartValue) -> String {
    match value {
        ChartValue::Single(v) => format_hours(*v),
        ChartValue::Split { tasks, hours } => format!("{} tasks, {}h", tasks, format_hours(*hours)),
    }
}

/// Horizontal bar length for `value` against `max`. Non-zero values get at
/// least one block.
pub fn bar_length(value: f64, max: f64) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max * BAR_WIDTH as f64).round() as usize).clamp(1, BAR_WIDTH)
}

pub fn print_chart(series: &[ChartPoint]) {
    if series.is_empty() {
        println!("{}", "  No data".bright_black());
        return;
    }

    let name_width = series.iter().map(|p| p.name.chars().count()).max().unwrap_or(0);
    let max = series
        .iter()
        .map(|p| point_magnitude(&p.value))
        .fold(0.0, f64::max);

    for point in series {
        let bar = "█".repeat(bar_length(point_magnitude(&point.value), max));
        let bar = match rgb(&point.color) {
            Some((r, g, b)) => bar.truecolor(r, g, b).to_string(),
            None => bar,
        };
        println!(
            "  {:<width$}  {} {}",
            point.name,
            bar,
            point_text(&point.value).bright_black(),
            width = name_width
        );
    }
}

pub fn print_comparison(comparison: &Comparison) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec!["Metric".to_string()];
    header.extend(comparison.period_labels.iter().cloned());
    header.push("Change".to_string());
    table.set_header(header);

    for row in &comparison.metrics {
        let mut cells = vec![Cell::new(&row.metric)];
        let values = [Some(row.period1), Some(row.period2), row.period3];
        for value in values.iter().take(comparison.period_labels.len()) {
            let text = value.map(format_hours).unwrap_or_default();
            cells.push(Cell::new(text).set_alignment(CellAlignment::Right));
        }
        cells.push(change_cell(row.change_percent));
        table.add_row(cells);
    }
    println!("{table}");

    print_series("Markets", &comparison.period_labels, &comparison.per_market);
    print_series("Categories", &comparison.period_labels, &comparison.per_category);
    print_series("Users", &comparison.period_labels, &comparison.per_user);
}

fn print_series(title: &str, labels: &[String], series: &[ComparisonSeries]) {
    if series.is_empty() {
        return;
    }
    println!("\n{}", title.bold());

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![String::new()];
    header.extend(labels.iter().cloned());
    header.push("Change".to_string());
    table.set_header(header);

    for entry in series {
        let mut label = Cell::new(&entry.label);
        if let Some((r, g, b)) = rgb(&entry.color) {
            label = label.fg(Color::Rgb { r, g, b });
        }
        let mut cells = vec![label];
        cells.extend(
            entry
                .values
                .iter()
                .map(|v| Cell::new(v.task_count).set_alignment(CellAlignment::Right)),
        );
        cells.push(change_cell(entry.change_percent));
        table.add_row(cells);
    }
    println!("{table}");
}
