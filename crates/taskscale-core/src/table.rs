//! Table rows with per-column shares and a synthesized grand total

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregator::{policy_cmp, Aggregation, Totals};
use crate::directory::{unassigned_label, Directory};
use crate::percent::allocate_in_order;

pub const GRAND_TOTAL_KEY: &str = "grand-total";
pub const NO_DATA_KEY: &str = "no-data";
pub const UNASSIGNED_KEY: &str = "unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub count: u64,
    /// `None` on the grand total row, which answers "how many", not "what share".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub key: String,
    pub label: String,
    /// Distinct tasks in this row.
    pub task_count: u64,
    pub hours: f64,
    /// One cell per column value observed anywhere in the table.
    pub cells: BTreeMap<String, Cell>,
    pub is_total: bool,
    pub is_placeholder: bool,
}

impl TableRow {
    fn placeholder(key: &str, label: &str, totals: Totals) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            task_count: totals.task_count,
            hours: totals.hours,
            cells: BTreeMap::new(),
            is_total: false,
            is_placeholder: true,
        }
    }

    /// Sum of the row's cell counts: the base its percentages are taken from.
    pub fn cell_total(&self) -> u64 {
        self.cells.values().map(|c| c.count).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    Label,
    Tasks,
    Hours,
    Dimension,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub key: String,
    pub title: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    fn new(key: &str, title: &str, kind: ColumnKind) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub include_hours: bool,
    pub include_grand_total: bool,
    /// Add a placeholder row for tasks with no value on the primary dimension.
    pub include_unassigned: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            include_hours: true,
            include_grand_total: true,
            include_unassigned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub rows: Vec<TableRow>,
    pub columns: Vec<ColumnSpec>,
}

/// Build the table for an aggregation: one row per primary value in ranking
/// order, one dimension column per secondary value, then the grand total.
pub fn build_table(aggregation: &Aggregation, directory: &Directory, options: &TableOptions) -> Table {
    let primary = aggregation.primary();
    let column_keys: Vec<String> = aggregation
        .sorted_columns()
        .into_iter()
        .map(|(key, _)| key)
        .collect();

    let mut columns = vec![
        ColumnSpec::new("label", primary.title(), ColumnKind::Label),
        ColumnSpec::new("tasks", "Tasks", ColumnKind::Tasks),
    ];
    if options.include_hours {
        columns.push(ColumnSpec::new("hours", "Hours", ColumnKind::Hours));
    }
    if let Some(secondary) = aggregation.secondary() {
        columns.extend(column_keys.iter().map(|key| ColumnSpec {
            key: key.clone(),
            title: directory.label(secondary, key),
            kind: ColumnKind::Dimension,
        }));
    }

    let mut ranked: Vec<(String, String, Totals)> = aggregation
        .rows
        .iter()
        .map(|(key, totals)| (key.clone(), directory.label(primary, key), *totals))
        .collect();
    ranked.sort_by(|a, b| {
        policy_cmp(&a.2, &b.2)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut rows: Vec<TableRow> = ranked
        .into_iter()
        .map(|(key, label, totals)| {
            let counts: Vec<i64> = column_keys
                .iter()
                .map(|column| aggregation.cell(&key, column).task_count as i64)
                .collect();
            let cells = share_cells(&column_keys, &counts);
            TableRow {
                key,
                label,
                task_count: totals.task_count,
                hours: totals.hours,
                cells,
                is_total: false,
                is_placeholder: false,
            }
        })
        .collect();

    let mut distinct = aggregation.breakdown_totals;
    if options.include_unassigned && aggregation.unassigned.task_count > 0 {
        distinct.merge(&aggregation.unassigned);
        let mut row = TableRow::placeholder(
            UNASSIGNED_KEY,
            unassigned_label(primary),
            aggregation.unassigned,
        );
        let zeros = vec![0i64; column_keys.len()];
        row.cells = share_cells(&column_keys, &zeros);
        rows.push(row);
    }

    if rows.is_empty() {
        rows.push(TableRow::placeholder(NO_DATA_KEY, "No data", Totals::default()));
        return Table { rows, columns };
    }

    if options.include_grand_total {
        let total = build_grand_total(&rows, distinct);
        rows.push(total);
    }

    Table { rows, columns }
}

fn share_cells(column_keys: &[String], counts: &[i64]) -> BTreeMap<String, Cell> {
    let total: u64 = counts.iter().map(|c| (*c).max(0) as u64).sum();
    let shares = allocate_in_order(counts, total);
    column_keys
        .iter()
        .zip(counts.iter().zip(shares))
        .map(|(key, (count, share))| {
            (
                key.clone(),
                Cell {
                    count: (*count).max(0) as u64,
                    percentage: Some(share),
                },
            )
        })
        .collect()
}

/// Grand total row: dimension cells sum the non-total rows and carry counts
/// only. Task count and hours come from `distinct`, the distinct task set
/// behind the rows, since a multi-valued primary dimension puts one task in
/// several rows.
pub fn build_grand_total(rows: &[TableRow], distinct: Totals) -> TableRow {
    let mut total = TableRow {
        key: GRAND_TOTAL_KEY.to_string(),
        label: "Grand Total".to_string(),
        task_count: distinct.task_count,
        hours: distinct.hours,
        cells: BTreeMap::new(),
        is_total: true,
        is_placeholder: false,
    };

    for row in rows.iter().filter(|r| !r.is_total) {
        for (key, cell) in &row.cells {
            let entry = total.cells.entry(key.clone()).or_insert(Cell {
                count: 0,
                percentage: None,
            });
            entry.count = entry.count.saturating_add(cell.count);
        }
    }

    total
}
