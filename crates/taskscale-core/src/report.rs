//! One-call report: table, chart series and totals for a dimension selection

use serde::{Deserialize, Serialize};

use crate::aggregator::{aggregate, Aggregation, Dimension, Totals};
use crate::chart::{build_chart_series, ChartMetric, ChartPoint, DataType, Palette};
use crate::directory::Directory;
use crate::error::Result;
use crate::record::NormalizedTask;
use crate::table::{build_table, ColumnSpec, TableOptions, TableRow};

pub const DEFAULT_TOP_N: usize = 15;

/// Toggles for the sub-outputs of a report. Disabling one never changes the
/// numbers of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_hours: bool,
    pub include_table: bool,
    pub include_grand_total: bool,
    pub include_chart: bool,
    pub include_unassigned: bool,
    pub top_n: Option<usize>,
    pub metric: ChartMetric,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_hours: true,
            include_table: true,
            include_grand_total: true,
            include_chart: true,
            include_unassigned: false,
            top_n: Some(DEFAULT_TOP_N),
            metric: ChartMetric::Tasks,
        }
    }
}

impl ReportOptions {
    fn table_options(&self) -> TableOptions {
        TableOptions {
            include_hours: self.include_hours,
            include_grand_total: self.include_grand_total,
            include_unassigned: self.include_unassigned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub table_data: Vec<TableRow>,
    pub table_columns: Vec<ColumnSpec>,
    pub chart_series: Vec<ChartPoint>,
    /// Distinct tasks across the whole input.
    pub totals: Totals,
}

/// Aggregate `tasks` and render the report.
pub fn build_report(
    tasks: &[NormalizedTask],
    dimensions: &[Dimension],
    directory: &Directory,
    palette: &Palette,
    options: &ReportOptions,
) -> Result<Report> {
    let aggregation = aggregate(tasks, dimensions)?;
    Ok(render_report(&aggregation, directory, palette, options))
}

/// Render an already computed aggregation. Lets callers reuse one
/// aggregation across several reports.
pub fn render_report(
    aggregation: &Aggregation,
    directory: &Directory,
    palette: &Palette,
    options: &ReportOptions,
) -> Report {
    let (table_data, table_columns) = if options.include_table {
        let table = build_table(aggregation, directory, &options.table_options());
        (table.rows, table.columns)
    } else {
        (Vec::new(), Vec::new())
    };

    let chart_series = if options.include_chart {
        build_chart_series(
            aggregation,
            DataType::from(aggregation.primary()),
            options.metric,
            directory,
            palette,
            options.top_n,
        )
    } else {
        Vec::new()
    };

    Report {
        table_data,
        table_columns,
        chart_series,
        totals: aggregation.totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize;
    use serde_json::json;

    fn fixture() -> Vec<NormalizedTask> {
        [
            json!({ "products": "marketing casino", "markets": ["ro", "bg"], "timeInHours": 2 }),
            json!({ "products": "marketing casino", "markets": ["ro"], "timeInHours": 1 }),
            json!({ "products": "product sport", "timeInHours": 4 }),
        ]
        .iter()
        .map(normalize)
        .collect()
    }

    #[test]
    fn test_build_report_full() {
        let report = build_report(
            &fixture(),
            &[Dimension::Market],
            &Directory::default(),
            &Palette::default(),
            &ReportOptions::default(),
        )
        .unwrap();

        assert_eq!(report.totals.task_count, 3);
        assert_eq!(report.totals.hours, 7.0);
        // RO, BG, grand total
        assert_eq!(report.table_data.len(), 3);
        assert_eq!(report.chart_series.len(), 2);
    }

    #[test]
    fn test_toggles_keep_numbers() {
        let tasks = fixture();
        let dims = [Dimension::Product, Dimension::Market];
        let full = build_report(
            &tasks,
            &dims,
            &Directory::default(),
            &Palette::default(),
            &ReportOptions::default(),
        )
        .unwrap();
        let no_table = build_report(
            &tasks,
            &dims,
            &Directory::default(),
            &Palette::default(),
            &ReportOptions {
                include_table: false,
                include_hours: false,
                ..ReportOptions::default()
            },
        )
        .unwrap();

        assert!(no_table.table_data.is_empty());
        assert!(no_table.table_columns.is_empty());
        assert_eq!(no_table.chart_series, full.chart_series);
        assert_eq!(no_table.totals, full.totals);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = build_report(
            &fixture(),
            &[Dimension::Category],
            &Directory::default(),
            &Palette::default(),
            &ReportOptions::default(),
        )
        .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("tableData").is_some());
        assert!(value.get("tableColumns").is_some());
        assert!(value.get("chartSeries").is_some());
        assert_eq!(value["totals"]["taskCount"], json!(3));
    }

    #[test]
    fn test_empty_report_is_structurally_complete() {
        let report = build_report(
            &[],
            &[Dimension::User],
            &Directory::default(),
            &Palette::default(),
            &ReportOptions::default(),
        )
        .unwrap();
        assert_eq!(report.table_data.len(), 1);
        assert_eq!(report.table_data[0].label, "No data");
        assert!(report.chart_series.is_empty());
        assert_eq!(report.totals.task_count, 0);
    }

    #[test]
    fn test_invalid_dimensions_propagate() {
        let err = build_report(
            &fixture(),
            &[],
            &Directory::default(),
            &Palette::default(),
            &ReportOptions::default(),
        );
        assert!(err.is_err());
    }
}
