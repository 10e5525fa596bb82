#![deny(clippy::all)]

//! Task analytics engine: normalizes loosely structured task records and
//! turns them into tables, chart series and period comparisons.

pub mod aggregator;
pub mod cache;
pub mod chart;
pub mod classify;
pub mod compare;
pub mod directory;
mod error;
pub mod percent;
pub mod record;
pub mod report;
pub mod table;

pub use aggregator::{aggregate, Aggregation, AggregationBucket, BucketKey, Dimension, Totals};
pub use cache::{CacheKey, ReportCache};
pub use chart::{build_chart_series, color_for, ChartMetric, ChartPoint, ChartValue, DataType, Palette};
pub use classify::{classify, normalize_market, Category, Classification, Subcategory};
pub use compare::{
    change_percent, compare, periods_by_month, CompareOptions, Comparison, ComparisonMetric,
    ComparisonRow, ComparisonSeries, Period,
};
pub use directory::{Directory, Person};
pub use error::{EngineError, Result};
pub use percent::allocate_percentages;
pub use record::{normalize, normalize_all, NormalizedTask, TaskRecord};
pub use report::{build_report, render_report, Report, ReportOptions, DEFAULT_TOP_N};
pub use table::{build_grand_total, build_table, Cell, ColumnSpec, Table, TableOptions, TableRow};

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
