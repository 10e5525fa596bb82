//! Period-over-period comparison
//!
//! Every period is aggregated on its own before any cross-period arithmetic.
//! Per-dimension series use the union of values across periods and zero-fill
//! the gaps. Top-N truncation only shortens those series; the metric rows are
//! always computed from the complete periods.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::aggregator::{aggregate, policy_cmp, Aggregation, Dimension, Totals};
use crate::chart::{DataType, Palette};
use crate::directory::{month_label, Directory};
use crate::error::{EngineError, Result};
use crate::record::NormalizedTask;
use crate::report::DEFAULT_TOP_N;

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub label: String,
    pub tasks: Vec<NormalizedTask>,
}

impl Period {
    pub fn new(label: impl Into<String>, tasks: Vec<NormalizedTask>) -> Self {
        Self {
            label: label.into(),
            tasks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonMetric {
    TotalTasks,
    TotalHours,
    AverageHoursPerTask,
    AiHours,
    TasksUsingAi,
    ExternalAssetTasks,
    ActiveMarkets,
    ActiveUsers,
}

impl ComparisonMetric {
    pub fn all() -> &'static [ComparisonMetric] {
        &[
            ComparisonMetric::TotalTasks,
            ComparisonMetric::TotalHours,
            ComparisonMetric::AverageHoursPerTask,
            ComparisonMetric::AiHours,
            ComparisonMetric::TasksUsingAi,
            ComparisonMetric::ExternalAssetTasks,
            ComparisonMetric::ActiveMarkets,
            ComparisonMetric::ActiveUsers,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComparisonMetric::TotalTasks => "Total Tasks",
            ComparisonMetric::TotalHours => "Total Hours",
            ComparisonMetric::AverageHoursPerTask => "Average Hours per Task",
            ComparisonMetric::AiHours => "AI Hours",
            ComparisonMetric::TasksUsingAi => "Tasks Using AI",
            ComparisonMetric::ExternalAssetTasks => "External Asset Tasks",
            ComparisonMetric::ActiveMarkets => "Active Markets",
            ComparisonMetric::ActiveUsers => "Active Users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub metric: String,
    pub period1: f64,
    pub period2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period3: Option<f64>,
    /// Change from period 1 to period 2, one decimal.
    pub change_percent: f64,
}

/// Per-value series across periods, e.g. one market's task counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSeries {
    pub key: String,
    pub label: String,
    /// Same color the value gets in any chart series.
    pub color: String,
    /// One entry per period, zero-filled.
    pub values: Vec<Totals>,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub period_labels: Vec<String>,
    pub metrics: Vec<ComparisonRow>,
    pub per_market: Vec<ComparisonSeries>,
    pub per_category: Vec<ComparisonSeries>,
    pub per_user: Vec<ComparisonSeries>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOptions {
    pub top_n: Option<usize>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            top_n: Some(DEFAULT_TOP_N),
        }
    }
}

/// Percentage change from `p1` to `p2`, rounded to one decimal.
///
/// A zero baseline yields 0 when both are zero and ±100 otherwise, so a
/// value appearing from nothing reads as +100 rather than infinity.
pub fn change_percent(p1: f64, p2: f64) -> f64 {
    if p1 == 0.0 {
        return if p2 > 0.0 {
            100.0
        } else if p2 < 0.0 {
            -100.0
        } else {
            0.0
        };
    }
    (((p2 - p1) / p1 * 100.0) * 10.0).round() / 10.0
}

struct PeriodStats {
    markets: Aggregation,
    categories: Aggregation,
    users: Aggregation,
    ai_hours: f64,
    tasks_using_ai: u64,
    external_asset_tasks: u64,
}

impl PeriodStats {
    fn collect(tasks: &[NormalizedTask]) -> Result<Self> {
        Ok(Self {
            markets: aggregate(tasks, &[Dimension::Market])?,
            categories: aggregate(tasks, &[Dimension::Category])?,
            users: aggregate(tasks, &[Dimension::User])?,
            ai_hours: tasks.iter().map(NormalizedTask::total_ai_hours).sum(),
            tasks_using_ai: tasks.iter().filter(|t| t.uses_ai()).count() as u64,
            external_asset_tasks: tasks.iter().filter(|t| t.use_external_asset).count() as u64,
        })
    }

    fn value(&self, metric: ComparisonMetric) -> f64 {
        // Every aggregation sees the whole period, so any of them holds the totals
        let totals = self.markets.totals;
        match metric {
            ComparisonMetric::TotalTasks => totals.task_count as f64,
            ComparisonMetric::TotalHours => totals.hours,
            ComparisonMetric::AverageHoursPerTask => {
                if totals.task_count == 0 {
                    0.0
                } else {
                    totals.hours / totals.task_count as f64
                }
            }
            ComparisonMetric::AiHours => self.ai_hours,
            ComparisonMetric::TasksUsingAi => self.tasks_using_ai as f64,
            ComparisonMetric::ExternalAssetTasks => self.external_asset_tasks as f64,
            ComparisonMetric::ActiveMarkets => self.markets.rows.len() as f64,
            ComparisonMetric::ActiveUsers => self.users.rows.len() as f64,
        }
    }
}

/// Compare two or three periods.
pub fn compare(
    periods: &[Period],
    options: &CompareOptions,
    directory: &Directory,
    palette: &Palette,
) -> Result<Comparison> {
    if !(2..=3).contains(&periods.len()) {
        return Err(EngineError::InvalidPeriodCount(periods.len()));
    }

    let stats = periods
        .iter()
        .map(|p| PeriodStats::collect(&p.tasks))
        .collect::<Result<Vec<_>>>()?;

    let metrics = ComparisonMetric::all()
        .iter()
        .map(|metric| {
            let values: Vec<f64> = stats.iter().map(|s| s.value(*metric)).collect();
            ComparisonRow {
                metric: metric.label().to_string(),
                period1: values[0],
                period2: values[1],
                period3: values.get(2).copied(),
                change_percent: change_percent(values[0], values[1]),
            }
        })
        .collect();

    let markets: Vec<&Aggregation> = stats.iter().map(|s| &s.markets).collect();
    let categories: Vec<&Aggregation> = stats.iter().map(|s| &s.categories).collect();
    let users: Vec<&Aggregation> = stats.iter().map(|s| &s.users).collect();

    tracing::debug!(
        periods = periods.len(),
        "compared {}",
        periods
            .iter()
            .map(|p| p.label.as_str())
            .collect::<Vec<_>>()
            .join(" vs ")
    );

    Ok(Comparison {
        period_labels: periods.iter().map(|p| p.label.clone()).collect(),
        metrics,
        per_market: series(&markets, Dimension::Market, directory, palette, options.top_n),
        per_category: series(&categories, Dimension::Category, directory, palette, options.top_n),
        per_user: series(&users, Dimension::User, directory, palette, options.top_n),
    })
}

fn series(
    aggregations: &[&Aggregation],
    dimension: Dimension,
    directory: &Directory,
    palette: &Palette,
    top_n: Option<usize>,
) -> Vec<ComparisonSeries> {
    let data_type = DataType::from(dimension);
    let universe: BTreeSet<&String> = aggregations.iter().flat_map(|a| a.rows.keys()).collect();

    let mut combined: HashMap<&String, Totals> = HashMap::new();
    let mut entries: Vec<ComparisonSeries> = universe
        .into_iter()
        .map(|key| {
            let values: Vec<Totals> = aggregations
                .iter()
                .map(|a| a.rows.get(key).copied().unwrap_or_default())
                .collect();
            let total = combined.entry(key).or_default();
            values.iter().for_each(|v| total.merge(v));
            ComparisonSeries {
                key: key.clone(),
                label: directory.label(dimension, key),
                color: palette.color(key, data_type),
                change_percent: change_percent(
                    values[0].task_count as f64,
                    values[1].task_count as f64,
                ),
                values,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        let ta = combined.get(&a.key).copied().unwrap_or_default();
        let tb = combined.get(&b.key).copied().unwrap_or_default();
        policy_cmp(&ta, &tb)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.key.cmp(&b.key))
    });
    if let Some(limit) = top_n {
        entries.truncate(limit);
    }
    entries
}

/// Split `tasks` into one period per `YYYY-MM` month, in the given order.
pub fn periods_by_month(tasks: &[NormalizedTask], months: &[String]) -> Vec<Period> {
    months
        .iter()
        .map(|month| {
            let selected: Vec<NormalizedTask> = tasks
                .iter()
                .filter(|t| t.month.as_deref() == Some(month.as_str()))
                .cloned()
                .collect();
            Period::new(month_label(month), selected)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{build_chart_series, ChartMetric};
    use crate::record::normalize;
    use serde_json::{json, Value};

    fn tasks(raw: Value) -> Vec<NormalizedTask> {
        raw.as_array().unwrap().iter().map(normalize).collect()
    }

    fn compare_default(periods: &[Period]) -> Comparison {
        compare(
            periods,
            &CompareOptions::default(),
            &Directory::default(),
            &Palette::default(),
        )
        .unwrap()
    }

    fn row<'a>(comparison: &'a Comparison, metric: ComparisonMetric) -> &'a ComparisonRow {
        comparison
            .metrics
            .iter()
            .find(|r| r.metric == metric.label())
            .unwrap()
    }

    #[test]
    fn test_change_percent() {
        assert_eq!(change_percent(0.0, 0.0), 0.0);
        assert_eq!(change_percent(0.0, 5.0), 100.0);
        assert_eq!(change_percent(0.0, -2.0), -100.0);
        assert_eq!(change_percent(4.0, 5.0), 25.0);
        assert_eq!(change_percent(3.0, 4.0), 33.3);
        assert_eq!(change_percent(3.0, 2.0), -33.3);
    }

    #[test]
    fn test_empty_to_one_task() {
        let periods = vec![
            Period::new("A", Vec::new()),
            Period::new("B", tasks(json!([{ "markets": ["ro"], "timeInHours": 2 }]))),
        ];
        let comparison = compare_default(&periods);

        let total = row(&comparison, ComparisonMetric::TotalTasks);
        assert_eq!(total.period1, 0.0);
        assert_eq!(total.period2, 1.0);
        assert_eq!(total.period3, None);
        assert_eq!(total.change_percent, 100.0);
    }

    #[test]
    fn test_period_count_is_validated() {
        let options = CompareOptions::default();
        let directory = Directory::default();
        let palette = Palette::default();

        let one = vec![Period::new("A", Vec::new())];
        assert_eq!(
            compare(&one, &options, &directory, &palette).unwrap_err(),
            EngineError::InvalidPeriodCount(1)
        );
        let four: Vec<Period> = (0..4).map(|i| Period::new(i.to_string(), Vec::new())).collect();
        assert!(compare(&four, &options, &directory, &palette).is_err());
    }

    #[test]
    fn test_union_universe_zero_fills() {
        let periods = vec![
            Period::new("A", tasks(json!([{ "markets": ["ro"], "userUID": "u1" }]))),
            Period::new("B", tasks(json!([{ "markets": ["bg"], "userUID": "u1" }]))),
            Period::new("C", tasks(json!([{ "markets": ["ro", "bg"], "userUID": "u2" }]))),
        ];
        let comparison = compare_default(&periods);

        assert_eq!(comparison.per_market.len(), 2);
        let ro = comparison.per_market.iter().find(|s| s.key == "RO").unwrap();
        let counts: Vec<u64> = ro.values.iter().map(|v| v.task_count).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        assert_eq!(ro.change_percent, -100.0);

        let bg = comparison.per_market.iter().find(|s| s.key == "BG").unwrap();
        assert_eq!(bg.change_percent, 100.0);

        let users = row(&comparison, ComparisonMetric::ActiveUsers);
        assert_eq!(users.period3, Some(1.0));
    }

    #[test]
    fn test_top_n_only_trims_series() {
        let first = tasks(json!([
            { "markets": ["ro", "bg", "ie", "fi"] },
            { "markets": ["ro"] }
        ]));
        let periods = vec![Period::new("A", first), Period::new("B", Vec::new())];
        let comparison =
            compare(
                &periods,
                &CompareOptions { top_n: Some(1) },
                &Directory::default(),
                &Palette::default(),
            )
            .unwrap();

        assert_eq!(comparison.per_market.len(), 1);
        assert_eq!(comparison.per_market[0].key, "RO");
        assert_eq!(row(&comparison, ComparisonMetric::ActiveMarkets).period1, 4.0);
        assert_eq!(row(&comparison, ComparisonMetric::TotalTasks).period1, 2.0);
    }

    #[test]
    fn test_ai_and_external_metrics() {
        let periods = vec![
            Period::new(
                "A",
                tasks(json!([
                    { "timeInHours": 4, "aiUsage": [{ "aiHours": 1.5, "aiModels": ["gpt"] }] },
                    { "timeInHours": 2, "useExternalAsset": true }
                ])),
            ),
            Period::new("B", tasks(json!([{ "timeInHours": 3 }]))),
        ];
        let comparison = compare_default(&periods);

        assert_eq!(row(&comparison, ComparisonMetric::AiHours).period1, 1.5);
        assert_eq!(row(&comparison, ComparisonMetric::TasksUsingAi).period1, 1.0);
        assert_eq!(row(&comparison, ComparisonMetric::ExternalAssetTasks).period1, 1.0);
        assert_eq!(row(&comparison, ComparisonMetric::AverageHoursPerTask).period1, 3.0);
        assert_eq!(row(&comparison, ComparisonMetric::AverageHoursPerTask).period2, 3.0);
        assert_eq!(
            row(&comparison, ComparisonMetric::TotalHours).change_percent,
            -50.0
        );
    }

    #[test]
    fn test_category_series_labels() {
        let periods = vec![
            Period::new("A", tasks(json!([{ "products": "marketing casino" }]))),
            Period::new("B", tasks(json!([{ "products": "acquisition lotto" }]))),
        ];
        let comparison = compare_default(&periods);
        let labels: Vec<&str> = comparison.per_category.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Acquisition", "Marketing"]);
    }

    #[test]
    fn test_periods_by_month() {
        let all = tasks(json!([
            { "monthId": "2024-04", "markets": ["ro"] },
            { "monthId": "2024-05", "markets": ["ro"] },
            { "monthId": "2024-05", "markets": ["bg"] },
            { "markets": ["ie"] }
        ]));
        let periods = periods_by_month(&all, &["2024-04".to_string(), "2024-05".to_string()]);
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].label, "April 2024");
        assert_eq!(periods[0].tasks.len(), 1);
        assert_eq!(periods[1].tasks.len(), 2);

        let comparison = compare_default(&periods);
        assert_eq!(row(&comparison, ComparisonMetric::TotalTasks).change_percent, 100.0);
    }

    #[test]
    fn test_series_colors_match_chart_colors() {
        let first = tasks(json!([
            { "markets": ["ro", "cz"], "userUID": "u1" },
            { "markets": ["xq"], "userUID": "u2" }
        ]));
        let second = tasks(json!([{ "markets": ["cz"], "userUID": "u1" }]));
        let directory = Directory::default();
        let palette = Palette::default().with_override(DataType::Market, "RO", "#000000");

        let comparison = compare(
            &[Period::new("A", first.clone()), Period::new("B", second)],
            &CompareOptions::default(),
            &directory,
            &palette,
        )
        .unwrap();

        let aggregation = aggregate(&first, &[Dimension::Market]).unwrap();
        let chart = build_chart_series(
            &aggregation,
            DataType::Market,
            ChartMetric::Tasks,
            &directory,
            &palette,
            None,
        );
        for point in &chart {
            let entry = comparison
                .per_market
                .iter()
                .find(|s| s.key == point.key)
                .unwrap();
            assert_eq!(entry.color, point.color, "market {}", point.key);
        }
        assert_eq!(
            comparison.per_market.iter().find(|s| s.key == "RO").unwrap().color,
            "#000000"
        );
        let category = &comparison.per_category[0];
        assert_eq!(category.color, palette.color(&category.key, DataType::Product));
    }
}
