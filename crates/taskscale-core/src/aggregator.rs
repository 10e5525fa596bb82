//! Task aggregation by one or two dimensions
//!
//! A task may map to several values of a dimension (several markets, several
//! AI models). It then contributes once to each value's bucket, but only once
//! to any distinct total. Row, column and overall totals are accumulated per
//! task and are never derived by summing buckets.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classify::UNCATEGORIZED;
use crate::error::{EngineError, Result};
use crate::record::NormalizedTask;

/// Bucket key for tasks with no calendar month.
pub const UNKNOWN_MONTH: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Market,
    User,
    Category,
    Subcategory,
    Product,
    AiModel,
    Reporter,
    Month,
    ExternalAsset,
}

impl Dimension {
    pub fn all() -> &'static [Dimension] {
        &[
            Dimension::Market,
            Dimension::User,
            Dimension::Category,
            Dimension::Subcategory,
            Dimension::Product,
            Dimension::AiModel,
            Dimension::Reporter,
            Dimension::Month,
            Dimension::ExternalAsset,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Market => "market",
            Dimension::User => "user",
            Dimension::Category => "category",
            Dimension::Subcategory => "subcategory",
            Dimension::Product => "product",
            Dimension::AiModel => "ai-model",
            Dimension::Reporter => "reporter",
            Dimension::Month => "month",
            Dimension::ExternalAsset => "external-asset",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Market => "Market",
            Dimension::User => "User",
            Dimension::Category => "Category",
            Dimension::Subcategory => "Subcategory",
            Dimension::Product => "Product",
            Dimension::AiModel => "AI Model",
            Dimension::Reporter => "Reporter",
            Dimension::Month => "Month",
            Dimension::ExternalAsset => "Asset Source",
        }
    }

    /// Identity dimensions drop tasks that carry no value for them; the others
    /// fall back to a catch-all bucket.
    pub fn is_identity(&self) -> bool {
        matches!(
            self,
            Dimension::Market | Dimension::User | Dimension::AiModel | Dimension::Reporter
        )
    }

    /// Values this task takes on the dimension, de-duplicated.
    pub fn values(&self, task: &NormalizedTask) -> Vec<DimensionValue> {
        match self {
            Dimension::Market => task.markets.iter().map(DimensionValue::plain).collect(),
            Dimension::User => task.user_id.iter().map(DimensionValue::plain).collect(),
            Dimension::Reporter => task.reporter_id.iter().map(DimensionValue::plain).collect(),
            Dimension::AiModel => task
                .ai_models()
                .into_iter()
                .map(|model| DimensionValue {
                    hours: Some(task.ai_hours_for(&model)),
                    key: model,
                })
                .collect(),
            Dimension::Category => {
                let key = task
                    .classification
                    .category
                    .map(|c| c.as_str())
                    .unwrap_or(UNCATEGORIZED);
                vec![DimensionValue::plain(key)]
            }
            Dimension::Subcategory => {
                vec![DimensionValue::plain(task.classification.subcategory.as_str())]
            }
            Dimension::Product => vec![DimensionValue::plain(task.classification.product_key())],
            Dimension::Month => {
                let key = task.month.as_deref().unwrap_or(UNKNOWN_MONTH);
                vec![DimensionValue::plain(key)]
            }
            Dimension::ExternalAsset => {
                let key = if task.use_external_asset {
                    "external"
                } else {
                    "internal"
                };
                vec![DimensionValue::plain(key)]
            }
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "market" | "markets" => Ok(Dimension::Market),
            "user" | "users" => Ok(Dimension::User),
            "category" | "categories" => Ok(Dimension::Category),
            "subcategory" => Ok(Dimension::Subcategory),
            "product" | "products" => Ok(Dimension::Product),
            "ai-model" | "aimodel" | "ai_model" | "model" => Ok(Dimension::AiModel),
            "reporter" | "reporters" => Ok(Dimension::Reporter),
            "month" | "months" => Ok(Dimension::Month),
            "external-asset" | "asset" => Ok(Dimension::ExternalAsset),
            other => Err(format!("unknown dimension '{}'", other)),
        }
    }
}

/// One value a task takes on a dimension. `hours` overrides the task's hours
/// for this value (AI models carry their own usage hours).
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionValue {
    pub key: String,
    pub hours: Option<f64>,
}

impl DimensionValue {
    fn plain(key: impl AsRef<str>) -> Self {
        Self {
            key: key.as_ref().to_string(),
            hours: None,
        }
    }
}

/// Task count and hour sum. Used for buckets and for every distinct total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub task_count: u64,
    pub hours: f64,
}

/// Aggregated count/hours for one value or one pair of values.
pub type AggregationBucket = Totals;

impl Totals {
    pub fn new(task_count: u64, hours: f64) -> Self {
        Self { task_count, hours }
    }

    fn add(&mut self, hours: f64) {
        self.task_count = self.task_count.saturating_add(1);
        self.hours += hours;
    }

    pub fn merge(&mut self, other: &Totals) {
        self.task_count = self.task_count.saturating_add(other.task_count);
        self.hours += other.hours;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub primary: String,
    pub secondary: Option<String>,
}

impl BucketKey {
    pub fn single(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
        }
    }

    pub fn pair(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: Some(secondary.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub dimensions: Vec<Dimension>,
    /// Per value (one dimension) or per value pair (two dimensions).
    pub buckets: HashMap<BucketKey, AggregationBucket>,
    /// Distinct tasks per primary value.
    pub rows: HashMap<String, Totals>,
    /// Distinct tasks per secondary value. Empty for one dimension.
    pub columns: HashMap<String, Totals>,
    /// Every task, whether or not it reached a bucket.
    pub totals: Totals,
    /// Distinct tasks that reached at least one bucket.
    pub breakdown_totals: Totals,
    /// Tasks excluded from the breakdown (e.g. no markets).
    pub unassigned: Totals,
}

impl Aggregation {
    pub fn primary(&self) -> Dimension {
        self.dimensions[0]
    }

    pub fn secondary(&self) -> Option<Dimension> {
        self.dimensions.get(1).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket(&self, primary: &str, secondary: Option<&str>) -> Option<&AggregationBucket> {
        self.buckets.get(&BucketKey {
            primary: primary.to_string(),
            secondary: secondary.map(str::to_string),
        })
    }

    /// Pair bucket for a table cell; zero when the pair never occurred.
    pub fn cell(&self, row: &str, column: &str) -> Totals {
        self.bucket(row, Some(column)).copied().unwrap_or_default()
    }

    pub fn sorted_columns(&self) -> Vec<(String, Totals)> {
        sorted_by_policy(&self.columns)
    }
}

/// Group `tasks` by one or two dimensions.
pub fn aggregate(tasks: &[NormalizedTask], dimensions: &[Dimension]) -> Result<Aggregation> {
    if dimensions.is_empty() || dimensions.len() > 2 {
        return Err(EngineError::InvalidDimensions(dimensions.len()));
    }

    let primary = dimensions[0];
    let secondary = dimensions.get(1).copied();

    let mut aggregation = Aggregation {
        dimensions: dimensions.to_vec(),
        buckets: HashMap::new(),
        rows: HashMap::new(),
        columns: HashMap::new(),
        totals: Totals::default(),
        breakdown_totals: Totals::default(),
        unassigned: Totals::default(),
    };

    for task in tasks {
        aggregation.totals.add(task.hours);

        let primary_values = primary.values(task);
        let secondary_values = secondary.map(|d| d.values(task));

        let reached = match &secondary_values {
            None => {
                for value in &primary_values {
                    let hours = value.hours.unwrap_or(task.hours);
                    aggregation
                        .buckets
                        .entry(BucketKey::single(&value.key))
                        .or_default()
                        .add(hours);
                    aggregation
                        .rows
                        .entry(value.key.clone())
                        .or_default()
                        .add(hours);
                }
                !primary_values.is_empty()
            }
            Some(columns) => {
                if !primary_values.is_empty() && !columns.is_empty() {
                    for row in &primary_values {
                        aggregation
                            .rows
                            .entry(row.key.clone())
                            .or_default()
                            .add(row.hours.unwrap_or(task.hours));
                        for column in columns {
                            let hours = row.hours.or(column.hours).unwrap_or(task.hours);
                            aggregation
                                .buckets
                                .entry(BucketKey::pair(&row.key, &column.key))
                                .or_default()
                                .add(hours);
                        }
                    }
                    for column in columns {
                        aggregation
                            .columns
                            .entry(column.key.clone())
                            .or_default()
                            .add(column.hours.unwrap_or(task.hours));
                    }
                    true
                } else {
                    false
                }
            }
        };

        if reached {
            aggregation.breakdown_totals.add(task.hours);
        } else {
            aggregation.unassigned.add(task.hours);
        }
    }

    if aggregation.unassigned.task_count > 0 {
        tracing::debug!(
            dimensions = ?aggregation.dimensions,
            excluded = aggregation.unassigned.task_count,
            "tasks without a dimension value excluded from breakdown"
        );
    }

    Ok(aggregation)
}

/// Ordering shared by every ranked list: task count desc, then hours desc.
/// Callers add the label tie-break.
pub fn policy_cmp(a: &Totals, b: &Totals) -> Ordering {
    b.task_count
        .cmp(&a.task_count)
        .then_with(|| b.hours.total_cmp(&a.hours))
}

/// Sort `(label, totals)` pairs by the ranking policy, label ascending last.
pub fn sort_by_policy<T: AsRef<str>>(entries: &mut [(T, Totals)]) {
    entries.sort_by(|a, b| policy_cmp(&a.1, &b.1).then_with(|| a.0.as_ref().cmp(b.0.as_ref())));
}

fn sorted_by_policy(map: &HashMap<String, Totals>) -> Vec<(String, Totals)> {
    let mut entries: Vec<(String, Totals)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    sort_by_policy(&mut entries);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize;
    use serde_json::{json, Value};

    fn tasks(raw: Value) -> Vec<NormalizedTask> {
        raw.as_array().unwrap().iter().map(normalize).collect()
    }

    #[test]
    fn test_aggregate_empty() {
        let result = aggregate(&[], &[Dimension::Market]).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.totals, Totals::default());
    }

    #[test]
    fn test_aggregate_rejects_bad_dimension_count() {
        assert_eq!(
            aggregate(&[], &[]).unwrap_err(),
            EngineError::InvalidDimensions(0)
        );
        assert_eq!(
            aggregate(
                &[],
                &[Dimension::Market, Dimension::User, Dimension::Month]
            )
            .unwrap_err(),
            EngineError::InvalidDimensions(3)
        );
    }

    #[test]
    fn test_distinct_task_invariant() {
        let tasks = tasks(json!([
            { "markets": ["ro", "bg", "ie"], "timeInHours": 3 }
        ]));

        let result = aggregate(&tasks, &[Dimension::Market]).unwrap();
        let contributions: u64 = result.buckets.values().map(|b| b.task_count).sum();
        assert_eq!(contributions, 3);
        assert_eq!(result.breakdown_totals.task_count, 1);
        assert_eq!(result.breakdown_totals.hours, 3.0);
        assert_eq!(result.totals.task_count, 1);
    }

    #[test]
    fn test_market_codes_merge_into_one_bucket() {
        let tasks = tasks(json!([
            { "markets": [" ro "], "timeInHours": 1 },
            { "markets": ["RO"], "timeInHours": 1 },
            { "markets": ["Ro"], "timeInHours": 1 }
        ]));

        let result = aggregate(&tasks, &[Dimension::Market]).unwrap();
        assert_eq!(result.buckets.len(), 1);
        assert_eq!(result.bucket("RO", None).unwrap().task_count, 3);
    }

    #[test]
    fn test_tasks_without_markets_are_unassigned_but_totalled() {
        let tasks = tasks(json!([
            { "markets": ["ro"], "timeInHours": 2 },
            { "markets": [], "timeInHours": 5 },
            { "timeInHours": 1 }
        ]));

        let result = aggregate(&tasks, &[Dimension::Market]).unwrap();
        assert_eq!(result.totals, Totals::new(3, 8.0));
        assert_eq!(result.breakdown_totals, Totals::new(1, 2.0));
        assert_eq!(result.unassigned, Totals::new(2, 6.0));
    }

    #[test]
    fn test_two_dimensions_category_by_market() {
        let tasks = tasks(json!([
            { "products": "marketing casino", "markets": ["ro", "bg"], "timeInHours": 2 },
            { "products": "marketing casino", "markets": ["ro"], "timeInHours": 1 },
            { "products": "product sport", "markets": ["bg"], "timeInHours": 4 }
        ]));

        let result = aggregate(&tasks, &[Dimension::Product, Dimension::Market]).unwrap();
        assert_eq!(result.primary(), Dimension::Product);
        assert_eq!(result.secondary(), Some(Dimension::Market));

        assert_eq!(result.rows["marketing casino"], Totals::new(2, 3.0));
        assert_eq!(result.rows["product sport"], Totals::new(1, 4.0));
        assert_eq!(result.cell("marketing casino", "RO"), Totals::new(2, 3.0));
        assert_eq!(result.cell("marketing casino", "BG"), Totals::new(1, 2.0));
        assert_eq!(result.cell("product sport", "RO"), Totals::default());
        assert_eq!(result.columns["BG"], Totals::new(2, 6.0));
        assert_eq!(result.columns["RO"], Totals::new(2, 3.0));
    }

    #[test]
    fn test_secondary_identity_dimension_excludes_task() {
        let tasks = tasks(json!([
            { "products": "misc", "userUID": "u1", "timeInHours": 1 },
            { "products": "misc", "timeInHours": 1 }
        ]));

        let result = aggregate(&tasks, &[Dimension::Category, Dimension::User]).unwrap();
        assert_eq!(result.rows["misc"].task_count, 1);
        assert_eq!(result.unassigned.task_count, 1);
    }

    #[test]
    fn test_descriptive_dimensions_never_drop_tasks() {
        let tasks = tasks(json!([
            { "products": "graphic design" },
            {}
        ]));

        let by_category = aggregate(&tasks, &[Dimension::Category]).unwrap();
        assert_eq!(by_category.rows[UNCATEGORIZED].task_count, 2);
        assert_eq!(by_category.unassigned.task_count, 0);

        let by_month = aggregate(&tasks, &[Dimension::Month]).unwrap();
        assert_eq!(by_month.rows[UNKNOWN_MONTH].task_count, 2);
    }

    #[test]
    fn test_ai_model_uses_ai_hours() {
        let tasks = tasks(json!([
            {
                "userUID": "u1",
                "timeInHours": 8,
                "aiUsage": [
                    { "aiModels": ["gpt-4", "claude"], "aiHours": 2 },
                    { "aiModels": ["claude"], "aiHours": 1 }
                ]
            }
        ]));

        let result = aggregate(&tasks, &[Dimension::AiModel, Dimension::User]).unwrap();
        assert_eq!(result.rows["claude"], Totals::new(1, 3.0));
        assert_eq!(result.rows["gpt-4"], Totals::new(1, 2.0));
        assert_eq!(result.cell("claude", "u1"), Totals::new(1, 3.0));
        // The user column counts the task once with its full hours
        assert_eq!(result.columns["u1"], Totals::new(1, 8.0));
    }

    #[test]
    fn test_reporter_breakdown_keeps_tasks_without_markets() {
        let tasks = tasks(json!([
            { "reporters": "r1", "timeInHours": 1 },
            { "reporters": "r1", "markets": ["ro"], "timeInHours": 1 }
        ]));

        let by_reporter = aggregate(&tasks, &[Dimension::Reporter]).unwrap();
        assert_eq!(by_reporter.rows["r1"].task_count, 2);

        let by_market = aggregate(&tasks, &[Dimension::Market]).unwrap();
        assert_eq!(by_market.breakdown_totals.task_count, 1);
    }

    #[test]
    fn test_sorted_rows_policy() {
        let tasks = tasks(json!([
            { "markets": ["bg"], "timeInHours": 1 },
            { "markets": ["ie"], "timeInHours": 1 },
            { "markets": ["ro"], "timeInHours": 1 },
            { "markets": ["ro"], "timeInHours": 1 },
            { "markets": ["fi"], "timeInHours": 5 }
        ]));

        let result = aggregate(&tasks, &[Dimension::Market]).unwrap();
        let mut rows: Vec<(String, Totals)> = result.rows.into_iter().collect();
        sort_by_policy(&mut rows);
        let order: Vec<String> = rows.into_iter().map(|(k, _)| k).collect();
        // count desc, then hours desc, then label asc
        assert_eq!(order, vec!["RO", "FI", "BG", "IE"]);
    }

    #[test]
    fn test_external_asset_dimension() {
        let tasks = tasks(json!([
            { "useExternalAsset": true },
            { "useExternalAsset": false },
            {}
        ]));
        let result = aggregate(&tasks, &[Dimension::ExternalAsset]).unwrap();
        assert_eq!(result.rows["external"].task_count, 1);
        assert_eq!(result.rows["internal"].task_count, 2);
    }

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("markets".parse::<Dimension>().unwrap(), Dimension::Market);
        assert_eq!("AI-Model".parse::<Dimension>().unwrap(), Dimension::AiModel);
        assert!("planet".parse::<Dimension>().is_err());
        for dimension in Dimension::all() {
            assert_eq!(dimension.as_str().parse::<Dimension>().unwrap(), *dimension);
        }
    }
}
