//! Chart series and deterministic colors
//!
//! A value's color depends only on the value and its data type. Catalog
//! markets and AI models take the palette slot of their catalog position, so
//! distinct catalog values never share a color until the palette cycles.
//! Products follow their classification. Values outside a catalog are hashed
//! with FNV-1a into a palette the catalog does not use.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregator::{policy_cmp, Aggregation, Dimension, UNKNOWN_MONTH};
use crate::classify::{classify, normalize_market, Category, Subcategory, UNCATEGORIZED};
use crate::directory::Directory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Market,
    User,
    Product,
    AiModel,
    Reporter,
    Month,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Market => "market",
            DataType::User => "user",
            DataType::Product => "product",
            DataType::AiModel => "ai-model",
            DataType::Reporter => "reporter",
            DataType::Month => "month",
        }
    }

    fn palette(&self) -> &'static [&'static str] {
        match self {
            DataType::Market => MARKET_PALETTE,
            DataType::User => USER_PALETTE,
            DataType::Product => GENERIC_PALETTE,
            DataType::AiModel => AI_MODEL_PALETTE,
            DataType::Reporter => REPORTER_PALETTE,
            DataType::Month => MONTH_PALETTE,
        }
    }

    /// Canonical form of a value before color lookup.
    fn canonical(&self, name: &str) -> String {
        match self {
            DataType::Market => normalize_market(name),
            DataType::Product => name.trim().to_lowercase(),
            _ => name.trim().to_string(),
        }
    }
}

impl From<Dimension> for DataType {
    fn from(dimension: Dimension) -> Self {
        match dimension {
            Dimension::Market => DataType::Market,
            Dimension::User => DataType::User,
            Dimension::Category
            | Dimension::Subcategory
            | Dimension::Product
            | Dimension::ExternalAsset => DataType::Product,
            Dimension::AiModel => DataType::AiModel,
            Dimension::Reporter => DataType::Reporter,
            Dimension::Month => DataType::Month,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const GRAY: &str = "#9ca3af";

static MARKET_PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896", "#c5b0d5", "#c49c94",
    "#f7b6d2", "#c7c7c7", "#dbdb8d", "#9edae5", "#393b79", "#637939", "#8c6d31", "#843c39",
    "#7b4173", "#5254a3", "#8ca252", "#bd9e39", "#ad494a", "#a55194",
];

/// Known market codes. A code's position is its slot in [`MARKET_PALETTE`].
static MARKET_CATALOG: &[&str] = &[
    "RO", "BG", "UK", "IE", "FI", "DE", "ES", "GR", "IT", "PL", "PT", "SE", "NO", "DK", "NL",
    "AT", "CA", "MX", "BR", "HU", "FR", "CZ", "SK", "SI", "LT", "LV", "EE", "HR", "CY", "BE",
];

/// Codes outside the catalog hash into these, so they never take a catalog
/// market's color.
static UNLISTED_MARKET_PALETTE: &[&str] = &[
    "#6b6ecf", "#9c9ede", "#b5cf6b", "#cedb9c", "#e7ba52", "#e7cb94", "#d6616b", "#e7969c",
    "#ce6dbd", "#de9ed6",
];

static USER_PALETTE: &[&str] = &[
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
    "#6366f1", "#84cc16", "#06b6d4", "#e11d48", "#a855f7", "#22c55e", "#eab308", "#0ea5e9",
];

static AI_MODEL_PALETTE: &[&str] = &[
    "#10a37f", "#d97757", "#4285f4", "#ff6b35", "#7c3aed", "#0891b2", "#be123c", "#65a30d",
    "#c026d3", "#0d9488",
];

/// Known model families, in [`AI_MODEL_PALETTE`] slot order.
static AI_MODEL_CATALOG: &[&str] = &[
    "gpt-4o", "claude", "gemini", "gpt-4", "copilot", "o1", "o3", "midjourney", "dall-e",
    "gpt-4.1",
];

static REPORTER_PALETTE: &[&str] = &[
    "#0f766e", "#b45309", "#4338ca", "#be185d", "#15803d", "#7e22ce", "#b91c1c", "#0369a1",
    "#a16207", "#4d7c0f",
];

static GENERIC_PALETTE: &[&str] = &[
    "#64748b", "#0ea5e9", "#f43f5e", "#22c55e", "#f59e0b", "#8b5cf6", "#14b8a6", "#ec4899",
];

/// January through December.
static MONTH_PALETTE: &[&str] = &[
    "#60a5fa", "#818cf8", "#34d399", "#4ade80", "#a3e635", "#facc15", "#fbbf24", "#fb923c",
    "#f87171", "#f472b6", "#c084fc", "#38bdf8",
];

/// Shades per category, indexed by subcategory (casino, sport, poker, lotto, other).
fn category_shades(category: Category) -> &'static [&'static str; 5] {
    match category {
        Category::Marketing => &["#1d4ed8", "#2563eb", "#3b82f6", "#60a5fa", "#93c5fd"],
        Category::Product => &["#047857", "#059669", "#10b981", "#34d399", "#6ee7b7"],
        Category::Acquisition => &["#c2410c", "#ea580c", "#f97316", "#fb923c", "#fdba74"],
        Category::Misc => &["#6d28d9", "#7c3aed", "#8b5cf6", "#a78bfa", "#c4b5fd"],
    }
}

fn subcategory_index(subcategory: Subcategory) -> usize {
    match subcategory {
        Subcategory::Casino => 0,
        Subcategory::Sport => 1,
        Subcategory::Poker => 2,
        Subcategory::Lotto => 3,
        Subcategory::Other => 4,
    }
}

/// 32-bit FNV-1a. Stable across runs and platforms, unlike `DefaultHasher`.
pub fn fnv1a(input: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

fn hashed(name: &str, palette: &'static [&'static str]) -> &'static str {
    palette[fnv1a(name) as usize % palette.len()]
}

/// Slot `index` of `palette`, cycling once the palette runs out.
fn indexed(index: usize, palette: &'static [&'static str]) -> &'static str {
    palette[index % palette.len()]
}

fn catalog_index(catalog: &[&str], name: &str) -> Option<usize> {
    catalog.iter().position(|entry| entry.eq_ignore_ascii_case(name))
}

/// Color for `name` under `data_type`. A pure function of its arguments.
pub fn color_for(name: &str, data_type: DataType) -> &'static str {
    let name = data_type.canonical(name);
    match data_type {
        DataType::Market => match catalog_index(MARKET_CATALOG, &name) {
            Some(index) => indexed(index, MARKET_PALETTE),
            None => hashed(&name, UNLISTED_MARKET_PALETTE),
        },
        DataType::AiModel => match catalog_index(AI_MODEL_CATALOG, &name) {
            Some(index) => indexed(index, AI_MODEL_PALETTE),
            None => hashed(&name.to_lowercase(), GENERIC_PALETTE),
        },
        DataType::Product => product_color(&name),
        DataType::Month => month_color(&name),
        DataType::User | DataType::Reporter => hashed(&name, data_type.palette()),
    }
}

fn product_color(name: &str) -> &'static str {
    if name.is_empty() || name == UNCATEGORIZED {
        return GRAY;
    }
    let classification = classify(name);
    match classification.category {
        Some(category) => {
            category_shades(category)[subcategory_index(classification.subcategory)]
        }
        // Bare subcategory keys ("casino") take the marketing shade
        None if classification.subcategory != Subcategory::Other => {
            category_shades(Category::Marketing)[subcategory_index(classification.subcategory)]
        }
        None => hashed(name, GENERIC_PALETTE),
    }
}

fn month_color(key: &str) -> &'static str {
    if key == UNKNOWN_MONTH {
        return GRAY;
    }
    key.get(5..7)
        .and_then(|m| m.parse::<usize>().ok())
        .filter(|m| (1..=12).contains(m))
        .map(|m| MONTH_PALETTE[m - 1])
        .unwrap_or(GRAY)
}

/// Default colors plus caller-supplied overrides and orderings.
///
/// Lookup order: override, then the slot from [`Palette::assign_in_order`],
/// then [`color_for`].
#[derive(Debug, Clone, Default)]
pub struct Palette {
    overrides: HashMap<(DataType, String), String>,
    ordered: HashMap<(DataType, String), &'static str>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users and reporters take palette slots in directory order.
    pub fn for_directory(directory: &Directory) -> Self {
        let mut palette = Self::new();
        palette.assign_in_order(DataType::User, directory.user_ids());
        palette.assign_in_order(DataType::Reporter, directory.reporter_ids());
        palette
    }

    /// Give each name the next slot of the data type's palette, cycling when
    /// there are more names than slots. Repeated names keep their first slot.
    pub fn assign_in_order<I, S>(&mut self, data_type: DataType, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let palette = data_type.palette();
        let mut next = self.ordered.keys().filter(|(t, _)| *t == data_type).count();
        for name in names {
            let key = (data_type, data_type.canonical(name.as_ref()));
            if key.1.is_empty() || self.ordered.contains_key(&key) {
                continue;
            }
            self.ordered.insert(key, indexed(next, palette));
            next += 1;
        }
    }

    pub fn with_override(mut self, data_type: DataType, name: &str, color: &str) -> Self {
        self.set(data_type, name, color);
        self
    }

    pub fn set(&mut self, data_type: DataType, name: &str, color: &str) {
        self.overrides
            .insert((data_type, data_type.canonical(name)), color.to_string());
    }

    pub fn color(&self, name: &str, data_type: DataType) -> String {
        let key = (data_type, data_type.canonical(name));
        if let Some(color) = self.overrides.get(&key) {
            return color.clone();
        }
        self.ordered
            .get(&key)
            .copied()
            .unwrap_or_else(|| color_for(name, data_type))
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMetric {
    #[default]
    Tasks,
    Hours,
    Both,
}

impl FromStr for ChartMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tasks" | "count" => Ok(ChartMetric::Tasks),
            "hours" => Ok(ChartMetric::Hours),
            "both" => Ok(ChartMetric::Both),
            other => Err(format!("unknown chart metric '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartValue {
    Single(f64),
    Split { tasks: u64, hours: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub key: String,
    pub name: String,
    pub value: ChartValue,
    pub color: String,
}

/// One point per primary value, in ranking order. `top_n` keeps only the
/// leading points. Rows exist only for values some task reached, so no point
/// has zero tasks.
pub fn build_chart_series(
    aggregation: &Aggregation,
    data_type: DataType,
    metric: ChartMetric,
    directory: &Directory,
    palette: &Palette,
    top_n: Option<usize>,
) -> Vec<ChartPoint> {
    let primary = aggregation.primary();
    let mut entries: Vec<(String, String, _)> = aggregation
        .rows
        .iter()
        .map(|(key, totals)| (key.clone(), directory.label(primary, key), *totals))
        .collect();
    entries.sort_by(|a, b| {
        policy_cmp(&a.2, &b.2)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.0.cmp(&b.0))
    });
    if let Some(limit) = top_n {
        entries.truncate(limit);
    }

    entries
        .into_iter()
        .map(|(key, name, totals)| {
            let value = match metric {
                ChartMetric::Tasks => ChartValue::Single(totals.task_count as f64),
                ChartMetric::Hours => ChartValue::Single(totals.hours),
                ChartMetric::Both => ChartValue::Split {
                    tasks: totals.task_count,
                    hours: totals.hours,
                },
            };
            let color = palette.color(&key, data_type);
            ChartPoint {
                key,
                name,
                value,
                color,
            }
        })
        .collect()
}
