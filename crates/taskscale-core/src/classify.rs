//! Product string classification and market code normalization
//!
//! Product strings are free text such as `"marketing casino"` or
//! `"acquisition poker"`. The category comes from a fixed priority list of
//! prefix/substring checks; the subcategory is searched independently.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Marketing,
    Product,
    Acquisition,
    Misc,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Marketing,
            Category::Product,
            Category::Acquisition,
            Category::Misc,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Marketing => "marketing",
            Category::Product => "product",
            Category::Acquisition => "acquisition",
            Category::Misc => "misc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Marketing => "Marketing",
            Category::Product => "Product",
            Category::Acquisition => "Acquisition",
            Category::Misc => "Misc",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subcategory {
    Casino,
    Sport,
    Poker,
    Lotto,
    Other,
}

impl Subcategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subcategory::Casino => "casino",
            Subcategory::Sport => "sport",
            Subcategory::Poker => "poker",
            Subcategory::Lotto => "lotto",
            Subcategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Subcategory::Casino => "Casino",
            Subcategory::Sport => "Sport",
            Subcategory::Poker => "Poker",
            Subcategory::Lotto => "Lotto",
            Subcategory::Other => "Other",
        }
    }
}

/// Bucket key used for tasks whose product string matches no category.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub category: Option<Category>,
    pub subcategory: Subcategory,
}

impl Classification {
    /// Canonical bucket key, e.g. `"marketing casino"` or `"uncategorized"`.
    pub fn product_key(&self) -> String {
        match self.category {
            Some(category) => format!("{} {}", category.as_str(), self.subcategory.as_str()),
            None => UNCATEGORIZED.to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self.category {
            Some(category) => format!("{} {}", category.label(), self.subcategory.label()),
            None => "Uncategorized".to_string(),
        }
    }
}

/// Classify a product string.
///
/// Category checks run in this order and the first match wins:
/// starts with `marketing`, starts with `product`, starts with `misc`,
/// contains `acquisition`. A string such as `"marketing acquisition"` is
/// therefore marketing.
pub fn classify(products: &str) -> Classification {
    let normalized = products.trim().to_lowercase();

    let category = if normalized.starts_with("marketing") {
        Some(Category::Marketing)
    } else if normalized.starts_with("product") {
        Some(Category::Product)
    } else if normalized.starts_with("misc") {
        Some(Category::Misc)
    } else if normalized.contains("acquisition") {
        Some(Category::Acquisition)
    } else {
        None
    };

    let subcategory = if normalized.contains("casino") {
        Subcategory::Casino
    } else if normalized.contains("sport") {
        Subcategory::Sport
    } else if normalized.contains("poker") {
        Subcategory::Poker
    } else if normalized.contains("lotto") {
        Subcategory::Lotto
    } else {
        Subcategory::Other
    };

    Classification {
        category,
        subcategory,
    }
}

/// Canonical market code: trimmed and uppercased.
pub fn normalize_market(code: &str) -> String {
    code.trim().to_uppercase()
}
