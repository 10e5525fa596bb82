//! Display labels for dimension keys
//!
//! Buckets are keyed by raw values (user ids, market codes, `YYYY-MM`). The
//! directory turns those keys into the labels shown in tables and charts.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregator::{Dimension, UNKNOWN_MONTH};
use crate::classify::{classify, Category, UNCATEGORIZED};
use crate::record::NormalizedTask;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Person {
    /// Name, else email, else id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.email.as_deref().filter(|e| !e.trim().is_empty()))
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: HashMap<String, Person>,
    reporters: HashMap<String, Person>,
    /// Ids in the order they were listed.
    user_order: Vec<String>,
    reporter_order: Vec<String>,
}

fn index(people: Vec<Person>) -> (HashMap<String, Person>, Vec<String>) {
    let mut order = Vec::with_capacity(people.len());
    let mut by_id = HashMap::with_capacity(people.len());
    for person in people {
        if !by_id.contains_key(&person.id) {
            order.push(person.id.clone());
        }
        by_id.insert(person.id.clone(), person);
    }
    (by_id, order)
}

impl Directory {
    pub fn new(users: Vec<Person>, reporters: Vec<Person>) -> Self {
        let (users, user_order) = index(users);
        let (reporters, reporter_order) = index(reporters);
        Self {
            users,
            reporters,
            user_order,
            reporter_order,
        }
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_order
    }

    pub fn reporter_ids(&self) -> &[String] {
        &self.reporter_order
    }

    pub fn user(&self, id: &str) -> Option<&Person> {
        self.users.get(id)
    }

    pub fn reporter(&self, id: &str) -> Option<&Person> {
        self.reporters.get(id)
    }

    /// Register reporter names carried on the tasks themselves. Entries
    /// already in the directory are kept.
    pub fn learn_reporters(&mut self, tasks: &[NormalizedTask]) {
        for task in tasks {
            let (Some(id), Some(name)) = (&task.reporter_id, &task.reporter_name) else {
                continue;
            };
            if self.reporters.contains_key(id) {
                continue;
            }
            self.reporters.insert(
                id.clone(),
                Person {
                    id: id.clone(),
                    name: Some(name.clone()),
                    email: None,
                },
            );
            self.reporter_order.push(id.clone());
        }
    }

    /// Display label for a bucket key of `dimension`.
    pub fn label(&self, dimension: Dimension, key: &str) -> String {
        match dimension {
            Dimension::Market | Dimension::AiModel => key.to_string(),
            Dimension::User => self
                .user(key)
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| key.to_string()),
            Dimension::Reporter => self
                .reporter(key)
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| key.to_string()),
            Dimension::Category => match key.parse::<Category>() {
                Ok(category) => category.label().to_string(),
                Err(_) if key == UNCATEGORIZED => "Uncategorized".to_string(),
                Err(_) => key.to_string(),
            },
            Dimension::Subcategory => classify(key).subcategory.label().to_string(),
            Dimension::Product => classify(key).label(),
            Dimension::Month => month_label(key),
            Dimension::ExternalAsset => match key {
                "external" => "External".to_string(),
                "internal" => "Internal".to_string(),
                other => other.to_string(),
            },
        }
    }
}

/// `"2024-05"` → `"May 2024"`. Anything unparseable is returned as-is.
pub fn month_label(key: &str) -> String {
    if key == UNKNOWN_MONTH {
        return "Unknown".to_string();
    }
    NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
        .map(|date| date.format("%B %Y").to_string())
        .unwrap_or_else(|_| key.to_string())
}

/// Row label used for tasks that reached no bucket of `dimension`.
pub fn unassigned_label(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Market => "No markets",
        Dimension::User => "No user",
        Dimension::AiModel => "No AI usage",
        Dimension::Reporter => "No reporter",
        _ => "Unassigned",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize;
    use serde_json::json;

    fn person(id: &str, name: Option<&str>, email: Option<&str>) -> Person {
        Person {
            id: id.to_string(),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn test_user_labels() {
        let directory = Directory::new(
            vec![
                person("u1", Some("Ana Pop"), None),
                person("u2", None, Some("dan@example.com")),
                person("u3", Some(" "), None),
            ],
            Vec::new(),
        );

        assert_eq!(directory.label(Dimension::User, "u1"), "Ana Pop");
        assert_eq!(directory.label(Dimension::User, "u2"), "dan@example.com");
        assert_eq!(directory.label(Dimension::User, "u3"), "u3");
        assert_eq!(directory.label(Dimension::User, "missing"), "missing");
    }

    #[test]
    fn test_learn_reporters_keeps_existing() {
        let mut directory = Directory::new(Vec::new(), vec![person("r1", Some("Known"), None)]);
        let tasks: Vec<NormalizedTask> = [
            json!({ "reporters": "r1", "reporterName": "Other" }),
            json!({ "reporters": "r2", "reporterName": "Mara" }),
        ]
        .iter()
        .map(normalize)
        .collect();

        directory.learn_reporters(&tasks);
        assert_eq!(directory.label(Dimension::Reporter, "r1"), "Known");
        assert_eq!(directory.label(Dimension::Reporter, "r2"), "Mara");
        assert_eq!(directory.reporter_ids().to_vec(), vec!["r1", "r2"]);
    }

    #[test]
    fn test_ids_keep_listing_order() {
        let directory = Directory::new(
            vec![
                person("u9", None, None),
                person("u1", None, None),
                person("u9", Some("Again"), None),
            ],
            Vec::new(),
        );
        assert_eq!(directory.user_ids().to_vec(), vec!["u9", "u1"]);
        assert_eq!(directory.label(Dimension::User, "u9"), "Again");
    }

    #[test]
    fn test_descriptive_labels() {
        let directory = Directory::default();
        assert_eq!(directory.label(Dimension::Category, "marketing"), "Marketing");
        assert_eq!(directory.label(Dimension::Category, UNCATEGORIZED), "Uncategorized");
        assert_eq!(directory.label(Dimension::Subcategory, "lotto"), "Lotto");
        assert_eq!(
            directory.label(Dimension::Product, "acquisition poker"),
            "Acquisition Poker"
        );
        assert_eq!(directory.label(Dimension::ExternalAsset, "external"), "External");
        assert_eq!(directory.label(Dimension::Market, "RO"), "RO");
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label("2024-05"), "May 2024");
        assert_eq!(month_label(UNKNOWN_MONTH), "Unknown");
        assert_eq!(month_label("garbage"), "garbage");
    }
}
