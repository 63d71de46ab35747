// src/services/reference.rs

//! Reference index over bulk USDA FoodData Central datasets.
//!
//! Records are keyed by `description`. When two records share a description
//! the later one replaces the earlier, across datasets too; datasets are
//! merged in configured order.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::ReferenceRecord;
use crate::utils::log;

/// Top-level keys under which the known dataset exports keep their foods.
pub const CONTAINER_KEYS: [&str; 4] = ["FoundationFoods", "SRLegacyFoods", "BrandedFoods", "foods"];

/// Outcome of merging one dataset into the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub valid: usize,
    pub invalid: usize,
}

/// Lookup from food description to the last record seen with it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    records: BTreeMap<String, ReferenceRecord>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a list of dataset items into the index.
    ///
    /// Never fails: a payload that is not a list adds nothing, and items
    /// without a usable description are counted as invalid.
    pub fn ingest(&mut self, payload: &Value) -> IngestReport {
        let mut report = IngestReport::default();

        let Some(items) = payload.as_array() else {
            log::warn(&format!(
                "Reference payload is not a list ({}), skipping",
                json_kind(payload)
            ));
            return report;
        };

        for item in items {
            match ReferenceRecord::from_value(item) {
                Some(record) => {
                    self.records.insert(record.description.clone(), record);
                    report.valid += 1;
                }
                None => report.invalid += 1,
            }
        }

        report
    }

    pub fn get(&self, description: &str) -> Option<&ReferenceRecord> {
        self.records.get(description)
    }

    /// Descriptions in index order.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pull the food list out of a dataset document.
///
/// Concatenates every list found under [`CONTAINER_KEYS`]; falls back to the
/// document itself when it is a list. Unknown shapes yield an empty list.
pub fn extract_foods(document: Value) -> Value {
    match document {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut object) => {
            let mut foods = Vec::new();
            for key in CONTAINER_KEYS {
                match object.remove(key) {
                    Some(Value::Array(items)) => {
                        log::info(&format!("Found {} foods under '{}'", items.len(), key));
                        foods.extend(items);
                    }
                    Some(other) => log::warn(&format!(
                        "'{}' holds {} instead of a list",
                        key,
                        json_kind(&other)
                    )),
                    None => {}
                }
            }
            if foods.is_empty() {
                let keys: Vec<&str> = object.keys().map(String::as_str).collect();
                log::warn(&format!("No foods found, top-level keys: {keys:?}"));
            }
            Value::Array(foods)
        }
        other => {
            log::warn(&format!("No foods found in {} document", json_kind(&other)));
            Value::Array(Vec::new())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
