//! Cross-language reconciliation of sub-records.
//!
//! Pairs are driven by the shared key alone, never by position or name.

use std::collections::HashMap;

use crate::models::{ClassificationRecord, MatchedPair, NutrientRecord};

/// A record that can be paired with its counterpart in the other language.
pub trait Reconcilable: Clone {
    fn reconcile_key(&self) -> String;
}

impl Reconcilable for NutrientRecord {
    fn reconcile_key(&self) -> String {
        self.code.clone()
    }
}

impl Reconcilable for ClassificationRecord {
    fn reconcile_key(&self) -> String {
        format!("{}|{}", self.type_tag, self.facet_code)
    }
}

/// Pair every Swedish record with the English record of the same key.
///
/// One pair per Swedish record; English-only records are left out of the
/// matched view. Duplicate English keys resolve to the last occurrence and
/// empty keys never match.
pub fn reconcile<T: Reconcilable>(swedish: &[T], english: &[T]) -> Vec<MatchedPair<T>> {
    let lookup: HashMap<String, &T> = english
        .iter()
        .map(|record| (record.reconcile_key(), record))
        .filter(|(key, _)| !key.is_empty())
        .collect();

    swedish
        .iter()
        .map(|record| {
            let key = record.reconcile_key();
            let counterpart = lookup.get(&key).map(|&r| r.clone());
            MatchedPair::new(key, Some(record.clone()), counterpart)
        })
        .collect()
}
