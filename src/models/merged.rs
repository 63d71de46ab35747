//! Merged output records and the per-entity fetch bundle.

use serde::Serialize;

use crate::models::{
    ClassificationRecord, DetailRecord, Language, NutrientRecord, RawMaterialRecord,
    ReferenceRecord,
};

/// Same-concept records from both languages, paired by key.
///
/// `is_matched` is true iff both sides are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair<T> {
    pub key: String,
    #[serde(rename = "sv")]
    pub swedish: Option<T>,
    #[serde(rename = "en")]
    pub english: Option<T>,
    #[serde(rename = "matched")]
    pub is_matched: bool,
}

impl<T> MatchedPair<T> {
    pub fn new(key: String, swedish: Option<T>, english: Option<T>) -> Self {
        let is_matched = swedish.is_some() && english.is_some();
        Self {
            key,
            swedish,
            english,
            is_matched,
        }
    }
}

/// Everything fetched for one entity in one language.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageBundle {
    pub detail: DetailRecord,
    pub nutrients: Vec<NutrientRecord>,
    pub classifications: Vec<ClassificationRecord>,
    pub raw_materials: Vec<RawMaterialRecord>,
}

/// Both language bundles of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBundle {
    pub id: u64,
    pub swedish: LanguageBundle,
    pub english: LanguageBundle,
}

impl EntityBundle {
    /// The all-defaults bundle used when an entity fetch fails outright.
    pub fn empty(id: u64) -> Self {
        Self {
            id,
            swedish: LanguageBundle::default(),
            english: LanguageBundle::default(),
        }
    }

    pub fn language(&self, language: Language) -> &LanguageBundle {
        match language {
            Language::Swedish => &self.swedish,
            Language::English => &self.english,
        }
    }
}

/// The persisted unit: one per `(entity id, language)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedFoodRecord {
    #[serde(rename = "nummer")]
    pub id: u64,
    pub language: Language,
    pub name: String,
    #[serde(rename = "alt_name")]
    pub alternate_name: String,
    pub food_type: String,
    pub project: String,
    pub scientific_name: String,
    #[serde(rename = "livsmedelsverket_details")]
    pub detail: DetailRecord,
    #[serde(rename = "nutritional_data")]
    pub nutrients: Vec<NutrientRecord>,
    #[serde(rename = "nutritional_data_matched")]
    pub nutrients_matched: Vec<MatchedPair<NutrientRecord>>,
    pub classifications: Vec<ClassificationRecord>,
    pub classifications_matched: Vec<MatchedPair<ClassificationRecord>>,
    pub raw_materials: Vec<RawMaterialRecord>,
    #[serde(rename = "usda_match")]
    pub reference_match: Option<ReferenceRecord>,
    #[serde(rename = "matched")]
    pub is_reference_matched: bool,
}
