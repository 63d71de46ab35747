//! Assembly of the two merged records of an entity.

use crate::models::{EntityBundle, Language, MergedFoodRecord, ReferenceRecord};
use crate::services::reconcile;

/// Build the Swedish and English records of one entity.
///
/// Both records carry the same matched views, driven by the Swedish
/// sub-records, and the same reference match.
pub fn assemble(
    bundle: &EntityBundle,
    reference: Option<&ReferenceRecord>,
) -> [MergedFoodRecord; 2] {
    let nutrients_matched = reconcile(&bundle.swedish.nutrients, &bundle.english.nutrients);
    let classifications_matched = reconcile(
        &bundle.swedish.classifications,
        &bundle.english.classifications,
    );

    Language::ALL.map(|language| {
        let own = bundle.language(language);
        let other = bundle.language(language.other());
        MergedFoodRecord {
            id: bundle.id,
            language,
            name: own.detail.name.clone(),
            alternate_name: other.detail.name.clone(),
            food_type: own.detail.food_type.clone(),
            project: own.detail.project.clone(),
            scientific_name: own.detail.scientific_name.clone(),
            detail: own.detail.clone(),
            nutrients: own.nutrients.clone(),
            nutrients_matched: nutrients_matched.clone(),
            classifications: own.classifications.clone(),
            classifications_matched: classifications_matched.clone(),
            raw_materials: own.raw_materials.clone(),
            reference_match: reference.cloned(),
            is_reference_matched: reference.is_some(),
        }
    })
}

/// The all-default records written for an entity whose task failed.
pub fn fallback_records(id: u64) -> [MergedFoodRecord; 2] {
    assemble(&EntityBundle::empty(id), None)
}
