//! Reference index construction from the configured datasets.

use crate::error::{AppError, Result};
use crate::models::ReferenceConfig;
use crate::services::{ReferenceIndex, extract_foods};
use crate::storage::DatasetStore;
use crate::utils::log;

/// Download (if needed), open and merge every enabled dataset, in order.
///
/// A dataset that cannot be acquired is fatal; one whose contents are not
/// in a recognized shape contributes nothing.
pub async fn load_reference_index(
    config: &ReferenceConfig,
    store: &DatasetStore,
) -> Result<ReferenceIndex> {
    let datasets: Vec<_> = config.enabled_datasets().collect();
    if datasets.is_empty() {
        return Err(AppError::config("no reference dataset is enabled"));
    }

    let mut index = ReferenceIndex::new();
    for (i, dataset) in datasets.iter().enumerate() {
        log::step(i + 1, datasets.len(), &format!("Loading {} dataset", dataset.name));
        if let Some(size) = &dataset.expected_size {
            log::sub_item(&format!("Expected download size: {size}"));
        }

        let path = store.ensure_archive(dataset).await?;
        let document = store.open_document(dataset, &path).await?;
        let report = index.ingest(&extract_foods(document));

        log::sub_item(&format!(
            "{}: {} valid, {} invalid records",
            dataset.name, report.valid, report.invalid
        ));
    }

    log::success(&format!("Reference index holds {} foods", index.len()));
    Ok(index)
}
