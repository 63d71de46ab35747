// src/models/mod.rs

//! Domain models for the ingestion pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod food;
mod merged;
mod reference;
mod stats;

// Re-export all public types
pub use config::{
    BatchConfig, Config, DatasetSource, FetchConfig, MatchingConfig, OutputConfig,
    ReferenceConfig, RegistryConfig,
};
pub use food::{
    ClassificationRecord, DetailRecord, Language, NutrientRecord, RawMaterialRecord,
    RegistryEntity,
};
pub use merged::{EntityBundle, LanguageBundle, MatchedPair, MergedFoodRecord};
pub use reference::ReferenceRecord;
pub use stats::{BatchReport, RunStats};
