//! Service layer for the ingestion pipeline.
//!
//! This module contains the business logic for:
//! - Registry listing (`RegistryClient`)
//! - Per-entity bilingual fetching (`EntityFetcher`)
//! - Cross-language reconciliation (`reconcile`)
//! - The USDA reference index (`ReferenceIndex`)
//! - Fuzzy name matching (`FuzzyMatcher`)

pub mod details;
pub mod matcher;
pub mod reconcile;
pub mod reference;
pub mod registry;

pub use details::{EntityFetcher, FetchOutcome, SUB_REQUESTS_PER_ENTITY};
pub use matcher::{FuzzyMatcher, Scorer, WeightedRatio};
pub use reconcile::{Reconcilable, reconcile};
pub use reference::{IngestReport, ReferenceIndex, extract_foods};
pub use registry::{Listing, RegistryClient, RegistryEndpoints, SubResource};
