// src/lib.rs

//! food-ingest library
//!
//! Merges the bilingual Livsmedelsverket food registry with USDA FoodData
//! Central into one streamed JSON corpus.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
