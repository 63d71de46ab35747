// src/services/details.rs

//! Entity detail fetcher.
//!
//! For one entity id, fetches detail, nutrients, classifications and raw
//! materials in both languages. Each of the eight sub-requests degrades to
//! its default on its own; an entity never fails because one endpoint did.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::models::{
    ClassificationRecord, DetailRecord, EntityBundle, FetchConfig, Language, LanguageBundle,
    NutrientRecord, RawMaterialRecord,
};
use crate::services::registry::{RegistryEndpoints, SubResource};
use crate::utils::http::Transport;
use crate::utils::log;

const TOO_MANY_REQUESTS: u16 = 429;

/// Sub-requests issued per entity.
pub const SUB_REQUESTS_PER_ENTITY: usize = SubResource::ALL.len() * Language::ALL.len();

/// A fetched entity and how many of its sub-requests fell back to defaults.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub bundle: EntityBundle,
    pub degraded: usize,
}

/// Fetches all sub-resources of registry entities.
pub struct EntityFetcher {
    transport: Arc<dyn Transport>,
    endpoints: RegistryEndpoints,
    gate: Arc<Semaphore>,
    request_delay: Duration,
    rate_limit_backoff: Duration,
}

impl EntityFetcher {
    /// Create a fetcher whose in-flight entities are bounded by `gate`.
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: RegistryEndpoints,
        gate: Arc<Semaphore>,
        config: &FetchConfig,
    ) -> Self {
        Self {
            transport,
            endpoints,
            gate,
            request_delay: Duration::from_millis(config.request_delay_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
        }
    }

    /// Fetch one entity. Holds a gate permit until all sub-requests resolve.
    pub async fn fetch(&self, id: u64) -> FetchOutcome {
        let Ok(_permit) = self.gate.acquire().await else {
            log::error(&format!("Concurrency gate closed before food #{id}"));
            return FetchOutcome {
                bundle: EntityBundle::empty(id),
                degraded: SUB_REQUESTS_PER_ENTITY,
            };
        };

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let (
            detail_sv,
            detail_en,
            nutrients_sv,
            nutrients_en,
            classes_sv,
            classes_en,
            raw_sv,
            raw_en,
        ) = futures::join!(
            self.request(id, SubResource::Detail, Language::Swedish),
            self.request(id, SubResource::Detail, Language::English),
            self.request(id, SubResource::Nutrients, Language::Swedish),
            self.request(id, SubResource::Nutrients, Language::English),
            self.request(id, SubResource::Classifications, Language::Swedish),
            self.request(id, SubResource::Classifications, Language::English),
            self.request(id, SubResource::RawMaterials, Language::Swedish),
            self.request(id, SubResource::RawMaterials, Language::English),
        );

        let mut decoder = Decoder { id, degraded: 0 };
        let swedish = LanguageBundle {
            detail: decoder.detail(detail_sv),
            nutrients: decoder.list(nutrients_sv, NutrientRecord::from_raw),
            classifications: decoder.list(classes_sv, ClassificationRecord::from_raw),
            raw_materials: decoder.list(raw_sv, RawMaterialRecord::from_raw),
        };
        let english = LanguageBundle {
            detail: decoder.detail(detail_en),
            nutrients: decoder.list(nutrients_en, NutrientRecord::from_raw),
            classifications: decoder.list(classes_en, ClassificationRecord::from_raw),
            raw_materials: decoder.list(raw_en, RawMaterialRecord::from_raw),
        };

        FetchOutcome {
            bundle: EntityBundle {
                id,
                swedish,
                english,
            },
            degraded: decoder.degraded,
        }
    }

    /// Issue one sub-request. `None` means the caller should use the default.
    async fn request(&self, id: u64, resource: SubResource, language: Language) -> Option<Value> {
        match self.try_request(id, resource, language).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn(&format!(
                    "Food #{id}: {} ({}) unavailable: {e}",
                    resource.label(),
                    language.code()
                ));
                None
            }
        }
    }

    async fn try_request(
        &self,
        id: u64,
        resource: SubResource,
        language: Language,
    ) -> Result<Value> {
        let url = self.endpoints.resource(id, resource, language)?;
        match self.transport.get_json(&url).await {
            Err(e) if e.status_code() == Some(TOO_MANY_REQUESTS) => {
                log::debug(&format!("Rate limited on {url}, retrying once"));
                tokio::time::sleep(self.rate_limit_backoff).await;
                self.transport.get_json(&url).await
            }
            result => result,
        }
    }
}

/// Turns sub-responses into typed records, counting every fallback.
struct Decoder {
    id: u64,
    degraded: usize,
}

impl Decoder {
    fn detail(&mut self, response: Option<Value>) -> DetailRecord {
        let Some(value) = response else {
            self.degraded += 1;
            return DetailRecord::default();
        };
        DetailRecord::from_raw(value).unwrap_or_else(|| {
            log::warn(&format!("Food #{}: detail is not an object", self.id));
            self.degraded += 1;
            DetailRecord::default()
        })
    }

    fn list<T>(&mut self, response: Option<Value>, decode: fn(Value) -> T) -> Vec<T> {
        match response {
            Some(Value::Array(items)) => items.into_iter().map(decode).collect(),
            Some(_) => {
                log::warn(&format!("Food #{}: expected a list response", self.id));
                self.degraded += 1;
                Vec::new()
            }
            None => {
                self.degraded += 1;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use url::Url;

    use crate::error::AppError;
    use crate::models::RegistryConfig;

    /// Serves canned bodies by URL; unknown URLs answer 404.
    #[derive(Default)]
    struct StubTransport {
        bodies: HashMap<String, Value>,
        statuses: Mutex<HashMap<String, Vec<u16>>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn get_json(&self, url: &Url) -> Result<Value> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let scripted = self
                .statuses
                .lock()
                .unwrap()
                .get_mut(url.as_str())
                .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)));
            if let Some(status) = scripted {
                return Err(AppError::status(url.as_str(), status));
            }
            self.bodies
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| AppError::status(url.as_str(), 404))
        }
    }

    fn endpoints() -> RegistryEndpoints {
        RegistryEndpoints::new(&RegistryConfig {
            base_url: "https://api.test/v1".to_string(),
            page_limit: 10,
        })
        .unwrap()
    }

    fn quick_config() -> FetchConfig {
        FetchConfig {
            request_delay_ms: 0,
            rate_limit_backoff_ms: 1,
            ..FetchConfig::default()
        }
    }

    fn full_entity(transport: &mut StubTransport, id: u64) {
        let base = format!("https://api.test/v1/livsmedel/{id}");
        for (lang, name) in [(1, "Äpple"), (2, "Apple")] {
            transport
                .bodies
                .insert(format!("{base}?sprak={lang}"), json!({ "namn": name }));
            transport.bodies.insert(
                format!("{base}/naringsvarden?sprak={lang}"),
                json!([{ "euroFIRkod": "ENERC" }, { "euroFIRkod": "FAT" }]),
            );
            transport.bodies.insert(
                format!("{base}/klassificeringar?sprak={lang}"),
                json!([{ "typ": "Grupp", "fasettkod": "A1" }]),
            );
            transport
                .bodies
                .insert(format!("{base}/ravaror?sprak={lang}"), json!([{ "namn": "x" }]));
        }
    }

    fn fetcher(transport: StubTransport, permits: usize) -> (EntityFetcher, Arc<StubTransport>) {
        let transport = Arc::new(transport);
        let fetcher = EntityFetcher::new(
            transport.clone(),
            endpoints(),
            Arc::new(Semaphore::new(permits)),
            &quick_config(),
        );
        (fetcher, transport)
    }

    #[tokio::test]
    async fn fetches_all_eight_sub_resources() {
        let mut transport = StubTransport::default();
        full_entity(&mut transport, 1);
        let (fetcher, _) = fetcher(transport, 4);

        let outcome = fetcher.fetch(1).await;

        assert_eq!(outcome.degraded, 0);
        assert_eq!(outcome.bundle.swedish.detail.name, "Äpple");
        assert_eq!(outcome.bundle.english.detail.name, "Apple");
        assert_eq!(outcome.bundle.english.nutrients.len(), 2);
        assert_eq!(outcome.bundle.swedish.classifications[0].facet_code, "A1");
        assert_eq!(outcome.bundle.english.raw_materials.len(), 1);
    }

    #[tokio::test]
    async fn failed_endpoint_degrades_alone() {
        let mut transport = StubTransport::default();
        full_entity(&mut transport, 2);
        transport
            .bodies
            .remove("https://api.test/v1/livsmedel/2/klassificeringar?sprak=2");
        let (fetcher, _) = fetcher(transport, 4);

        let outcome = fetcher.fetch(2).await;

        assert_eq!(outcome.degraded, 1);
        assert!(outcome.bundle.english.classifications.is_empty());
        assert_eq!(outcome.bundle.english.nutrients.len(), 2);
        assert_eq!(outcome.bundle.swedish.classifications.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_entity_yields_defaults() {
        let (fetcher, _) = fetcher(StubTransport::default(), 1);

        let outcome = fetcher.fetch(99).await;

        assert_eq!(outcome.degraded, SUB_REQUESTS_PER_ENTITY);
        assert_eq!(outcome.bundle, EntityBundle::empty(99));
    }

    #[tokio::test]
    async fn wrong_shapes_degrade_to_defaults() {
        let mut transport = StubTransport::default();
        full_entity(&mut transport, 3);
        transport.bodies.insert(
            "https://api.test/v1/livsmedel/3?sprak=1".to_string(),
            json!(["not", "an", "object"]),
        );
        transport.bodies.insert(
            "https://api.test/v1/livsmedel/3/naringsvarden?sprak=2".to_string(),
            json!({ "error": "unexpected" }),
        );
        let (fetcher, _) = fetcher(transport, 1);

        let outcome = fetcher.fetch(3).await;

        assert_eq!(outcome.degraded, 2);
        assert_eq!(outcome.bundle.swedish.detail.name, "");
        assert!(outcome.bundle.english.nutrients.is_empty());
    }

    #[tokio::test]
    async fn rate_limited_request_is_retried_once() {
        let mut transport = StubTransport::default();
        full_entity(&mut transport, 4);
        transport.statuses.lock().unwrap().insert(
            "https://api.test/v1/livsmedel/4?sprak=2".to_string(),
            vec![429],
        );
        transport.statuses.lock().unwrap().insert(
            "https://api.test/v1/livsmedel/4/ravaror?sprak=2".to_string(),
            vec![429, 429],
        );
        let (fetcher, _) = fetcher(transport, 1);

        let outcome = fetcher.fetch(4).await;

        assert_eq!(outcome.bundle.english.detail.name, "Apple");
        assert!(outcome.bundle.english.raw_materials.is_empty());
        assert_eq!(outcome.degraded, 1);
    }

    #[tokio::test]
    async fn gate_bounds_entities_in_flight() {
        let mut transport = StubTransport::default();
        for id in 0..6 {
            full_entity(&mut transport, id);
        }
        let (fetcher, transport) = fetcher(transport, 1);

        let outcomes = futures::future::join_all((0..6).map(|id| fetcher.fetch(id))).await;

        assert!(outcomes.iter().all(|o| o.degraded == 0));
        assert!(transport.peak.load(Ordering::SeqCst) <= SUB_REQUESTS_PER_ENTITY);
    }
}
