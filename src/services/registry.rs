// src/services/registry.rs

//! Registry listing and endpoint layout.
//!
//! The listing is walked page by page through `nextPageUrl`. Any failed page
//! aborts the walk: a partial listing would silently under-cover the corpus.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Language, RegistryConfig, RegistryEntity};
use crate::utils::http::Transport;
use crate::utils::{api_root, log, resolve_url};

/// Per-entity sub-resources of the registry API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubResource {
    Detail,
    Nutrients,
    Classifications,
    RawMaterials,
}

impl SubResource {
    pub const ALL: [SubResource; 4] = [
        SubResource::Detail,
        SubResource::Nutrients,
        SubResource::Classifications,
        SubResource::RawMaterials,
    ];

    fn path_suffix(self) -> &'static str {
        match self {
            SubResource::Detail => "",
            SubResource::Nutrients => "/naringsvarden",
            SubResource::Classifications => "/klassificeringar",
            SubResource::RawMaterials => "/ravaror",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubResource::Detail => "detail",
            SubResource::Nutrients => "nutrients",
            SubResource::Classifications => "classifications",
            SubResource::RawMaterials => "raw materials",
        }
    }
}

/// URL layout of the registry API.
#[derive(Debug, Clone)]
pub struct RegistryEndpoints {
    root: Url,
    page_limit: usize,
}

impl RegistryEndpoints {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Ok(Self {
            root: api_root(&config.base_url)?,
            page_limit: config.page_limit,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// First listing page.
    pub fn listing(&self) -> Result<Url> {
        let mut url = self.root.join("livsmedel")?;
        url.query_pairs_mut()
            .append_pair("limit", &self.page_limit.to_string());
        Ok(url)
    }

    /// A sub-resource of one entity in one language.
    pub fn resource(&self, id: u64, resource: SubResource, language: Language) -> Result<Url> {
        let mut url = self
            .root
            .join(&format!("livsmedel/{}{}", id, resource.path_suffix()))?;
        url.query_pairs_mut()
            .append_pair("sprak", &language.selector().to_string());
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default, rename = "livsmedel", alias = "items")]
    items: Vec<Value>,
    #[serde(default, rename = "nextPageUrl")]
    next_page_url: Option<String>,
}

/// The complete registry listing.
#[derive(Debug, Default)]
pub struct Listing {
    pub entities: Vec<RegistryEntity>,
    /// Items without an integer `nummer`
    pub skipped: usize,
    pub pages: usize,
}

/// Walks the registry listing.
pub struct RegistryClient {
    transport: Arc<dyn Transport>,
    endpoints: RegistryEndpoints,
}

impl RegistryClient {
    pub fn new(transport: Arc<dyn Transport>, endpoints: RegistryEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Fetch every listing page, in order, until no next page is given.
    pub async fn fetch_all(&self) -> Result<Listing> {
        let mut listing = Listing::default();
        let mut visited = HashSet::new();
        let mut next = Some(self.endpoints.listing()?);

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(AppError::pagination(
                    url.as_str(),
                    "next page points to an already visited page",
                ));
            }

            let page = self.fetch_page(&url).await?;
            listing.pages += 1;

            for item in page.items {
                match RegistryEntity::from_listing(item) {
                    Some(entity) => listing.entities.push(entity),
                    None => listing.skipped += 1,
                }
            }

            log::debug(&format!(
                "Listing page {}: {} entities so far",
                listing.pages,
                listing.entities.len()
            ));

            next = match page.next_page_url.as_deref().map(str::trim) {
                Some(href) if !href.is_empty() => Some(
                    resolve_url(self.endpoints.root(), href)
                        .map_err(|e| AppError::pagination(url.as_str(), e))?,
                ),
                _ => None,
            };
        }

        if listing.skipped > 0 {
            log::warn(&format!(
                "Skipped {} listing items without a numeric id",
                listing.skipped
            ));
        }

        Ok(listing)
    }

    async fn fetch_page(&self, url: &Url) -> Result<ListingPage> {
        let value = self
            .transport
            .get_json(url)
            .await
            .map_err(|e| AppError::pagination(url.as_str(), e))?;
        serde_json::from_value(value).map_err(|e| AppError::pagination(url.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use serde_json::json;

    struct PagedTransport {
        pages: HashMap<String, Result<Value>>,
    }

    impl PagedTransport {
        fn new(pages: Vec<(&str, Result<Value>)>) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .into_iter()
                    .map(|(url, page)| (url.to_string(), page))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl Transport for PagedTransport {
        async fn get_json(&self, url: &Url) -> Result<Value> {
            match self.pages.get(url.as_str()) {
                Some(Ok(value)) => Ok(value.clone()),
                Some(Err(_)) => Err(AppError::status(url.as_str(), 500)),
                None => Err(AppError::status(url.as_str(), 404)),
            }
        }
    }

    fn endpoints() -> RegistryEndpoints {
        RegistryEndpoints::new(&RegistryConfig {
            base_url: "https://api.test/v1".to_string(),
            page_limit: 2,
        })
        .unwrap()
    }

    #[test]
    fn builds_resource_urls() {
        let endpoints = endpoints();
        assert_eq!(
            endpoints.listing().unwrap().as_str(),
            "https://api.test/v1/livsmedel?limit=2"
        );
        assert_eq!(
            endpoints
                .resource(5, SubResource::Detail, Language::Swedish)
                .unwrap()
                .as_str(),
            "https://api.test/v1/livsmedel/5?sprak=1"
        );
        assert_eq!(
            endpoints
                .resource(5, SubResource::Classifications, Language::English)
                .unwrap()
                .as_str(),
            "https://api.test/v1/livsmedel/5/klassificeringar?sprak=2"
        );
    }

    #[tokio::test]
    async fn follows_next_page_until_absent() {
        let transport = PagedTransport::new(vec![
            (
                "https://api.test/v1/livsmedel?limit=2",
                Ok(json!({
                    "livsmedel": [{ "nummer": 1 }, { "nummer": 2 }],
                    "nextPageUrl": "https://api.test/v1/livsmedel?limit=2&offset=2"
                })),
            ),
            (
                "https://api.test/v1/livsmedel?limit=2&offset=2",
                Ok(json!({
                    "livsmedel": [{ "nummer": 3 }, { "namn": "no id" }],
                    "nextPageUrl": null
                })),
            ),
        ]);
        let client = RegistryClient::new(transport, endpoints());

        let listing = client.fetch_all().await.unwrap();
        let ids: Vec<u64> = listing.entities.iter().map(|e| e.id).collect();

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(listing.pages, 2);
        assert_eq!(listing.skipped, 1);
    }

    #[tokio::test]
    async fn resolves_relative_next_page() {
        let transport = PagedTransport::new(vec![
            (
                "https://api.test/v1/livsmedel?limit=2",
                Ok(json!({ "livsmedel": [{ "nummer": 1 }], "nextPageUrl": "livsmedel?offset=1" })),
            ),
            (
                "https://api.test/v1/livsmedel?offset=1",
                Ok(json!({ "livsmedel": [{ "nummer": 2 }] })),
            ),
        ]);
        let client = RegistryClient::new(transport, endpoints());

        assert_eq!(client.fetch_all().await.unwrap().entities.len(), 2);
    }

    #[tokio::test]
    async fn failed_page_aborts_the_walk() {
        let transport = PagedTransport::new(vec![
            (
                "https://api.test/v1/livsmedel?limit=2",
                Ok(json!({
                    "livsmedel": [{ "nummer": 1 }],
                    "nextPageUrl": "https://api.test/v1/livsmedel?page=2"
                })),
            ),
            (
                "https://api.test/v1/livsmedel?page=2",
                Err(AppError::status("", 500)),
            ),
        ]);
        let client = RegistryClient::new(transport, endpoints());

        assert!(matches!(
            client.fetch_all().await,
            Err(AppError::Pagination { .. })
        ));
    }

    #[tokio::test]
    async fn repeated_page_is_an_error() {
        let transport = PagedTransport::new(vec![(
            "https://api.test/v1/livsmedel?limit=2",
            Ok(json!({
                "livsmedel": [{ "nummer": 1 }],
                "nextPageUrl": "https://api.test/v1/livsmedel?limit=2"
            })),
        )]);
        let client = RegistryClient::new(transport, endpoints());

        assert!(client.fetch_all().await.is_err());
    }
}
