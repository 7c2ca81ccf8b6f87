//! Kagi Search API provider

use super::traits::*;
use super::clean_text;
use crate::error::ProviderError;
use crate::network::{accept_json, RateLimitedClient};
use crate::results::SearchResult;
use crate::search::SearchQuery;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://kagi.com/api/v0/search";
const SUPPORTED: [SearchType; 1] = [SearchType::Web];

/// Kagi result object type for organic search results; 1 is related searches
const RESULT_TYPE_SEARCH: u8 = 0;

/// Kagi web search
pub struct Kagi {
    base_url: String,
    api_key: Credential,
    client: RateLimitedClient,
}

impl Kagi {
    pub fn new(client: RateLimitedClient) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: Credential::env("KAGI_API_KEY"),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Credential) -> Self {
        self.api_key = api_key;
        self
    }

    fn request(&self, query: &SearchQuery, api_key: &str) -> ProviderRequest {
        ProviderRequest::get(&self.base_url)
            .header("Accept", accept_json())
            .header("Authorization", format!("Bot {}", api_key))
            .param("q", &query.query)
            .param("limit", query.count.max(1))
    }

    fn parse(&self, body: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let response: KagiResponse = serde_json::from_str(body)?;
        let results = response
            .data
            .into_iter()
            .filter(|item| item.t == RESULT_TYPE_SEARCH && !item.url.is_empty())
            .map(|item| {
                SearchResult::new(clean_text(&item.title), item.url)
                    .with_description(clean_text(&item.snippet))
                    .with_optional_metadata("published", item.published)
            })
            .collect();
        Ok(results)
    }
}

#[async_trait]
impl Provider for Kagi {
    fn name(&self) -> &str {
        "kagi"
    }

    fn about(&self) -> ProviderAbout {
        ProviderAbout::new()
            .website("https://kagi.com")
            .official_api(true)
            .requires(self.api_key.describe())
    }

    fn supported_types(&self) -> &[SearchType] {
        &SUPPORTED
    }

    fn is_available(&self) -> bool {
        self.api_key.is_set()
    }

    async fn search(
        &self,
        search_type: SearchType,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        if !self.supports(search_type) {
            return Err(ProviderError::Unsupported(search_type));
        }
        let api_key = self.api_key.resolve().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} is not set", self.api_key.describe()))
        })?;

        let request = self.request(query, &api_key);
        let response = self.client.execute(request, cancel).await?.error_for_status()?;
        self.parse(&response.text)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KagiResponse {
    data: Vec<KagiItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KagiItem {
    t: u8,
    url: String,
    title: String,
    snippet: String,
    published: Option<String>,
}
