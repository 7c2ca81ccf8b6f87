//! Google Custom Search provider

use super::traits::*;
use super::clean_text;
use crate::error::ProviderError;
use crate::network::{accept_json, RateLimitedClient};
use crate::results::SearchResult;
use crate::search::SearchQuery;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
const SUPPORTED: [SearchType; 2] = [SearchType::Web, SearchType::Image];

/// The Custom Search JSON API returns at most 10 items per call
const MAX_COUNT: u32 = 10;

/// Google web and image search through a Programmable Search Engine
pub struct Google {
    base_url: String,
    api_key: Credential,
    engine_id: Credential,
    client: RateLimitedClient,
}

impl Google {
    pub fn new(client: RateLimitedClient) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: Credential::env("GOOGLE_SEARCH_API_KEY"),
            engine_id: Credential::env("GOOGLE_SEARCH_ID"),
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

    pub fn with_engine_id(mut self, engine_id: Credential) -> Self {
        self.engine_id = engine_id;
        self
    }

    fn credentials(&self) -> Result<(String, String), ProviderError> {
        let missing = |c: &Credential| ProviderError::NotConfigured(format!("{} is not set", c.describe()));
        let key = self.api_key.resolve().ok_or_else(|| missing(&self.api_key))?;
        let cx = self.engine_id.resolve().ok_or_else(|| missing(&self.engine_id))?;
        Ok((key, cx))
    }

    fn request(&self, search_type: SearchType, query: &SearchQuery, key: &str, cx: &str) -> ProviderRequest {
        let mut request = ProviderRequest::get(&self.base_url)
            .header("Accept", accept_json())
            .param("key", key)
            .param("cx", cx)
            .param("q", &query.query)
            .param("num", query.count.clamp(1, MAX_COUNT))
            // API is 1-indexed; 91 is the last page it serves
            .optional_param("start", query.params.get_u64("start").map(|s| s.clamp(1, 91)));

        if search_type == SearchType::Image {
            request = request.param("searchType", "image");
        }
        request
    }

    fn parse(&self, search_type: SearchType, body: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let response: GoogleResponse = serde_json::from_str(body)?;

        let results = response
            .items
            .into_iter()
            .map(|item| {
                let result = SearchResult::new(clean_text(&item.title), item.link)
                    .with_description(clean_text(&item.snippet))
                    .with_optional_metadata("display_link", item.display_link);
                match (search_type, item.image) {
                    (SearchType::Image, Some(image)) => result
                        .with_optional_metadata("context_link", image.context_link)
                        .with_optional_metadata("thumbnail", image.thumbnail_link)
                        .with_optional_metadata("width", image.width)
                        .with_optional_metadata("height", image.height),
                    _ => result,
                }
            })
            .collect();
        Ok(results)
    }
}

#[async_trait]
impl Provider for Google {
    fn name(&self) -> &str {
        "google"
    }

    fn about(&self) -> ProviderAbout {
        ProviderAbout::new()
            .website("https://programmablesearchengine.google.com")
            .official_api(true)
            .requires(self.api_key.describe())
            .requires(self.engine_id.describe())
    }

    fn supported_types(&self) -> &[SearchType] {
        &SUPPORTED
    }

    fn is_available(&self) -> bool {
        self.api_key.is_set() && self.engine_id.is_set()
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
        let (key, cx) = self.credentials()?;

        let request = self.request(search_type, query, &key, &cx);
        let response = self.client.execute(request, cancel).await?.error_for_status()?;
        self.parse(search_type, &response.text)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GoogleResponse {
    items: Vec<GoogleItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GoogleItem {
    title: String,
    link: String,
    snippet: String,
    display_link: Option<String>,
    image: Option<GoogleImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GoogleImage {
    context_link: Option<String>,
    thumbnail_link: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}
