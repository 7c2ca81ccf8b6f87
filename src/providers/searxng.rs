//! SearXNG instance provider

use super::traits::*;
use super::clean_text;
use crate::error::ProviderError;
use crate::network::{accept_json, RateLimitedClient};
use crate::results::SearchResult;
use crate::search::SearchQuery;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const SUPPORTED: [SearchType; 4] = [
    SearchType::Web,
    SearchType::Image,
    SearchType::News,
    SearchType::Video,
];

const TIME_RANGES: [&str; 3] = ["day", "month", "year"];

/// Search through a self-hosted SearXNG instance's JSON API
pub struct SearXNG {
    base_url: Credential,
    username: Credential,
    password: Credential,
    client: RateLimitedClient,
}

impl SearXNG {
    pub fn new(client: RateLimitedClient) -> Self {
        Self {
            base_url: Credential::env("SEARXNG_BASE_URL"),
            username: Credential::env("SEARXNG_USERNAME"),
            password: Credential::env("SEARXNG_PASSWORD"),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: Credential) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_basic_auth(mut self, username: Credential, password: Credential) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    fn category(search_type: SearchType) -> &'static str {
        match search_type {
            SearchType::Image => "images",
            SearchType::News => "news",
            SearchType::Video => "videos",
            _ => "general",
        }
    }

    fn request(&self, search_type: SearchType, query: &SearchQuery, base_url: &str) -> ProviderRequest {
        let params = &query.params;
        let pageno = params.get_u64("pageno").unwrap_or(1).max(1);
        let time_range = params
            .get_str("time_range")
            .filter(|t| TIME_RANGES.contains(t));
        let language = params.get_str("language").filter(|l| *l != "all");
        let safesearch = params.get_u64("safesearch").filter(|s| *s <= 2).unwrap_or(0);

        let mut request = ProviderRequest::get(format!("{}/search", base_url.trim_end_matches('/')))
            .header("Accept", accept_json())
            .param("q", &query.query)
            .param("format", "json")
            .param("pageno", pageno)
            .param("categories", Self::category(search_type))
            .optional_param("time_range", time_range)
            .optional_param("language", language)
            .param("safesearch", safesearch);

        if let (Some(user), Some(pass)) = (self.username.resolve(), self.password.resolve()) {
            let auth = STANDARD.encode(format!("{}:{}", user, pass));
            request = request.header("Authorization", format!("Basic {}", auth));
        }
        request
    }

    fn parse(&self, search_type: SearchType, query: &SearchQuery, body: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let response: SearXNGResponse = serde_json::from_str(body)?;
        let language = query.params.get_str("language").filter(|l| *l != "all");
        let time_range = query.params.get_str("time_range");

        let results = response
            .results
            .into_iter()
            .map(|item| {
                SearchResult::new(clean_text(&item.title), item.url)
                    .with_description(clean_text(&item.content))
                    .with_metadata("category", search_type.as_str())
                    .with_optional_metadata("engine", item.engine)
                    .with_optional_metadata("published", item.published_date)
                    .with_optional_metadata("image_url", item.img_src)
                    .with_optional_metadata("thumbnail", item.thumbnail_src)
                    .with_optional_metadata("language", language)
                    .with_optional_metadata("time_range", time_range)
            })
            .collect();
        Ok(results)
    }
}

#[async_trait]
impl Provider for SearXNG {
    fn name(&self) -> &str {
        "searxng"
    }

    fn about(&self) -> ProviderAbout {
        ProviderAbout::new()
            .website("https://docs.searxng.org")
            .official_api(true)
            .requires(self.base_url.describe())
    }

    fn supported_types(&self) -> &[SearchType] {
        &SUPPORTED
    }

    fn is_available(&self) -> bool {
        self.base_url.is_set()
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
        let base_url = self.base_url.resolve().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} is not set", self.base_url.describe()))
        })?;

        let request = self.request(search_type, query, &base_url);
        let response = self.client.execute(request, cancel).await?.error_for_status()?;
        self.parse(search_type, query, &response.text)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearXNGResponse {
    results: Vec<SearXNGItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearXNGItem {
    title: String,
    url: String,
    content: String,
    engine: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    img_src: Option<String>,
    thumbnail_src: Option<String>,
}
