//! Brave Search API provider

use super::traits::*;
use super::clean_text;
use crate::error::ProviderError;
use crate::network::{accept_json, RateLimitedClient};
use crate::results::SearchResult;
use crate::search::SearchQuery;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://api.search.brave.com/res/v1";
const SUPPORTED: [SearchType; 5] = SearchType::ALL;

/// Brave search over the official API
pub struct Brave {
    base_url: String,
    api_key: Credential,
    client: RateLimitedClient,
}

impl Brave {
    pub fn new(client: RateLimitedClient) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: Credential::env("BRAVE_API_KEY"),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Credential) -> Self {
        self.api_key = api_key;
        self
    }

    fn request(&self, search_type: SearchType, query: &SearchQuery, api_key: &str) -> ProviderRequest {
        let (endpoint, max_count) = match search_type {
            SearchType::Web | SearchType::Local => ("/web/search", 20),
            SearchType::Image => ("/images/search", 100),
            SearchType::News => ("/news/search", 20),
            SearchType::Video => ("/videos/search", 20),
        };

        let mut request = ProviderRequest::get(format!("{}{}", self.base_url, endpoint))
            .header("Accept", accept_json())
            .header("X-Subscription-Token", api_key)
            .param("q", &query.query)
            .param("count", query.count.clamp(1, max_count));

        if search_type == SearchType::Local {
            request = request.param("result_filter", "locations");
        }

        if search_type != SearchType::Image {
            request = request
                .optional_param("offset", query.params.get_u64("offset").map(|o| o.min(9)))
                .optional_param("freshness", query.params.get_str("freshness"));
        }

        request
    }

    fn parse(&self, search_type: SearchType, body: &str) -> Result<Vec<SearchResult>, ProviderError> {
        let results = match search_type {
            SearchType::Web => {
                let response: WebResponse = serde_json::from_str(body)?;
                response.web.results.into_iter().map(web_result).collect()
            }
            SearchType::Local => {
                let response: WebResponse = serde_json::from_str(body)?;
                response
                    .locations
                    .results
                    .into_iter()
                    .map(local_result)
                    .collect()
            }
            SearchType::Image => {
                let response: ListResponse<ImageItem> = serde_json::from_str(body)?;
                response.results.into_iter().map(image_result).collect()
            }
            SearchType::News => {
                let response: ListResponse<WebItem> = serde_json::from_str(body)?;
                response.results.into_iter().map(web_result).collect()
            }
            SearchType::Video => {
                let response: ListResponse<VideoItem> = serde_json::from_str(body)?;
                response.results.into_iter().map(video_result).collect()
            }
        };
        Ok(results)
    }
}

#[async_trait]
impl Provider for Brave {
    fn name(&self) -> &str {
        "brave"
    }

    fn about(&self) -> ProviderAbout {
        ProviderAbout::new()
            .website("https://brave.com/search/api/")
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

        let request = self.request(search_type, query, &api_key);
        let response = self.client.execute(request, cancel).await?.error_for_status()?;
        self.parse(search_type, &response.text)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebResponse {
    web: ListResponse<WebItem>,
    locations: ListResponse<LocationItem>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ListResponse<T> {
    results: Vec<T>,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self { results: vec![] }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebItem {
    title: String,
    url: String,
    description: String,
    age: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnail {
    src: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageProperties {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageItem {
    title: String,
    url: String,
    source: Option<String>,
    thumbnail: Thumbnail,
    properties: ImageProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoInfo {
    duration: Option<String>,
    creator: Option<String>,
    publisher: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoItem {
    title: String,
    url: String,
    description: String,
    age: Option<String>,
    video: VideoInfo,
    thumbnail: Thumbnail,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rating {
    #[serde(rename = "ratingValue")]
    rating_value: Option<f64>,
    #[serde(rename = "reviewCount")]
    review_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostalAddress {
    #[serde(rename = "displayAddress")]
    display_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocationItem {
    id: Option<String>,
    title: String,
    url: Option<String>,
    coordinates: Option<[f64; 2]>,
    postal_address: PostalAddress,
    rating: Option<Rating>,
}

fn web_result(item: WebItem) -> SearchResult {
    SearchResult::new(clean_text(&item.title), item.url)
        .with_description(clean_text(&item.description))
        .with_optional_metadata("age", item.age)
        .with_optional_metadata("language", item.language)
}

fn image_result(item: ImageItem) -> SearchResult {
    SearchResult::new(clean_text(&item.title), item.url)
        .with_optional_metadata("source", item.source)
        .with_optional_metadata("thumbnail", item.thumbnail.src)
        .with_optional_metadata("image_url", item.properties.url)
}

fn video_result(item: VideoItem) -> SearchResult {
    SearchResult::new(clean_text(&item.title), item.url)
        .with_description(clean_text(&item.description))
        .with_optional_metadata("age", item.age)
        .with_optional_metadata("duration", item.video.duration)
        .with_optional_metadata("creator", item.video.creator)
        .with_optional_metadata("publisher", item.video.publisher)
        .with_optional_metadata("thumbnail", item.thumbnail.src)
}

fn local_result(item: LocationItem) -> SearchResult {
    let mut result = SearchResult::new(clean_text(&item.title), item.url.unwrap_or_default())
        .with_description(item.postal_address.display_address.unwrap_or_default())
        .with_optional_metadata("id", item.id);
    if let Some([lat, lon]) = item.coordinates {
        result = result.with_metadata("coordinates", serde_json::json!({"lat": lat, "lon": lon}));
    }
    if let Some(rating) = item.rating {
        result = result
            .with_optional_metadata("rating", rating.rating_value)
            .with_optional_metadata("review_count", rating.review_count);
    }
    result
}
