//! DuckDuckGo HTML provider

use super::traits::*;
use super::clean_text;
use crate::error::ProviderError;
use crate::network::{accept_html, accept_language, generate_user_agent, RateLimitedClient};
use crate::results::SearchResult;
use crate::search::SearchQuery;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use url::Url;

const HTML_URL: &str = "https://html.duckduckgo.com/html/";
const SUPPORTED: [SearchType; 1] = [SearchType::Web];

static RESULT_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("div.result"));
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("a.result__a"));
static SNIPPET_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(".result__snippet"));

fn selector(css: &str) -> Selector {
    // Only ever called with the literals above
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

/// DuckDuckGo web search by scraping the no-JS HTML endpoint.
///
/// Needs no credentials, so it is always available and sits last in the
/// default fallback order.
pub struct DuckDuckGo {
    html_url: String,
    client: RateLimitedClient,
}

impl DuckDuckGo {
    pub fn new(client: RateLimitedClient) -> Self {
        Self {
            html_url: HTML_URL.to_string(),
            client,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.html_url = url.into();
        self
    }

    fn request(&self, query: &SearchQuery) -> ProviderRequest {
        let mut form_data = HashMap::new();
        form_data.insert("q".to_string(), query.query.clone());
        form_data.insert("b".to_string(), String::new());
        form_data.insert(
            "kl".to_string(),
            query.params.get_str("region").unwrap_or_default().to_string(),
        );

        ProviderRequest::post(&self.html_url)
            .header("User-Agent", generate_user_agent())
            .header("Accept", accept_html())
            .header(
                "Accept-Language",
                accept_language(query.params.get_str("language").unwrap_or("all")),
            )
            .form(form_data)
    }

    fn parse_html_results(&self, html: &str, limit: usize) -> Vec<SearchResult> {
        let document = Html::parse_document(html);
        let mut results = Vec::new();

        for element in document.select(&RESULT_SELECTOR) {
            if results.len() >= limit {
                break;
            }

            let Some(title_elem) = element.select(&TITLE_SELECTOR).next() else {
                continue;
            };

            let title = clean_text(&title_elem.text().collect::<String>());
            let Some(href) = title_elem.value().attr("href") else {
                continue;
            };
            // Sponsored results go through y.js
            if title.is_empty() || href.contains("y.js") {
                continue;
            }

            let url = resolve_redirect(href);
            if url.is_empty() {
                continue;
            }

            let snippet = element
                .select(&SNIPPET_SELECTOR)
                .next()
                .map(|s| clean_text(&s.text().collect::<String>()))
                .unwrap_or_default();

            let position = results.len() + 1;
            results.push(
                SearchResult::new(title, url)
                    .with_description(snippet)
                    .with_metadata("position", position),
            );
        }

        results
    }
}

/// Unwrap `//duckduckgo.com/l/?uddg=<target>` redirect links
fn resolve_redirect(href: &str) -> String {
    if !href.contains("duckduckgo.com/l/") {
        return href.to_string();
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

#[async_trait]
impl Provider for DuckDuckGo {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    fn about(&self) -> ProviderAbout {
        ProviderAbout::new()
            .website("https://duckduckgo.com")
            .official_api(false)
    }

    fn supported_types(&self) -> &[SearchType] {
        &SUPPORTED
    }

    fn is_available(&self) -> bool {
        true
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

        let response = self.client.execute(self.request(query), cancel).await?;
        // 202 is how the HTML endpoint signals throttling
        if response.status == 202 {
            return Err(ProviderError::RateLimited);
        }
        let response = response.error_for_status()?;

        Ok(self.parse_html_results(&response.text, query.count as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TransportConfig;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r##"
        <html><body>
        <div class="result results_links">
          <h2 class="result__title"><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming Language</a></h2>
          <a class="result__snippet" href="#">A language empowering <b>everyone</b>.</a>
        </div>
        <div class="result result--ad">
          <h2 class="result__title"><a class="result__a" href="https://duckduckgo.com/y.js?ad=1">Buy Rust</a></h2>
        </div>
        <div class="result">
          <h2 class="result__title"><a class="result__a" href="https://doc.rust-lang.org/book/">The Book</a></h2>
          <a class="result__snippet">Learn Rust</a>
        </div>
        <div class="result">
          <h2 class="result__title"><a class="result__a" href="https://crates.io">crates.io</a></h2>
        </div>
        </body></html>
    "##;

    fn ddg(url: &str) -> DuckDuckGo {
        let config = TransportConfig {
            requests_per_second: 1000.0,
            ..TransportConfig::default()
        };
        DuckDuckGo::new(RateLimitedClient::standalone(config)).with_base_url(url)
    }

    #[test]
    fn test_parse_html_results() {
        let results = ddg(HTML_URL).parse_html_results(PAGE, 10);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert_eq!(results[0].description, "A language empowering everyone.");
        assert_eq!(results[1].title, "The Book");
        assert_eq!(results[1].metadata["position"], 2);
        assert_eq!(results[2].description, "");
    }

    #[test]
    fn test_parse_respects_limit() {
        assert_eq!(ddg(HTML_URL).parse_html_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn test_resolve_redirect() {
        assert_eq!(
            resolve_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc&rut=x"),
            "https://example.com/a?b=c"
        );
        assert_eq!(resolve_redirect("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_always_available() {
        assert!(ddg(HTML_URL).is_available());
        assert!(!ddg(HTML_URL).supports(SearchType::Image));
    }

    #[tokio::test]
    async fn test_search_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("q=rust"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let results = ddg(&server.uri())
            .search(SearchType::Web, &SearchQuery::simple("rust").with_count(2), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_throttled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let err = ddg(&server.uri())
            .search(SearchType::Web, &SearchQuery::simple("rust"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::RateLimited);
    }
}
