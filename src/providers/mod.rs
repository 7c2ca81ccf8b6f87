//! Search provider module
//!
//! Defines the [`Provider`] trait, a registry for all providers, and the
//! built-in adapters for Brave, Google, Kagi, SearXNG and DuckDuckGo.

mod loader;
mod registry;
mod traits;

// Provider implementations
pub mod brave;
pub mod duckduckgo;
pub mod google;
pub mod kagi;
pub mod searxng;

pub use loader::ProviderLoader;
pub use registry::{ProviderInfo, ProviderRegistry};
pub use traits::*;

use once_cell::sync::Lazy;
use regex::Regex;

/// Names of the built-in providers, in default fallback priority order
pub const PROVIDER_NAMES: [&str; 5] = ["brave", "google", "kagi", "searxng", "duckduckgo"];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("{e}")));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap_or_else(|e| panic!("{e}")));

/// Strip markup, decode the common HTML entities and collapse whitespace
pub(crate) fn clean_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    let decoded = stripped
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}
