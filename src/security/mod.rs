//! Content security scanning for provider results
//!
//! A [`ContentScanner`] inspects each result's title and description before
//! it is returned. A `Block` verdict rejects the whole query; a `Warn`
//! verdict is attached to the result as `metadata.security_warning`.

mod patterns;

pub use patterns::PatternScanner;

use crate::error::ProviderError;
use crate::results::SearchResult;
use tracing::warn;

/// Decision for one piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Allow,
    Warn(String),
    Block(String),
}

/// Inspects untrusted text coming back from providers
pub trait ContentScanner: Send + Sync {
    fn scan(&self, text: &str) -> ScanVerdict;
}

/// Run every result through `scanner`.
///
/// Fails with [`ProviderError::SecurityBlocked`] on the first blocked
/// result; warnings are recorded in the result metadata.
pub fn screen_results(
    scanner: &dyn ContentScanner,
    results: Vec<SearchResult>,
) -> Result<Vec<SearchResult>, ProviderError> {
    results
        .into_iter()
        .map(|result| match scanner.scan(&result.scan_text()) {
            ScanVerdict::Allow => Ok(result),
            ScanVerdict::Warn(message) => {
                warn!(url = %result.url, "Security warning: {}", message);
                Ok(result.with_metadata("security_warning", message))
            }
            ScanVerdict::Block(message) => Err(ProviderError::SecurityBlocked(message)),
        })
        .collect()
}
