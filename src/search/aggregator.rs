//! Summarising per-query outcomes into one response

use crate::error::SearchError;
use crate::results::{AggregateResponse, QueryOutcome, Summary};
use chrono::Utc;

/// Count successful and failed outcomes
pub fn summarize(outcomes: &[QueryOutcome]) -> Summary {
    let successful = outcomes.iter().filter(|o| o.is_success()).count();
    Summary {
        total: outcomes.len(),
        successful,
        failed: outcomes.len() - successful,
    }
}

/// Build the response for a batch.
///
/// Fails only when at least one query ran and none succeeded; partial
/// failures are reported per query inside the response.
pub fn aggregate(outcomes: Vec<QueryOutcome>) -> Result<AggregateResponse, SearchError> {
    let summary = summarize(&outcomes);

    if summary.successful == 0 && summary.failed > 0 {
        let details = outcomes
            .iter()
            .map(|o| format!("{}: {}", o.query, o.error.as_deref().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SearchError::AllQueriesFailed(details));
    }

    Ok(AggregateResponse {
        searches: outcomes,
        summary,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::SearchResult;

    fn ok(query: &str) -> QueryOutcome {
        QueryOutcome::success(query, "brave", vec![SearchResult::new("t", "https://t.example")])
    }

    #[test]
    fn test_partial_failure() {
        let response = aggregate(vec![
            ok("a"),
            QueryOutcome::failure("b", "search failed: brave: timeout"),
            QueryOutcome::success("c", "kagi", vec![]),
        ])
        .unwrap();

        assert_eq!(
            response.summary,
            Summary {
                total: 3,
                successful: 2,
                failed: 1
            }
        );
        assert_eq!(response.searches[1].query, "b");
    }

    #[test]
    fn test_total_failure() {
        let err = aggregate(vec![
            QueryOutcome::failure("first", "search failed: x: boom"),
            QueryOutcome::failure("second", "all providers failed: x: boom; y: bang"),
        ])
        .unwrap_err();

        let text = err.to_string();
        assert!(text.starts_with("all queries failed: "));
        assert!(text.contains("first: search failed: x: boom"));
        assert!(text.contains("second: all providers failed"));
    }

    #[test]
    fn test_empty_batch() {
        let response = aggregate(vec![]).unwrap();
        assert_eq!(response.summary, Summary::default());
    }
}
