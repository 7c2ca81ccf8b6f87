//! Bounded parallel execution of independent queries

use super::executor::QueryExecutor;
use super::models::SearchQuery;
use crate::providers::{Provider, SearchType};
use crate::results::QueryOutcome;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Default number of queries in flight at once
pub const DEFAULT_MAX_PARALLEL: usize = 3;

/// Fans queries out to a fixed pool of workers.
///
/// Outcomes come back in input order whatever order they finish in.
#[derive(Clone)]
pub struct Dispatcher {
    executor: QueryExecutor,
    max_parallel: usize,
}

impl Dispatcher {
    pub fn new(executor: QueryExecutor, max_parallel: usize) -> Self {
        Self {
            executor,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run every query and return exactly one outcome per query.
    pub async fn dispatch(
        &self,
        search_type: SearchType,
        queries: Vec<SearchQuery>,
        candidates: Arc<[Arc<dyn Provider>]>,
        cancel: &CancellationToken,
    ) -> Vec<QueryOutcome> {
        let total = queries.len();
        if total == 0 {
            return Vec::new();
        }

        let names: Vec<String> = queries.iter().map(|q| q.query.clone()).collect();
        let queue = Arc::new(Mutex::new(
            queries.into_iter().enumerate().collect::<VecDeque<_>>(),
        ));
        let slots: Arc<Mutex<Vec<Option<QueryOutcome>>>> = Arc::new(Mutex::new(vec![None; total]));

        let workers = self.max_parallel.min(total);
        debug!(queries = total, workers, "Dispatching queries");

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let executor = self.executor.clone();
            let queue = queue.clone();
            let slots = slots.clone();
            let candidates = candidates.clone();
            let cancel = cancel.clone();

            set.spawn(async move {
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some((index, query)) = next else {
                        break;
                    };

                    let outcome = executor
                        .execute(search_type, &query, &candidates, &cancel)
                        .await;

                    slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(outcome);
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("Search worker failed: {}", e);
            }
        }

        let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter_mut()
            .zip(names)
            .map(|(slot, query)| {
                slot.take().unwrap_or_else(|| {
                    QueryOutcome::failure(query, "search failed: worker terminated unexpectedly")
                })
            })
            .collect()
    }
}
