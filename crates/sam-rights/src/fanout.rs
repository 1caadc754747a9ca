use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Inputs of one independent aggregate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuerySpec {
    pub scopes: Vec<String>,
    pub editor: String,
}

/// A response assembled from independent partial results, one per slot.
pub trait FanOutResponse: Default + Send + 'static {
    type Slot: Ord + Copy + Debug + Send + 'static;
    type Partial: Send + 'static;

    fn merge(&mut self, slot: Self::Slot, partial: Self::Partial);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutState {
    Idle,
    Running(usize),
    Joined,
    Success,
    Failed,
}

#[derive(Debug)]
pub enum FanOutOutcome {
    Success,
    /// The first query error observed; later ones are logged and dropped.
    Failed(anyhow::Error),
}

impl FanOutOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FanOutOutcome::Success)
    }
}

#[derive(Debug)]
pub struct Aggregation<R> {
    pub response: R,
    pub outcome: FanOutOutcome,
}

/// Runs one query per slot concurrently and merges the results once every
/// query has finished. Any failure turns the whole response into
/// `R::default()`.
pub struct FanOut<R: FanOutResponse> {
    specs: BTreeMap<R::Slot, AggregateQuerySpec>,
}

impl<R: FanOutResponse> Default for FanOut<R> {
    fn default() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }
}

impl<R: FanOutResponse> FanOut<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the query filling `slot`, replacing any earlier one.
    pub fn with_query(mut self, slot: R::Slot, spec: AggregateQuerySpec) -> Self {
        if let Some(replaced) = self.specs.insert(slot, spec) {
            warn!(?slot, ?replaced, "fan-out query registered twice; keeping the later one");
        }
        self
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub async fn run<F, Fut>(self, query: F) -> Aggregation<R>
    where
        F: Fn(R::Slot, AggregateQuerySpec) -> Fut,
        Fut: Future<Output = anyhow::Result<R::Partial>> + Send + 'static,
    {
        let mut state = FanOutState::Idle;
        debug!(?state, queries = self.specs.len(), "fan-out prepared");

        let (error_tx, mut error_rx) = mpsc::channel::<anyhow::Error>(1);

        let handles: Vec<_> = self
            .specs
            .into_iter()
            .map(|(slot, spec)| {
                let error_tx = error_tx.clone();
                let task = query(slot, spec);
                tokio::spawn(async move {
                    match task.await {
                        Ok(partial) => Some((slot, partial)),
                        Err(err) => {
                            let err = err.context(format!("{slot:?} query failed"));
                            if let Err(full) = error_tx.try_send(err) {
                                warn!(
                                    ?slot,
                                    "dropping additional fan-out error: {:#}",
                                    full.into_inner()
                                );
                            }
                            None
                        }
                    }
                })
            })
            .collect();
        drop(error_tx);

        state = FanOutState::Running(handles.len());
        debug!(?state, "fan-out queries spawned");

        let results = join_all(handles).await;
        state = FanOutState::Joined;
        debug!(?state, "fan-out joined");

        let mut partials = Vec::with_capacity(results.len());
        let mut panicked = None;
        for result in results {
            match result {
                Ok(Some(partial)) => partials.push(partial),
                Ok(None) => {}
                Err(join_err) => {
                    warn!("fan-out query task aborted: {join_err}");
                    panicked
                        .get_or_insert_with(|| anyhow::anyhow!("query task aborted: {join_err}"));
                }
            }
        }

        if let Some(first_error) = error_rx.try_recv().ok().or(panicked) {
            state = FanOutState::Failed;
            debug!(?state, "fan-out failed: {first_error:#}");
            return Aggregation {
                response: R::default(),
                outcome: FanOutOutcome::Failed(first_error),
            };
        }

        let mut response = R::default();
        for (slot, partial) in partials {
            response.merge(slot, partial);
        }

        state = FanOutState::Success;
        debug!(?state, "fan-out merged");
        Aggregation {
            response,
            outcome: FanOutOutcome::Success,
        }
    }
}
