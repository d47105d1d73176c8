use crate::aggregator::{AggregateState, Aggregator};
use crate::client::TransportPort;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::filter::filter;
use crate::pipeline::FetchPipeline;
use crate::state::{StateStore, Subscription, ViewState};
use crate::types::ItemDetail;

/// An owned catalog view: pipeline, aggregated data and view state.
///
/// Callers create one per consumer and drive it explicitly,
/// `run` to (re)fetch, `set_query` to narrow the view, `reset` to start over.
#[derive(Debug)]
pub struct Session<C> {
    pipeline: FetchPipeline<C>,
    aggregator: Aggregator,
    store: StateStore,
}

impl<C: TransportPort> Session<C> {
    pub fn new(client: C, config: PipelineConfig) -> Self {
        Self {
            pipeline: FetchPipeline::new(client, config),
            aggregator: Aggregator::new(),
            store: StateStore::new(),
        }
    }

    /// Fetch the configured catalog page and all of its details.
    ///
    /// See [FetchPipeline::run].
    pub async fn run(&self) -> Result<ViewState, PipelineError> {
        self.pipeline.run(&self.aggregator, &self.store).await
    }

    /// Discard all data, the query and the view state.
    ///
    /// Fails while a run is in flight.
    pub fn reset(&self) -> Result<(), PipelineError> {
        let _guard = self.pipeline.try_start()?;
        self.aggregator.reset();
        self.store.reset();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.pipeline.is_running()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.aggregator.set_query(query);
    }

    pub fn query(&self) -> String {
        self.aggregator.query()
    }

    /// The details matching the current query, in catalog order.
    pub fn visible(&self) -> Vec<ItemDetail> {
        let state = self.aggregator.snapshot();
        filter(&state, &state.query).into_iter().cloned().collect()
    }

    pub fn snapshot(&self) -> AggregateState {
        self.aggregator.snapshot()
    }

    /// Number of resolved details and number of catalog items.
    pub fn progress(&self) -> (usize, usize) {
        self.aggregator.progress()
    }

    pub fn view_state(&self) -> ViewState {
        self.store.current()
    }

    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }
}
