//! The two stage fetch: one catalog page, then a detail fetch per item.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};

use async_stream::stream;
use futures::stream::{self, Stream, StreamExt};
use itertools::Itertools;
use tracing::{debug, instrument, trace, warn};

use crate::aggregator::Aggregator;
use crate::client::TransportPort;
use crate::config::PipelineConfig;
use crate::envelope::Envelope;
use crate::error::PipelineError;
use crate::state::{StateStore, ViewState};
use crate::types::{CatalogPage, ItemDetail, PageRequest};

/// Emits `Loading` followed by the outcome of fetching `request`.
pub fn page_envelopes<C: TransportPort>(
    client: &C,
    request: PageRequest,
) -> impl Stream<Item = Envelope<CatalogPage>> + '_ {
    stream! {
        yield Envelope::Loading;
        yield client.fetch_catalog_page(request).await.into();
    }
}

/// Emits `Loading` followed by the outcome of fetching the detail of `key`.
pub fn detail_envelopes<C: TransportPort>(
    client: &C,
    key: String,
) -> impl Stream<Item = Envelope<ItemDetail>> + '_ {
    stream! {
        yield Envelope::Loading;
        yield client.fetch_item_detail(&key).await.into();
    }
}

/// Drive `stage` to its end and return the terminal envelope.
async fn settle<T>(stage: impl Stream<Item = Envelope<T>>) -> Envelope<T> {
    let mut stage = pin!(stage);
    let mut last = Envelope::Loading;
    while let Some(envelope) = stage.next().await {
        last = envelope;
    }
    last
}

/// Clears the running flag when a run ends or its future is dropped.
pub(crate) struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fetches a catalog page and fans out detail fetches for its items,
/// reporting into an [Aggregator] and a [StateStore].
///
/// Only one run may be in flight at a time,
/// a concurrent call is rejected with [PipelineError::AlreadyRunning].
#[derive(Debug)]
pub struct FetchPipeline<C> {
    client: C,
    config: PipelineConfig,
    running: AtomicBool,
}

impl<C: TransportPort> FetchPipeline<C> {
    pub fn new(client: C, config: PipelineConfig) -> Self {
        Self {
            client,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn try_start(&self) -> Result<RunGuard<'_>, PipelineError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::AlreadyRunning)?;
        Ok(RunGuard(&self.running))
    }

    /// Run one fetch cycle and return the resulting view state.
    ///
    /// Transport failures never surface as `Err`,
    /// they end up as an error state in `store`.
    #[instrument(skip_all, fields(
        offset = self.config.page.offset,
        limit = self.config.page.limit.get(),
    ))]
    pub async fn run(
        &self,
        aggregator: &Aggregator,
        store: &StateStore,
    ) -> Result<ViewState, PipelineError> {
        let _guard = self.try_start()?;
        aggregator.clear();

        let mut page = None;
        let mut page_stage = pin!(page_envelopes(&self.client, self.config.page));
        while let Some(envelope) = page_stage.next().await {
            match envelope {
                Envelope::Loading => store.set_loading(),
                Envelope::Success(fetched) => page = Some(fetched),
                Envelope::Error(message) => {
                    warn!(%message, "fetching catalog page failed");
                    store.set_error(message);
                    return Ok(store.current());
                },
            }
        }
        // the stage always ends in a terminal envelope
        let page = page.unwrap_or_default();

        let keys = page
            .items
            .iter()
            .map(|item| item.key.clone())
            .unique()
            .collect::<Vec<_>>();
        debug!(
            n_items = page.items.len(),
            n_keys = keys.len(),
            total_count = page.total_count,
            "received catalog page, fetching details"
        );
        aggregator.set_index(page.items);

        if aggregator.is_complete() {
            debug!("catalog page is empty");
            store.set_success();
            return Ok(store.current());
        }

        let mut failed = false;
        let mut completions = stream::iter(keys)
            .map(|key| async move {
                let outcome = settle(detail_envelopes(&self.client, key.clone())).await;
                (key, outcome)
            })
            .buffer_unordered(self.config.max_concurrent_fetches.get());

        while let Some((key, outcome)) = completions.next().await {
            match outcome {
                Envelope::Success(detail) => {
                    trace!(key, "received item detail");
                    aggregator.record_detail(&key, detail);
                },
                Envelope::Error(message) => {
                    warn!(key, %message, "fetching item detail failed");
                    // the first failure decides the outcome, siblings keep running
                    if !failed {
                        failed = true;
                        store.set_error(message);
                    }
                },
                Envelope::Loading => {},
            }

            if !failed && aggregator.is_complete() {
                store.set_success();
            }
        }

        let (resolved, total) = aggregator.progress();
        debug!(resolved, total, failed, "catalog run finished");
        Ok(store.current())
    }
}
