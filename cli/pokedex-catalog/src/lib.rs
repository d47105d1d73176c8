//! Catalog aggregation for the pokedex CLI.
//!
//! This crate provides:
//! - A transport port for the catalog list and detail endpoints,
//!   with an HTTP implementation and a mock for testing
//! - A fetch pipeline that loads one catalog page and fans out detail fetches
//! - An aggregator merging details into a fixed, keyed view
//! - A state store reporting loading/success/error to observers
//! - A pure query filter over the aggregated view
//!
//! ## Usage
//!
//! ```ignore
//! use pokedex_catalog::{CatalogClient, CatalogClientConfig, PipelineConfig, Session};
//!
//! let client = CatalogClient::new(CatalogClientConfig::default())?;
//! let session = Session::new(client, PipelineConfig::default());
//!
//! let state = session.run().await?;
//! session.set_query("saur");
//! let visible = session.visible();
//! ```

mod aggregator;
mod client;
mod config;
mod envelope;
mod error;
mod filter;
pub mod mock;
mod pipeline;
mod session;
mod state;
mod types;

pub use aggregator::{AggregateState, Aggregator};
pub use client::{
    CatalogClient,
    Client,
    StreamItem,
    TransportPort,
    collect_depaged,
    depage_catalog,
    make_depaging_stream,
};
pub use config::{
    CatalogClientConfig,
    DEFAULT_CATALOG_URL,
    DEFAULT_MAX_CONCURRENT_FETCHES,
    DEFAULT_PAGE_LIMIT,
    PipelineConfig,
};
pub use envelope::Envelope;
pub use error::{
    CatalogClientError,
    MockDataError,
    NETWORK_ERROR_MESSAGE,
    PipelineError,
    TransportError,
};
pub use filter::filter;
pub use mock::{MockClient, POKEDEX_CATALOG_MOCK_VAR};
pub use pipeline::{FetchPipeline, detail_envelopes, page_envelopes};
pub use session::Session;
pub use state::{StateStore, Subscription, ViewState};
pub use types::{CatalogItem, CatalogPage, ItemDetail, PageRequest, display_name};
