//! Transport port and the HTTP client implementing it.

use std::fmt::Debug;
use std::future::{Future, ready};
use std::str::FromStr;
use std::time::Duration;

use async_stream::try_stream;
use enum_dispatch::enum_dispatch;
use futures::stream::Stream;
use futures::TryStreamExt;
use reqwest::header::{self, HeaderMap};
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::{CatalogClientError, TransportError};
use crate::mock::MockClient;
use crate::types::{ApiItemDetail, CatalogItem, CatalogPage, ItemDetail, PageRequest};

// ---------------------------------------------------------------------------
// Transport port
// ---------------------------------------------------------------------------

/// The two remote calls the pipeline depends on.
///
/// Implementations own timeouts and any retry policy;
/// callers only ever see the resulting [TransportError].
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait TransportPort {
    /// Fetch one page of the catalog list.
    async fn fetch_catalog_page(&self, request: PageRequest)
    -> Result<CatalogPage, TransportError>;

    /// Fetch the full record for a single catalog key.
    async fn fetch_item_detail(&self, key: &str) -> Result<ItemDetail, TransportError>;
}

/// Either a client for the actual catalog service,
/// or a mock client for testing.
#[derive(Debug)]
#[enum_dispatch(TransportPort)]
pub enum Client {
    Catalog(CatalogClient),
    Mock(MockClient),
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// A client for the catalog service.
///
/// Handles HTTP client configuration with timeouts,
/// default headers and endpoint construction.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url = Url::parse(&config.catalog_url)
            .map_err(|e| CatalogClientError::InvalidUrl(config.catalog_url.clone(), e))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogClientError::InvalidUrl(
                config.catalog_url.clone(),
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }

        let http = build_http_client(&config)?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    /// Append `segments` to the base URL, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::new(format!("invalid catalog url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl TransportPort for CatalogClient {
    #[instrument(skip(self), fields(offset = request.offset, limit = request.limit.get()))]
    async fn fetch_catalog_page(
        &self,
        request: PageRequest,
    ) -> Result<CatalogPage, TransportError> {
        let url = self.endpoint(&["pokemon"])?;
        debug!(%url, "sending catalog page request");

        let page = self
            .http
            .get(url)
            .query(&[("offset", request.offset), ("limit", request.limit.get())])
            .send()
            .await?
            .error_for_status()?
            .json::<CatalogPage>()
            .await?;

        debug!(
            n_items = page.items.len(),
            total_count = page.total_count,
            "received catalog page"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn fetch_item_detail(&self, key: &str) -> Result<ItemDetail, TransportError> {
        let url = self.endpoint(&["pokemon", key])?;
        debug!(%url, "sending item detail request");

        let detail = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<ApiItemDetail>()
            .await?;

        Ok(detail.into())
    }
}

// ---------------------------------------------------------------------------
// Depaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem<T> {
    TotalCount(u64),
    Result(T),
}

impl<T> From<T> for StreamItem<T> {
    fn from(value: T) -> Self {
        Self::Result(value)
    }
}

/// Create a depaging stream from a page-fetching function.
///
/// Requests pages with increasing offsets starting at `first` and
/// yields `TotalCount` once followed by the items of every page.
/// Stops after a short page or once the reported total count is reached.
pub fn make_depaging_stream<T, E, Fut>(
    generator: impl Fn(PageRequest) -> Fut,
    first: PageRequest,
) -> impl Stream<Item = Result<StreamItem<T>, E>>
where
    Fut: Future<Output = Result<(u64, Vec<T>), E>>,
{
    try_stream! {
        let mut request = first;
        let mut total_count_yielded = false;

        loop {
            let (total_count, results) = generator(request).await?;

            let items_on_page = results.len();

            if !total_count_yielded {
                yield StreamItem::TotalCount(total_count);
                total_count_yielded = true;
            }

            for result in results {
                yield StreamItem::Result(result)
            }

            if items_on_page < request.limit.get() as usize {
                break;
            }
            if u64::from(request.offset) + items_on_page as u64 >= total_count {
                break;
            }
            request = request.next();
        }
    }
}

/// Stream every catalog item reachable from `first` onwards.
pub fn depage_catalog<C: TransportPort>(
    client: &C,
    first: PageRequest,
) -> impl Stream<Item = Result<StreamItem<CatalogItem>, TransportError>> + '_ {
    make_depaging_stream(
        move |request| async move {
            let page = client.fetch_catalog_page(request).await?;
            Ok::<_, TransportError>((page.total_count, page.items))
        },
        first,
    )
}

/// Collects a depaging stream, returning the total count and the items.
pub async fn collect_depaged<T, E>(
    stream: impl Stream<Item = Result<StreamItem<T>, E>>,
) -> Result<(Option<u64>, Vec<T>), E> {
    let mut count = None;
    let results = stream
        .try_filter_map(|item| {
            let new_item = match item {
                StreamItem::TotalCount(total) => {
                    count = Some(total);
                    None
                },
                StreamItem::Result(res) => Some(res),
            };
            ready(Ok(new_item))
        })
        .try_collect::<Vec<_>>()
        .await?;
    Ok((count, results))
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key)
                .map_err(|_| CatalogClientError::InvalidHeader(key.clone()))?,
            header::HeaderValue::from_str(value)
                .map_err(|_| CatalogClientError::InvalidHeader(key.clone()))?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder.build().map_err(CatalogClientError::Build)
}

#[cfg(test)]
pub mod tests {
    use std::collections::BTreeMap;
    use std::num::NonZeroU32;

    use futures::StreamExt;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use itertools::Itertools;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::error::NETWORK_ERROR_MESSAGE;
    use crate::mock::test_helpers::page;

    fn client_config(url: &str) -> CatalogClientConfig {
        CatalogClientConfig {
            catalog_url: url.to_string(),
            extra_headers: Default::default(),
            user_agent: None,
        }
    }

    fn request(offset: u32, limit: u32) -> PageRequest {
        PageRequest::new(offset, NonZeroU32::new(limit).unwrap())
    }

    #[tokio::test]
    async fn fetches_catalog_page() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/pokemon")
                .query_param("offset", "20")
                .query_param("limit", "2");
            then.status(200).json_body(json!({
                "count": 1302,
                "next": null,
                "previous": null,
                "results": [
                    { "name": "spearow", "url": "https://pokeapi.co/api/v2/pokemon/21/" },
                    { "name": "fearow", "url": "https://pokeapi.co/api/v2/pokemon/22/" }
                ]
            }));
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let page = client.fetch_catalog_page(request(20, 2)).await.unwrap();

        mock.assert();
        assert_eq!(page.total_count, 1302);
        assert_eq!(
            page.items.iter().map(|item| item.key.as_str()).collect_vec(),
            vec!["spearow", "fearow"]
        );
    }

    #[tokio::test]
    async fn fetches_item_detail_below_base_path() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v2/pokemon/pikachu");
            then.status(200).json_body(json!({
                "name": "pikachu",
                "weight": 60,
                "height": 4,
                "types": [ { "slot": 1, "type": { "name": "electric" } } ],
                "sprites": { "front_default": "https://img/25.png" },
                "stats": [ { "base_stat": 35, "stat": { "name": "hp" } } ]
            }));
        });

        let client = CatalogClient::new(client_config(&server.url("/api/v2/"))).unwrap();
        let detail = client.fetch_item_detail("pikachu").await.unwrap();

        mock.assert();
        assert_eq!(detail.display_name, "Pikachu");
        assert_eq!(detail.tags, vec!["electric".to_string()]);
        assert_eq!(detail.hit_points(), Some(35));
        assert_eq!(detail.image_url, "https://img/25.png");
    }

    #[tokio::test]
    async fn not_found_maps_to_transport_error() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(404).body("Not Found");
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let err = client.fetch_item_detail("missingno").await.unwrap_err();

        mock.assert();
        assert!(
            err.message().starts_with("404 Not Found"),
            "unexpected message: {err}"
        );
    }

    #[tokio::test]
    async fn invalid_body_maps_to_transport_error() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(200)
                .header("content-type", "application/json")
                .body("<html>definitely not json</html>");
        });

        let client = CatalogClient::new(client_config(&server.base_url())).unwrap();
        let err = client
            .fetch_catalog_page(request(0, 10))
            .await
            .unwrap_err();

        mock.assert();
        assert!(
            err.message().starts_with("invalid response"),
            "unexpected message: {err}"
        );
    }

    #[tokio::test]
    async fn connection_failure_maps_to_network_error() {
        // nothing listens on the discard port
        let client = CatalogClient::new(client_config("http://127.0.0.1:9")).unwrap();
        let err = client.fetch_catalog_page(request(0, 10)).await.unwrap_err();
        assert_eq!(err.message(), NETWORK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn extra_headers_set_on_all_requests() {
        let mut extra_headers: BTreeMap<String, String> = BTreeMap::new();
        extra_headers.insert("pokedex-test".to_string(), "test-value".to_string());
        extra_headers.insert("pokedex-test2".to_string(), "test-value2".to_string());

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("pokedex-test", "test-value")
                .header("pokedex-test2", "test-value2");
            then.status(200).json_body(json!({ "count": 0, "results": [] }));
        });

        let config = CatalogClientConfig {
            extra_headers,
            ..client_config(&server.base_url())
        };

        let client = CatalogClient::new(config).unwrap();
        let _ = client.fetch_catalog_page(request(0, 1)).await;
        mock.assert();
    }

    #[tokio::test]
    async fn user_agent_set_on_all_requests() {
        let expected_agent = "my-custom-user-agent";

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("user-agent", expected_agent);
            then.status(200).json_body(json!({ "name": "ditto" }));
        });

        let config = CatalogClientConfig {
            user_agent: Some(expected_agent.to_owned()),
            ..client_config(&server.base_url())
        };

        let client = CatalogClient::new(config).unwrap();
        let _ = client.fetch_item_detail("ditto").await;
        mock.assert();
    }

    #[test]
    fn rejects_invalid_urls_and_headers() {
        assert!(matches!(
            CatalogClient::new(client_config("not a url")),
            Err(CatalogClientError::InvalidUrl(..))
        ));

        let config = CatalogClientConfig {
            extra_headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            ..client_config("https://pokeapi.co/api/v2")
        };
        assert!(matches!(
            CatalogClient::new(config),
            Err(CatalogClientError::InvalidHeader(_))
        ));
    }

    /// make_depaging_stream collects items from multiple pages
    #[tokio::test]
    async fn depage_multiple_pages() {
        let results = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
        let expected_results = results
            .iter()
            .flat_map(|chunk| chunk.iter())
            .map(|&item| StreamItem::from(item))
            .collect::<Vec<_>>();
        let total_results = results.iter().flatten().count() as u64;
        let results = &results;
        let stream = make_depaging_stream(
            |request| async move {
                let page_number = (request.offset / request.limit.get()) as usize;
                let page_data = results.get(page_number).cloned().unwrap_or_default();
                Ok::<_, TransportError>((total_results, page_data))
            },
            request(0, 3),
        );

        // First item is the total count, skip it
        let collected_results = stream.skip(1).try_collect::<Vec<_>>().await.unwrap();

        assert_eq!(collected_results, expected_results);
    }

    /// make_depaging_stream stops if a page has fewer than limit items
    #[tokio::test]
    async fn depage_stops_on_small_page() {
        let results = (1..=9)
            .chunks(3)
            .into_iter()
            .map(|chunk| chunk.collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let total_results = results.iter().flatten().count() as u64;
        let results = &results;
        let stream = make_depaging_stream(
            |request| async move {
                // a server returning fewer items than requested ends the listing
                let page_number = (request.offset / request.limit.get()) as usize;
                let page_data = results.get(page_number).cloned().unwrap_or_default();
                Ok::<_, TransportError>((total_results, page_data))
            },
            request(0, 4),
        );

        let collected: Vec<StreamItem<i32>> = stream.skip(1).try_collect().await.unwrap();

        assert_eq!(collected, (1..=3).map(StreamItem::from).collect::<Vec<_>>());
    }

    /// make_depaging_stream stops when total_count is reached
    #[tokio::test]
    async fn depage_stops_at_total_count() {
        let results = (1..=9)
            .chunks(3)
            .into_iter()
            .map(|chunk| chunk.collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let results = &results;
        // not the real total, nothing after it may be collected
        let total_count = 3;
        let stream = make_depaging_stream(
            |request| async move {
                let page_number = (request.offset / request.limit.get()) as usize;
                let page_data = results.get(page_number).cloned().unwrap_or_default();
                Ok::<_, TransportError>((total_count, page_data))
            },
            request(0, 3),
        );

        let collected: Vec<StreamItem<i32>> = stream.try_collect().await.unwrap();

        assert_eq!(collected, [
            StreamItem::TotalCount(3),
            StreamItem::Result(1),
            StreamItem::Result(2),
            StreamItem::Result(3)
        ]);
    }

    #[tokio::test]
    async fn depage_catalog_requests_increasing_offsets() {
        let client = MockClient::new();
        let mut first = page(&["a", "b"]);
        first.total_count = 5;
        let mut second = page(&["c", "d"]);
        second.total_count = 5;
        let mut third = page(&["e"]);
        third.total_count = 5;
        client.push_page_response(Ok(first));
        client.push_page_response(Ok(second));
        client.push_page_response(Ok(third));

        let (count, items) = collect_depaged(depage_catalog(&client, request(0, 2)))
            .await
            .unwrap();

        assert_eq!(count, Some(5));
        assert_eq!(
            items.iter().map(|item| item.key.as_str()).collect_vec(),
            vec!["a", "b", "c", "d", "e"]
        );
        assert_eq!(client.page_offsets(), vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn depage_catalog_propagates_errors() {
        let client = MockClient::new();
        client.push_page_response(Err(TransportError::new("timeout")));

        let result = collect_depaged(depage_catalog(&client, request(0, 2))).await;
        assert_eq!(result, Err(TransportError::new("timeout")));
    }
}
