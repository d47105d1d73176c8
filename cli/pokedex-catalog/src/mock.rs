//! A catalog transport that serves canned responses.
//!
//! Used by tests and for offline runs of the CLI,
//! where responses are read from the file named by [POKEDEX_CATALOG_MOCK_VAR].

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;

use crate::client::TransportPort;
use crate::error::{MockDataError, TransportError};
use crate::types::{CatalogPage, ItemDetail, PageRequest};

pub const POKEDEX_CATALOG_MOCK_VAR: &str = "POKEDEX_CATALOG_MOCK";

// Arc allows you to push things into the client from outside the client if necessary
// Mutex allows you to share across threads (necessary because of tokio)
type MockField<T> = Arc<Mutex<T>>;

/// A canned response, either a value or a transport error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MockResponse<T> {
    // must come first, every field of the values defaults
    Error { error: String },
    Ok(T),
}

impl<T> From<Result<T, TransportError>> for MockResponse<T> {
    fn from(result: Result<T, TransportError>) -> Self {
        match result {
            Ok(value) => MockResponse::Ok(value),
            Err(err) => MockResponse::Error {
                error: err.to_string(),
            },
        }
    }
}

impl<T> From<MockResponse<T>> for Result<T, TransportError> {
    fn from(response: MockResponse<T>) -> Self {
        match response {
            MockResponse::Ok(value) => Ok(value),
            MockResponse::Error { error } => Err(TransportError::new(error)),
        }
    }
}

/// Responses of a mock client as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockData {
    /// Served in order, the last page response is repeated
    #[serde(default)]
    pub pages: VecDeque<MockResponse<CatalogPage>>,
    #[serde(default)]
    pub details: HashMap<String, MockResponse<ItemDetail>>,
}

/// A catalog client that can be seeded with mock responses
#[derive(Debug, Default)]
pub struct MockClient {
    pub mock_data: MockField<MockData>,
    detail_delays: Mutex<HashMap<String, Duration>>,
    page_gate: Mutex<Option<Arc<Notify>>>,
    page_offsets: Mutex<Vec<u32>>,
    detail_calls: AtomicUsize,
    completed_details: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock client from a JSON file of [MockData].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MockDataError> {
        let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
        let mock_data: MockData =
            serde_json::from_str(&contents).map_err(MockDataError::ParseJson)?;
        debug!(
            n_pages = mock_data.pages.len(),
            n_details = mock_data.details.len(),
            "loaded catalog mock data"
        );
        Ok(Self {
            mock_data: Arc::new(Mutex::new(mock_data)),
            ..Self::default()
        })
    }

    fn data(&self) -> std::sync::MutexGuard<'_, MockData> {
        self.mock_data.lock().expect("couldn't acquire mock lock")
    }

    /// Push a new page response into the list of mock responses
    pub fn push_page_response(&self, response: Result<CatalogPage, TransportError>) {
        self.data().pages.push_back(response.into());
    }

    /// Set the response served for `key`
    pub fn set_detail_response(
        &self,
        key: impl Into<String>,
        response: Result<ItemDetail, TransportError>,
    ) {
        self.data().details.insert(key.into(), response.into());
    }

    /// Delay the detail response for `key`
    pub fn set_detail_delay(&self, key: impl Into<String>, delay: Duration) {
        self.detail_delays
            .lock()
            .expect("couldn't acquire mock lock")
            .insert(key.into(), delay);
    }

    /// Hold every page response until the returned handle is notified
    pub fn hold_pages(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.page_gate.lock().expect("couldn't acquire mock lock") = Some(gate.clone());
        gate
    }

    /// Offsets of all page requests made so far
    pub fn page_offsets(&self) -> Vec<u32> {
        self.page_offsets
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    pub fn page_calls(&self) -> usize {
        self.page_offsets().len()
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Keys in the order their detail responses were served
    pub fn completed_details(&self) -> Vec<String> {
        self.completed_details
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    /// The highest number of detail requests served at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_page(&self) -> Option<MockResponse<CatalogPage>> {
        let mut data = self.data();
        if data.pages.len() > 1 {
            data.pages.pop_front()
        } else {
            data.pages.front().cloned()
        }
    }
}

impl TransportPort for MockClient {
    async fn fetch_catalog_page(
        &self,
        request: PageRequest,
    ) -> Result<CatalogPage, TransportError> {
        self.page_offsets
            .lock()
            .expect("couldn't acquire mock lock")
            .push(request.offset);

        let gate = self
            .page_gate
            .lock()
            .expect("couldn't acquire mock lock")
            .clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.next_page() {
            Some(response) => response.into(),
            None => Err(TransportError::new("no mock page response")),
        }
    }

    async fn fetch_item_detail(&self, key: &str) -> Result<ItemDetail, TransportError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self
            .detail_delays
            .lock()
            .expect("couldn't acquire mock lock")
            .get(key)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let response = self.data().details.get(key).cloned();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed_details
            .lock()
            .expect("couldn't acquire mock lock")
            .push(key.to_string());

        match response {
            Some(response) => response.into(),
            None => Err(TransportError::new(format!("no mock response for '{key}'"))),
        }
    }
}

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use super::*;
    use crate::types::{CatalogItem, display_name};

    pub fn item(key: &str) -> CatalogItem {
        CatalogItem::new(key, format!("https://pokeapi.co/api/v2/pokemon/{key}/"))
    }

    pub fn detail(key: &str) -> ItemDetail {
        ItemDetail {
            key: key.to_string(),
            display_name: display_name(key),
            numeric_attributes: [("hp".to_string(), key.len() as i64)].into(),
            tags: vec!["normal".to_string()],
            ..Default::default()
        }
    }

    pub fn page(keys: &[&str]) -> CatalogPage {
        CatalogPage::new(keys.iter().map(|key| item(key)).collect())
    }

    /// A mock client serving `keys` as one page with a detail for each key
    pub fn seeded_client(keys: &[&str]) -> MockClient {
        let client = MockClient::new();
        client.push_page_response(Ok(page(keys)));
        for key in keys {
            client.set_detail_response(*key, Ok(detail(key)));
        }
        client
    }
}
