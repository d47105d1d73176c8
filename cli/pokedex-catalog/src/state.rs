//! Loading/success/error state shared with any number of observers.

use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Progress of the current pipeline run as seen by presentation.
///
/// At most one of the flags is set.
/// All flags are unset only before the first run begins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub is_loading: bool,
    pub is_success: bool,
    pub is_error: bool,
    /// The transport message of the failure while `is_error` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ViewState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn success() -> Self {
        Self {
            is_success: true,
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: true,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success || self.is_error
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    current: ViewState,
    subscribers: Vec<UnboundedSender<ViewState>>,
}

/// The single source of truth for [ViewState].
///
/// Transitions are applied and fanned out to subscribers under one lock,
/// so every subscriber receives the same sequence.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: Mutex<StoreInner>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, next: ViewState) {
        let mut inner = self.lock();
        debug!(from = ?inner.current, to = ?next, "view state transition");
        // drop subscribers whose receiving end is gone
        inner
            .subscribers
            .retain(|tx| tx.send(next.clone()).is_ok());
        inner.current = next;
    }

    pub fn set_loading(&self) {
        self.transition(ViewState::loading());
    }

    pub fn set_success(&self) {
        self.transition(ViewState::success());
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.transition(ViewState::error(message));
    }

    /// Return to the state before the first run.
    pub fn reset(&self) {
        self.transition(ViewState::idle());
    }

    pub fn current(&self) -> ViewState {
        self.lock().current.clone()
    }

    /// Receive every transition made after this call.
    ///
    /// The stream ends once the store is dropped.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        Subscription { rx }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// A stream of [ViewState] transitions.
#[derive(Debug)]
pub struct Subscription {
    rx: UnboundedReceiver<ViewState>,
}

impl Subscription {
    /// The next transition if one is already queued.
    pub fn try_next(&mut self) -> Option<ViewState> {
        self.rx.try_recv().ok()
    }

    /// All transitions queued so far.
    pub fn drain(&mut self) -> Vec<ViewState> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

impl Stream for Subscription {
    type Item = ViewState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starts_idle() {
        let store = StateStore::new();
        let state = store.current();
        assert_eq!(state, ViewState::idle());
        assert!(!state.is_loading && !state.is_success && !state.is_error);
    }

    #[test]
    fn flags_are_exclusive() {
        for state in [
            ViewState::loading(),
            ViewState::success(),
            ViewState::error("x"),
        ] {
            let set = [state.is_loading, state.is_success, state.is_error]
                .into_iter()
                .filter(|flag| *flag)
                .count();
            assert_eq!(set, 1, "{state:?}");
        }
    }

    #[test]
    fn error_after_success_is_observable() {
        let store = StateStore::new();
        let mut subscription = store.subscribe();
        store.set_loading();
        store.set_success();
        store.set_error("late failure");

        assert_eq!(store.current(), ViewState::error("late failure"));
        assert_eq!(subscription.drain(), vec![
            ViewState::loading(),
            ViewState::success(),
            ViewState::error("late failure"),
        ]);
    }

    #[tokio::test]
    async fn all_subscribers_see_the_same_sequence() {
        let store = StateStore::new();
        let first = store.subscribe();
        let second = store.subscribe();

        store.set_loading();
        store.set_error("timeout");
        store.set_loading();
        store.set_success();
        drop(store);

        let first = first.collect::<Vec<_>>().await;
        let second = second.collect::<Vec<_>>().await;
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn late_subscriber_only_sees_later_transitions() {
        let store = StateStore::new();
        store.set_loading();
        let mut subscription = store.subscribe();
        store.set_success();
        assert_eq!(subscription.drain(), vec![ViewState::success()]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = StateStore::new();
        let subscription = store.subscribe();
        let _kept = store.subscribe();
        drop(subscription);

        store.set_loading();
        assert_eq!(store.subscriber_count(), 1);
    }
}
