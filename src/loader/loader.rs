use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use super::document::{parse_body, FeedDocument};
use super::error::LoadError;
use super::source::JsonSource;

/// Observable outcome of the latest issued load.
pub enum LoadState<T> {
    Loading,
    Failed(LoadError),
    Ready(Arc<T>),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready(data) => Some(data.as_ref()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Failed(_) => "error",
            Self::Ready(_) => "data",
        }
    }
}

impl<T> From<Result<T, LoadError>> for LoadState<T> {
    fn from(result: Result<T, LoadError>) -> Self {
        match result {
            Ok(document) => Self::Ready(Arc::new(document)),
            Err(err) => Self::Failed(err),
        }
    }
}

impl<T> Clone for LoadState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Loading => Self::Loading,
            Self::Failed(err) => Self::Failed(err.clone()),
            Self::Ready(data) => Self::Ready(Arc::clone(data)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LoadState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("Loading"),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Self::Ready(data) => f.debug_tuple("Ready").field(data).finish(),
        }
    }
}

/// Identity of one issued request. Only the ticket matching the latest
/// generation may publish a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// What one ticket produced, and whether it became the published state.
#[derive(Debug)]
pub struct Outcome<T> {
    pub published: bool,
    pub state: LoadState<T>,
}

/// What subscribers observe: the generation and locator of the latest
/// request along with its state.
#[derive(Debug)]
pub struct LoadStatus<T> {
    pub generation: u64,
    pub locator: Option<String>,
    pub state: LoadState<T>,
}

/// Loads a JSON document, exposing loading / error / data and discarding any
/// result whose request has been superseded (last request wins).
pub struct AsyncLoader<T> {
    source: Arc<dyn JsonSource>,
    status: watch::Sender<LoadStatus<T>>,
}

impl<T: FeedDocument> AsyncLoader<T> {
    pub fn new(source: Arc<dyn JsonSource>) -> Self {
        let (status, _) = watch::channel(LoadStatus {
            generation: 0,
            locator: None,
            state: LoadState::Loading,
        });
        Self { source, status }
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadStatus<T>> {
        self.status.subscribe()
    }

    pub fn state(&self) -> LoadState<T> {
        self.status.borrow().state.clone()
    }

    pub fn locator(&self) -> Option<String> {
        self.status.borrow().locator.clone()
    }

    /// Start a new request for `locator`. Every earlier ticket is invalidated.
    /// The ticket must be driven by `run` or `complete`, otherwise waiters on
    /// `settled` never wake.
    pub(crate) fn issue(&self, locator: &str) -> Ticket {
        let mut ticket = Ticket(0);
        self.status.send_modify(|status| {
            status.generation += 1;
            status.locator = Some(locator.to_string());
            status.state = LoadState::Loading;
            ticket = Ticket(status.generation);
        });
        tracing::debug!(generation = ticket.0, %locator, "Load issued");
        ticket
    }

    /// Publish the outcome for `ticket`. Returns false, leaving state
    /// untouched, when the ticket is stale or already settled.
    pub(crate) fn complete(&self, ticket: Ticket, result: Result<T, LoadError>) -> bool {
        self.publish(ticket, result.into())
    }

    fn publish(&self, ticket: Ticket, state: LoadState<T>) -> bool {
        let mut latest = 0;
        let applied = self.status.send_if_modified(|status| {
            latest = status.generation;
            if status.generation != ticket.0 || !status.state.is_loading() {
                return false;
            }
            status.state = state.clone();
            true
        });

        if !applied {
            tracing::debug!(
                generation = ticket.0,
                latest,
                "Discarding result of superseded load"
            );
        }
        applied
    }

    /// Fetch and decode for an issued ticket, then publish it if still current.
    /// The outcome carries the ticket's own state either way.
    pub(crate) async fn run(&self, ticket: Ticket, locator: &str) -> Outcome<T> {
        let mut guard = PendingLoad {
            loader: self,
            ticket,
            settled: false,
        };

        let state = LoadState::from(self.fetch_document(locator).await);

        guard.settled = true;
        let published = self.publish(ticket, state.clone());
        Outcome { published, state }
    }

    /// Like [`run`](Self::run), but when `locator` fails for any reason the
    /// same ticket tries `fallback` once before publishing.
    pub(crate) async fn run_with_fallback(
        &self,
        ticket: Ticket,
        locator: &str,
        fallback: &str,
    ) -> Outcome<T> {
        let mut guard = PendingLoad {
            loader: self,
            ticket,
            settled: false,
        };

        let mut result = self.fetch_document(locator).await;
        if result.is_err() && self.is_current(ticket) {
            tracing::info!(%locator, %fallback, "Trying fallback document");
            result = self.fetch_document(fallback).await;
        }

        let state = LoadState::from(result);
        guard.settled = true;
        let published = self.publish(ticket, state.clone());
        Outcome { published, state }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.status.borrow().generation == ticket.0
    }

    async fn fetch_document(&self, locator: &str) -> Result<T, LoadError> {
        let result = match self.source.fetch(locator).await {
            Ok(body) => parse_body::<T>(&body),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            tracing::warn!(%locator, kind = err.kind(), error = %err, "Load failed");
        }
        result
    }

    /// Issue and run a request, returning its own outcome. A newer request
    /// still owns the published state; this caller just keeps what it asked for.
    pub async fn load(&self, locator: &str) -> LoadState<T> {
        let ticket = self.issue(locator);
        self.run(ticket, locator).await.state
    }

    /// Issue against `locator`, falling back to `fallback` on failure.
    pub async fn load_with_fallback(&self, locator: &str, fallback: &str) -> LoadState<T> {
        let ticket = self.issue(locator);
        self.run_with_fallback(ticket, locator, fallback)
            .await
            .state
    }

    /// Wait for the current request to reach data or error.
    pub async fn settled(&self) -> LoadState<T> {
        let mut rx = self.status.subscribe();
        let settled = rx
            .wait_for(|status| !status.state.is_loading())
            .await
            .map(|status| status.state.clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }
}

/// Settles the ticket with an error if the load future is dropped before it
/// publishes, so waiters on this generation are not left hanging.
struct PendingLoad<'a, T: FeedDocument> {
    loader: &'a AsyncLoader<T>,
    ticket: Ticket,
    settled: bool,
}

impl<T: FeedDocument> Drop for PendingLoad<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.loader.complete(
                self.ticket,
                Err(LoadError::unreachable("load abandoned before completion")),
            );
        }
    }
}
