use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use perkdir_client::PerkRecord;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};

use crate::backend::{BackendResult, DirectoryBackend};
use crate::state::{
    distinct_merchants, DirectoryViewSnapshot, DirectoryViewState, FilterQuery, LOADING_INDICATOR,
    NAME_INPUT_PLACEHOLDER,
};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const INPUT_BUFFER: usize = 64;

type SearchFuture = Pin<Box<dyn Future<Output = BackendResult<Vec<PerkRecord>>> + Send>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory controller is no longer running")]
    Closed,
    #[error("timed out waiting for the directory to settle")]
    SettleTimeout,
}

/// Simulated user input events, in the order the page receives them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryInput {
    NameInput(String),
    MerchantSelected(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryOptions {
    pub debounce: Duration,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

enum Wake {
    Input(Option<DirectoryInput>),
    Debounce,
    Fetched(u64, BackendResult<Vec<PerkRecord>>),
}

/// The directory page's controller loop. One task per mounted page; inputs
/// arrive over a channel and every observable transition is published as a
/// fresh snapshot.
///
/// Race safety: each effective filter edit bumps a generation counter, so a
/// response belongs to the current query only if its generation still
/// matches on arrival. Superseded responses are discarded no matter when
/// they arrive, and at most one search is outstanding at a time.
pub struct DirectoryController {
    backend: Arc<dyn DirectoryBackend>,
    options: DirectoryOptions,
    state: DirectoryViewState,
    filter: FilterQuery,
    generation: u64,
    summary_count: Option<usize>,
    merchant_options: Vec<String>,
    options_captured: bool,
    load_error: Option<String>,
    snapshot_tx: watch::Sender<DirectoryViewSnapshot>,
    input_rx: mpsc::Receiver<DirectoryInput>,
}

impl DirectoryController {
    /// Mounts the page: spawns the event loop and returns the driver handle.
    pub fn spawn(backend: Arc<dyn DirectoryBackend>, options: DirectoryOptions) -> DirectoryHandle {
        let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(DirectoryViewSnapshot {
            indicator: Some(LOADING_INDICATOR),
            summary: None,
            result_count: None,
            visible_titles: Vec::new(),
            merchant_options: Vec::new(),
            name_placeholder: NAME_INPUT_PLACEHOLDER,
            load_error: None,
        });
        let controller = Self {
            backend,
            options,
            state: DirectoryViewState::Loading,
            filter: FilterQuery::default(),
            generation: 0,
            summary_count: None,
            merchant_options: Vec::new(),
            options_captured: false,
            load_error: None,
            snapshot_tx,
            input_rx,
        };
        let task = tokio::spawn(controller.run());
        DirectoryHandle {
            input_tx,
            snapshot_rx,
            task,
        }
    }

    async fn run(mut self) {
        // Mount: one unfiltered listing query resolves before any input is
        // honored; inputs sent meanwhile queue on the channel.
        let mount_generation = self.generation;
        let query = self.filter.clone();
        let outcome = self.backend.fetch(&query).await;
        self.complete_fetch(mount_generation, outcome);

        let mut pending: Option<Instant> = None;
        let mut in_flight: Option<(u64, SearchFuture)> = None;

        loop {
            let wake = match (in_flight.as_mut(), pending) {
                (Some((generation, future)), Some(deadline)) => tokio::select! {
                    maybe_input = self.input_rx.recv() => Wake::Input(maybe_input),
                    _ = sleep_until(deadline) => Wake::Debounce,
                    outcome = future.as_mut() => Wake::Fetched(*generation, outcome),
                },
                (Some((generation, future)), None) => tokio::select! {
                    maybe_input = self.input_rx.recv() => Wake::Input(maybe_input),
                    outcome = future.as_mut() => Wake::Fetched(*generation, outcome),
                },
                (None, Some(deadline)) => tokio::select! {
                    maybe_input = self.input_rx.recv() => Wake::Input(maybe_input),
                    _ = sleep_until(deadline) => Wake::Debounce,
                },
                (None, None) => Wake::Input(self.input_rx.recv().await),
            };

            match wake {
                Wake::Input(None) => break,
                Wake::Input(Some(input)) => {
                    if self.apply_input(input) {
                        pending = Some(Instant::now() + self.options.debounce);
                    }
                }
                Wake::Debounce => {
                    pending = None;
                    // Replaces any still-outstanding search; its response is
                    // already stale by generation.
                    in_flight = Some(self.issue_search());
                }
                Wake::Fetched(generation, outcome) => {
                    in_flight = None;
                    self.complete_fetch(generation, outcome);
                }
            }
        }
    }

    /// Applies one input event; returns whether it changed the effective
    /// filter. An effective change supersedes whatever query was current and
    /// shows the searching indicator over the still-visible previous items.
    fn apply_input(&mut self, input: DirectoryInput) -> bool {
        let changed = match input {
            DirectoryInput::NameInput(raw) => self.filter.set_name(&raw),
            DirectoryInput::MerchantSelected(selection) => self.filter.set_merchant(selection),
        };
        if !changed {
            return false;
        }
        self.generation += 1;
        let previous_items = self.state.visible_items().to_vec();
        self.state = DirectoryViewState::Searching { previous_items };
        self.publish();
        true
    }

    fn issue_search(&self) -> (u64, SearchFuture) {
        let generation = self.generation;
        let backend = Arc::clone(&self.backend);
        let query = self.filter.clone();
        tracing::debug!(generation, ?query, "issuing directory search");
        (
            generation,
            Box::pin(async move { backend.fetch(&query).await }),
        )
    }

    fn complete_fetch(&mut self, generation: u64, outcome: BackendResult<Vec<PerkRecord>>) {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "discarding a response that arrived for a superseded query"
            );
            return;
        }
        match outcome {
            Ok(items) => {
                self.load_error = None;
                if !self.options_captured {
                    // The combobox is populated from the first full page and
                    // stays stable while filters narrow the listing.
                    self.merchant_options = distinct_merchants(&items);
                    self.options_captured = true;
                }
                let result_count = items.len();
                self.summary_count = Some(result_count);
                self.state = DirectoryViewState::Ready {
                    items,
                    result_count,
                };
            }
            Err(error) => {
                tracing::warn!(error = %error, "directory query failed");
                self.load_error = Some(error.to_string());
                let items = self.state.visible_items().to_vec();
                let result_count = self.summary_count.unwrap_or(0);
                self.state = DirectoryViewState::Ready {
                    items,
                    result_count,
                };
            }
        }
        self.publish();
    }

    fn publish(&self) {
        let snapshot = DirectoryViewSnapshot {
            indicator: self.state.indicator(),
            summary: self.summary_count.map(|count| format!("Showing {count} perks")),
            result_count: self.summary_count,
            visible_titles: self
                .state
                .visible_items()
                .iter()
                .map(|record| record.title.clone())
                .collect(),
            merchant_options: self.merchant_options.clone(),
            name_placeholder: NAME_INPUT_PLACEHOLDER,
            load_error: self.load_error.clone(),
        };
        let _ = self.snapshot_tx.send(snapshot);
    }
}

/// Driver-side handle to a mounted directory page.
pub struct DirectoryHandle {
    input_tx: mpsc::Sender<DirectoryInput>,
    snapshot_rx: watch::Receiver<DirectoryViewSnapshot>,
    task: JoinHandle<()>,
}

impl DirectoryHandle {
    pub async fn enter_name(&self, text: impl Into<String>) -> Result<(), DirectoryError> {
        self.input_tx
            .send(DirectoryInput::NameInput(text.into()))
            .await
            .map_err(|_| DirectoryError::Closed)
    }

    pub async fn select_merchant(&self, merchant: Option<String>) -> Result<(), DirectoryError> {
        self.input_tx
            .send(DirectoryInput::MerchantSelected(merchant))
            .await
            .map_err(|_| DirectoryError::Closed)
    }

    /// The latest published view snapshot.
    pub fn snapshot(&self) -> DirectoryViewSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Waits until no loading or searching indicator is showing.
    pub async fn settled(&mut self, wait: Duration) -> Result<DirectoryViewSnapshot, DirectoryError> {
        timeout(wait, async {
            loop {
                let snapshot = self.snapshot_rx.borrow_and_update().clone();
                if snapshot.is_settled() {
                    return Ok(snapshot);
                }
                self.snapshot_rx
                    .changed()
                    .await
                    .map_err(|_| DirectoryError::Closed)?;
            }
        })
        .await
        .map_err(|_| DirectoryError::SettleTimeout)?
    }

    /// Waits for a just-submitted effective edit to be acknowledged as a
    /// search and for that search to resolve.
    pub async fn search_settled(
        &mut self,
        wait: Duration,
    ) -> Result<DirectoryViewSnapshot, DirectoryError> {
        timeout(wait, async {
            loop {
                let snapshot = self.snapshot_rx.borrow_and_update().clone();
                if !snapshot.is_settled() {
                    break;
                }
                self.snapshot_rx
                    .changed()
                    .await
                    .map_err(|_| DirectoryError::Closed)?;
            }
            loop {
                let snapshot = self.snapshot_rx.borrow_and_update().clone();
                if snapshot.is_settled() {
                    return Ok(snapshot);
                }
                self.snapshot_rx
                    .changed()
                    .await
                    .map_err(|_| DirectoryError::Closed)?;
            }
        })
        .await
        .map_err(|_| DirectoryError::SettleTimeout)?
    }

    /// Unmounts the page and waits for the controller loop to finish.
    pub async fn shut_down(self) {
        drop(self.input_tx);
        let _ = self.task.await;
    }
}
