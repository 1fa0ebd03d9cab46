//! Periodic feed polling and fan-out to subscribed rooms.
//!
//! Each cycle fetches the feed, walks its entries oldest-first and, for every
//! entry not seen before, records it and sends its summary to each subscribed
//! room. An entry is committed as seen before it is broadcast, so a failed
//! send never leads to the same entry being broadcast twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::app::{BotError, Result};
use crate::domain::Entry;
use crate::fetcher::{FetchResult, Fetcher};
use crate::normalizer::Normalizer;
use crate::store::Store;
use crate::transport::ChatTransport;

/// Result of a single poll cycle.
#[derive(Debug)]
pub enum PollOutcome {
    /// Entries broadcast during this cycle, oldest first. May be empty.
    Delivered(Vec<Entry>),
    /// The server reported the feed unchanged.
    NotModified,
    FetchFailed(BotError),
    ParseFailed(BotError),
    /// A store or send error aborted the cycle after `delivered` went out.
    DispatchFailed {
        delivered: Vec<Entry>,
        error: BotError,
    },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Delivered(_) | PollOutcome::NotModified)
    }
}

/// HTTP validators from the last fully processed response.
#[derive(Debug, Default)]
struct Validators {
    etag: Option<String>,
    last_modified: Option<String>,
}

pub struct FeedPoller<S: Store + Send + Sync + 'static> {
    feed_url: String,
    interval: Duration,
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    transport: Arc<dyn ChatTransport + Send + Sync>,
    validators: Validators,
}

impl<S: Store + Send + Sync + 'static> FeedPoller<S> {
    pub fn new(
        feed_url: impl Into<String>,
        interval: Duration,
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        transport: Arc<dyn ChatTransport + Send + Sync>,
    ) -> Self {
        Self {
            feed_url: feed_url.into(),
            interval,
            store,
            fetcher,
            normalizer: Normalizer::new(),
            transport,
            validators: Validators::default(),
        }
    }

    /// Poll forever, sleeping `interval` after every cycle whatever its outcome.
    pub async fn run(mut self) {
        info!(
            "Feed poller started for {} (interval: {} seconds)",
            self.feed_url,
            self.interval.as_secs()
        );

        loop {
            let outcome = self.poll_once().await;
            self.log_outcome(&outcome);
            sleep(self.interval).await;
        }
    }

    /// Run a single fetch-diff-broadcast cycle.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let result = match self
            .fetcher
            .fetch(
                &self.feed_url,
                self.validators.etag.as_deref(),
                self.validators.last_modified.as_deref(),
            )
            .await
        {
            Ok(result) => result,
            Err(e) => return PollOutcome::FetchFailed(e),
        };

        let (body, etag, last_modified) = match result {
            FetchResult::NotModified => return PollOutcome::NotModified,
            FetchResult::Content {
                body,
                etag,
                last_modified,
            } => (body, etag, last_modified),
        };

        let entries = match self.normalizer.normalize(&body) {
            Ok(entries) => entries,
            Err(e) => return PollOutcome::ParseFailed(e),
        };

        // Feeds list newest first; subscribers get publication order.
        let mut delivered = Vec::new();
        for entry in entries.into_iter().rev() {
            match self.dispatch(&entry).await {
                Ok(true) => delivered.push(entry),
                Ok(false) => {}
                Err(error) => return PollOutcome::DispatchFailed { delivered, error },
            }
        }

        // Only a fully processed body may be skipped via 304 next time.
        self.validators = Validators {
            etag,
            last_modified,
        };

        PollOutcome::Delivered(delivered)
    }

    /// Broadcast `entry` unless it was seen before. Returns whether it was new.
    async fn dispatch(&self, entry: &Entry) -> Result<bool> {
        if entry.id.is_empty() {
            warn!("Skipping feed entry without an identifier");
            return Ok(false);
        }

        if self.store.has_seen(&entry.id)? {
            return Ok(false);
        }
        self.store.mark_seen(&entry.id)?;

        let rooms = self.store.list_subscribers()?;
        debug!("Broadcasting {} to {} rooms", entry.id, rooms.len());

        for room in rooms {
            self.transport
                .send_message(&entry.summary, &room.room_id)
                .await?;
        }

        Ok(true)
    }

    fn log_outcome(&self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::Delivered(entries) if entries.is_empty() => {
                debug!("No new entries in {}", self.feed_url)
            }
            PollOutcome::Delivered(entries) => {
                info!("Broadcast {} new entries from {}", entries.len(), self.feed_url)
            }
            PollOutcome::NotModified => debug!("Feed {} not modified", self.feed_url),
            PollOutcome::FetchFailed(e) => error!("Failed to fetch {}: {}", self.feed_url, e),
            PollOutcome::ParseFailed(e) => error!("Failed to parse {}: {}", self.feed_url, e),
            PollOutcome::DispatchFailed { delivered, error } => error!(
                "Broadcast aborted after {} entries: {}",
                delivered.len(),
                error
            ),
        }
    }
}
