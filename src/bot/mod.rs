//! The bot's main loop.
//!
//! Starts the feed poller in the background and then serves the chat
//! transport's receive loop forever: invitations are accepted, recognized
//! commands go to the subscription handler.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::app::AppContext;
use crate::commands::CommandRegistry;
use crate::poller::FeedPoller;
use crate::store::SqliteStore;
use crate::subscription::SubscriptionHandler;
use crate::transport::InboundEvent;

/// Pause before retrying a failed sync.
pub const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct Bot {
    ctx: Arc<AppContext>,
    commands: CommandRegistry,
    subscriptions: SubscriptionHandler<SqliteStore>,
    /// Invitations whose join failed, retried after every sync.
    pending_joins: Mutex<HashSet<String>>,
}

impl Bot {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let commands = CommandRegistry::with_default_commands(&ctx.config.matrix.command_prefix);
        let subscriptions = SubscriptionHandler::new(ctx.store.clone(), ctx.transport.clone());

        Self {
            ctx,
            commands,
            subscriptions,
            pending_joins: Mutex::new(HashSet::new()),
        }
    }

    /// Set the display name and spawn the feed poller.
    ///
    /// The poller holds its own handles on the store; pass the returned
    /// handle to [`stop_poller`] before closing the store.
    pub async fn start(&self) -> JoinHandle<()> {
        let display_name = &self.ctx.config.matrix.display_name;
        if let Err(e) = self.ctx.transport.set_display_name(display_name).await {
            warn!("Failed to set display name: {}", e);
        }

        let poller = self.spawn_poller();
        info!("Bot started as {}", self.ctx.transport.user_id());
        poller
    }

    /// Serve the receive loop until the process exits.
    pub async fn serve(&self) {
        loop {
            match self.ctx.transport.next_events().await {
                Ok(events) => {
                    for event in events {
                        self.handle_event(event).await;
                    }
                }
                Err(e) => {
                    error!("Sync failed: {}", e);
                    sleep(SYNC_RETRY_DELAY).await;
                }
            }
            self.retry_pending_joins().await;
        }
    }

    fn spawn_poller(&self) -> JoinHandle<()> {
        let feed = &self.ctx.config.feed;
        let poller = FeedPoller::new(
            feed.url.clone(),
            Duration::from_secs(feed.poll_interval_secs),
            self.ctx.store.clone(),
            self.ctx.fetcher.clone(),
            self.ctx.transport.clone(),
        );

        tokio::spawn(poller.run())
    }

    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Invite { room_id } => self.join(room_id).await,
            InboundEvent::Message {
                room_id,
                sender,
                body,
            } => {
                let Some(command) = self.commands.parse(&body) else {
                    return;
                };
                if let Err(e) = self.subscriptions.handle(command, &room_id, &sender).await {
                    error!("Failed to handle {:?} in {}: {}", command, room_id, e);
                }
            }
        }
    }

    /// Retry every invitation whose join has failed so far.
    pub async fn retry_pending_joins(&self) {
        let rooms: Vec<String> = match self.pending_joins.lock() {
            Ok(mut pending) => pending.drain().collect(),
            Err(e) => {
                error!("Pending join list poisoned: {}", e);
                return;
            }
        };

        for room_id in rooms {
            self.join(room_id).await;
        }
    }

    /// Number of invitations still waiting for a successful join.
    pub fn pending_join_count(&self) -> usize {
        self.pending_joins.lock().map(|p| p.len()).unwrap_or(0)
    }

    async fn join(&self, room_id: String) {
        match self.ctx.transport.join_room(&room_id).await {
            Ok(()) => info!("Joined room {}", room_id),
            Err(e) => {
                warn!("Failed to join {}, will retry: {}", room_id, e);
                if let Ok(mut pending) = self.pending_joins.lock() {
                    pending.insert(room_id);
                }
            }
        }
    }
}

/// Abort the poller and wait until it has released its handles.
pub async fn stop_poller(poller: JoinHandle<()>) {
    poller.abort();
    match poller.await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!("Feed poller panicked: {}", e),
    }
}
