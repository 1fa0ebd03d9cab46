use std::sync::Arc;

use tracing::{debug, info};

use crate::app::Result;
use crate::commands::Command;
use crate::store::Store;
use crate::transport::ChatTransport;

/// What the bot answered to a subscription command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionReply {
    Subscribed,
    AlreadySubscribed,
    Unsubscribed,
    NotSubscribed,
}

impl SubscriptionReply {
    pub fn message(&self) -> &'static str {
        match self {
            SubscriptionReply::Subscribed => "You have subscribed successfully!",
            SubscriptionReply::AlreadySubscribed => "You have already subscribed!",
            SubscriptionReply::Unsubscribed => "You have successfully unsubscribed",
            SubscriptionReply::NotSubscribed => "You haven't subscribed yet!",
        }
    }
}

pub struct SubscriptionHandler<S: Store + Send + Sync + 'static> {
    store: Arc<S>,
    transport: Arc<dyn ChatTransport + Send + Sync>,
}

impl<S: Store + Send + Sync + 'static> SubscriptionHandler<S> {
    pub fn new(store: Arc<S>, transport: Arc<dyn ChatTransport + Send + Sync>) -> Self {
        Self { store, transport }
    }

    /// Apply `command` for `room_id` and confirm it in that room.
    ///
    /// Returns `None` without touching the store when the bot itself sent the
    /// command.
    pub async fn handle(
        &self,
        command: Command,
        room_id: &str,
        sender: &str,
    ) -> Result<Option<SubscriptionReply>> {
        if self.transport.is_own_user(sender) {
            debug!("Ignoring {:?} sent by the bot itself", command);
            return Ok(None);
        }

        // The store commits before the confirmation goes out.
        let reply = match command {
            Command::Subscribe => {
                if self.store.subscribe(room_id)? {
                    SubscriptionReply::Subscribed
                } else {
                    SubscriptionReply::AlreadySubscribed
                }
            }
            Command::Unsubscribe => {
                if self.store.unsubscribe(room_id)? {
                    SubscriptionReply::Unsubscribed
                } else {
                    SubscriptionReply::NotSubscribed
                }
            }
        };

        self.transport.send_message(reply.message(), room_id).await?;

        match reply {
            SubscriptionReply::Subscribed => info!("Room {} has subscribed.", room_id),
            SubscriptionReply::Unsubscribed => info!("Room {} has unsubscribed.", room_id),
            _ => {}
        }

        Ok(Some(reply))
    }
}
