//! Minimal Matrix client-server API client.
//!
//! Covers exactly what the bot needs: identity lookup, long-poll sync,
//! joining on invite, sending text messages and setting the display name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::app::{BotError, Result};
use crate::transport::{ChatTransport, InboundEvent};

/// Server-side long-poll duration for `/sync`.
const SYNC_TIMEOUT_MS: u64 = 30_000;

/// Must exceed the sync long-poll.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("fefe-bot/", env!("CARGO_PKG_VERSION"));

pub struct MatrixClient {
    client: Client,
    homeserver: Url,
    access_token: String,
    user_id: String,
    next_batch: Mutex<Option<String>>,
    txn_counter: AtomicU64,
}

impl MatrixClient {
    /// Connect to the homeserver and resolve the account behind `access_token`.
    pub async fn connect(homeserver: &str, access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        let mut matrix = Self {
            client,
            homeserver: Url::parse(homeserver)?,
            access_token: access_token.to_string(),
            user_id: String::new(),
            next_batch: Mutex::new(None),
            txn_counter: AtomicU64::new(0),
        };

        let response = matrix
            .client
            .get(matrix.endpoint(&["account", "whoami"])?)
            .bearer_auth(&matrix.access_token)
            .send()
            .await?;
        let whoami: WhoAmI = Self::check(response).await?.json().await?;
        debug!("Logged in as {}", whoami.user_id);
        matrix.user_id = whoami.user_id;

        Ok(matrix)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.homeserver.clone();
        url.path_segments_mut()
            .map_err(|_| BotError::Other(format!("Invalid homeserver URL: {}", self.homeserver)))?
            .pop_if_empty()
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        Ok(url)
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("fefe{}.{}", Utc::now().timestamp_millis(), n)
    }

    /// Turn a non-success response into `BotError::Matrix`.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => format!("{}: {}", body.errcode, body.error),
            Err(_) => text,
        };

        Err(BotError::Matrix {
            status: status.as_u16(),
            message,
        })
    }

    fn since(&self) -> Result<Option<String>> {
        self.next_batch
            .lock()
            .map(|guard| guard.clone())
            .map_err(|e| BotError::LockPoisoned(e.to_string()))
    }

    fn set_since(&self, token: String) -> Result<()> {
        let mut guard = self
            .next_batch
            .lock()
            .map_err(|e| BotError::LockPoisoned(e.to_string()))?;
        *guard = Some(token);
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MatrixClient {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_message(&self, text: &str, room_id: &str) -> Result<()> {
        let txn_id = self.next_txn_id();
        let url = self.endpoint(&["rooms", room_id, "send", "m.room.message", txn_id.as_str()])?;

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "msgtype": "m.text", "body": text }))
            .send()
            .await?;
        Self::check(response).await?;

        debug!("Sent message to {}", room_id);
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&["join", room_id])?)
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_display_name(&self, name: &str) -> Result<()> {
        let url = self.endpoint(&["profile", self.user_id.as_str(), "displayname"])?;

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "displayname": name }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn next_events(&self) -> Result<Vec<InboundEvent>> {
        let since = self.since()?;
        // The first sync only establishes a position; its timeline is history.
        let initial = since.is_none();

        let mut url = self.endpoint(&["sync"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(ref since) = since {
                query.append_pair("since", since);
                query.append_pair("timeout", &SYNC_TIMEOUT_MS.to_string());
            } else {
                query.append_pair("timeout", "0");
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let sync: SyncResponse = Self::check(response).await?.json().await?;

        self.set_since(sync.next_batch.clone())?;
        Ok(sync.into_events(initial))
    }
}

#[derive(Debug, Deserialize)]
struct WhoAmI {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errcode: String,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct SyncResponse {
    next_batch: String,
    #[serde(default)]
    rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
struct SyncRooms {
    #[serde(default)]
    join: HashMap<String, JoinedRoom>,
    #[serde(default)]
    invite: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct JoinedRoom {
    #[serde(default)]
    timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
struct Timeline {
    #[serde(default)]
    events: Vec<RoomEvent>,
}

#[derive(Debug, Deserialize)]
struct RoomEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    content: Value,
}

impl RoomEvent {
    fn text_body(&self) -> Option<&str> {
        if self.kind != "m.room.message" {
            return None;
        }
        if self.content.get("msgtype").and_then(Value::as_str) != Some("m.text") {
            return None;
        }
        self.content.get("body").and_then(Value::as_str)
    }
}

impl SyncResponse {
    fn into_events(self, initial: bool) -> Vec<InboundEvent> {
        let mut events: Vec<InboundEvent> = self
            .rooms
            .invite
            .into_keys()
            .map(|room_id| InboundEvent::Invite { room_id })
            .collect();

        if initial {
            return events;
        }

        for (room_id, room) in self.rooms.join {
            for event in room.timeline.events {
                if let Some(body) = event.text_body() {
                    events.push(InboundEvent::Message {
                        room_id: room_id.clone(),
                        sender: event.sender.clone(),
                        body: body.to_string(),
                    });
                }
            }
        }

        events
    }
}
