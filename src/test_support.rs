//! In-process fakes for the fetcher and chat transport.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{BotError, Result};
use crate::fetcher::{FetchResult, Fetcher};
use crate::transport::{ChatTransport, InboundEvent};

pub const BOT_USER: &str = "@bot:example.org";

/// Render an RSS document with `(guid, description)` items in the given order.
pub fn rss(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(guid, description)| {
            format!(
                "<item><guid>{}</guid><description>{}</description></item>",
                guid, description
            )
        })
        .collect();
    channel(&items)
}

/// Render an RSS document whose items carry no guid, only an optional link.
pub fn rss_without_guids(items: &[(Option<&str>, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(link, description)| {
            let link = link
                .map(|l| format!("<link>{}</link>", l))
                .unwrap_or_default();
            format!("<item>{}<description>{}</description></item>", link, description)
        })
        .collect();
    channel(&items)
}

fn channel(items: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test</title>{}</channel></rss>"#,
        items
    )
}

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Body(String),
    NotModified,
    Error(String),
}

/// Serves the same response on every fetch until told otherwise.
pub struct StaticFetcher {
    response: Mutex<FakeResponse>,
    calls: AtomicUsize,
    last_etag: Mutex<Option<String>>,
}

impl StaticFetcher {
    pub fn new(response: FakeResponse) -> Self {
        Self {
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
            last_etag: Mutex::new(None),
        }
    }

    pub fn with_body(body: impl Into<String>) -> Self {
        Self::new(FakeResponse::Body(body.into()))
    }

    pub fn set_response(&self, response: FakeResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `If-None-Match` validator sent with the latest request.
    pub fn last_etag(&self) -> Option<String> {
        self.last_etag.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(
        &self,
        _url: &str,
        etag: Option<&str>,
        _last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_etag.lock().unwrap() = etag.map(String::from);

        let response = self.response.lock().unwrap().clone();
        match response {
            FakeResponse::Body(body) => Ok(FetchResult::Content {
                body: body.into_bytes(),
                etag: Some("\"v1\"".to_string()),
                last_modified: None,
            }),
            FakeResponse::NotModified => Ok(FetchResult::NotModified),
            FakeResponse::Error(message) => Err(BotError::Other(message)),
        }
    }
}

/// Records everything the bot sends; serves queued event batches.
pub struct RecordingTransport {
    user_id: String,
    sent: Mutex<Vec<(String, String)>>,
    joined: Mutex<Vec<String>>,
    display_name: Mutex<Option<String>>,
    failing_rooms: Mutex<HashSet<String>>,
    failing_joins: Mutex<HashSet<String>>,
    events: Mutex<VecDeque<Vec<InboundEvent>>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new(BOT_USER)
    }
}

impl RecordingTransport {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            sent: Mutex::new(Vec::new()),
            joined: Mutex::new(Vec::new()),
            display_name: Mutex::new(None),
            failing_rooms: Mutex::new(HashSet::new()),
            failing_joins: Mutex::new(HashSet::new()),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Sent messages as `(room_id, text)`, in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, room_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(room, _)| room == room_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn joined(&self) -> Vec<String> {
        self.joined.lock().unwrap().clone()
    }

    pub fn display_name(&self) -> Option<String> {
        self.display_name.lock().unwrap().clone()
    }

    /// Make every send to `room_id` fail.
    pub fn fail_room(&self, room_id: &str) {
        self.failing_rooms.lock().unwrap().insert(room_id.to_string());
    }

    /// Make joining `room_id` fail until [`allow_join`](Self::allow_join).
    pub fn fail_join(&self, room_id: &str) {
        self.failing_joins.lock().unwrap().insert(room_id.to_string());
    }

    pub fn allow_join(&self, room_id: &str) {
        self.failing_joins.lock().unwrap().remove(room_id);
    }

    pub fn push_events(&self, events: Vec<InboundEvent>) {
        self.events.lock().unwrap().push_back(events);
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_message(&self, text: &str, room_id: &str) -> Result<()> {
        if self.failing_rooms.lock().unwrap().contains(room_id) {
            return Err(BotError::Matrix {
                status: 403,
                message: format!("M_FORBIDDEN: cannot send to {}", room_id),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((room_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        if self.failing_joins.lock().unwrap().contains(room_id) {
            return Err(BotError::Matrix {
                status: 502,
                message: format!("M_UNKNOWN: cannot join {}", room_id),
            });
        }
        self.joined.lock().unwrap().push(room_id.to_string());
        Ok(())
    }

    async fn set_display_name(&self, name: &str) -> Result<()> {
        *self.display_name.lock().unwrap() = Some(name.to_string());
        Ok(())
    }

    async fn next_events(&self) -> Result<Vec<InboundEvent>> {
        let batch = self.events.lock().unwrap().pop_front();
        match batch {
            Some(events) => Ok(events),
            None => std::future::pending().await,
        }
    }
}
