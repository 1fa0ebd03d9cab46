//! # fefe-bot
//!
//! A Matrix bot that broadcasts a single RSS feed to subscribed rooms.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Poller → Store
//!                          ↓
//!            Transport ← Bot → Subscription handler → Store
//! ```
//!
//! - [`poller`]: polls the feed on a fixed interval and fans new entries out
//! - [`bot`]: receive loop; joins on invite and routes commands
//! - [`store`]: SQLite persistence of seen items and subscribed rooms
//!
//! Rooms opt in with `!sub` / `!subscribe` and out with `!unsub` / `!unsubscribe`.

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, chat transport.
pub mod app;

/// The dispatcher loop.
pub mod bot;

/// Command aliases and message parsing.
pub mod commands;

/// Configuration loaded from `~/.config/fefe-bot/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Entry`](domain::Entry): a parsed feed entry
/// - [`Item`](domain::Item): a seen entry, as stored
/// - [`Room`](domain::Room): a subscribed room
pub mod domain;

/// HTTP fetching with conditional request support.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Feed parsing.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into [`Entry`](domain::Entry) values.
pub mod normalizer;

pub mod poller;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

pub mod subscription;

/// Chat transport.
///
/// - [`ChatTransport`](transport::ChatTransport): what the bot needs from a chat network
/// - [`MatrixClient`](transport::MatrixClient): Matrix client-server API implementation
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
