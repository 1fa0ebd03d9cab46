pub mod sqlite;

use crate::app::Result;
use crate::domain::Room;

pub use sqlite::SqliteStore;

/// Persistent state of the bot: seen feed items and subscribed rooms.
///
/// Every mutation is committed before the method returns.
pub trait Store {
    // Item operations
    fn has_seen(&self, item_id: &str) -> Result<bool>;
    /// No-op when the item is already recorded.
    fn mark_seen(&self, item_id: &str) -> Result<()>;

    // Room operations
    fn is_subscribed(&self, room_id: &str) -> Result<bool>;
    /// Returns `false` if the room was already subscribed.
    fn subscribe(&self, room_id: &str) -> Result<bool>;
    /// Returns `false` if the room was not subscribed.
    fn unsubscribe(&self, room_id: &str) -> Result<bool>;
    fn list_subscribers(&self) -> Result<Vec<Room>>;
}
