pub mod matrix;

use async_trait::async_trait;

use crate::app::Result;

pub use matrix::MatrixClient;

/// Something that happened in a room the bot can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The bot was invited to a room.
    Invite { room_id: String },
    /// A text message was posted to a joined room.
    Message {
        room_id: String,
        sender: String,
        body: String,
    },
}

#[async_trait]
pub trait ChatTransport {
    /// Identity of the bot account.
    fn user_id(&self) -> &str;

    fn is_own_user(&self, sender: &str) -> bool {
        sender == self.user_id()
    }

    async fn send_message(&self, text: &str, room_id: &str) -> Result<()>;

    async fn join_room(&self, room_id: &str) -> Result<()>;

    async fn set_display_name(&self, name: &str) -> Result<()>;

    /// Wait for the next batch of events.
    async fn next_events(&self) -> Result<Vec<InboundEvent>>;
}
