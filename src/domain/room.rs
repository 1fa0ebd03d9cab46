
/// A subscribed chat room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room {
    pub room_id: String,
}

impl Room {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
        }
    }
}
