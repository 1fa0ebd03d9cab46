
/// A feed entry the bot has already broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Auto-assigned row id.
    pub id: i64,
    /// The entry's external identifier, unique.
    pub item_id: String,
}
