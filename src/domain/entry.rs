/// A parsed feed entry, as it is broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// External identifier from the feed (guid / atom id / link). Empty when
    /// the entry carries nothing stable to identify it by.
    pub id: String,
    /// Message body, sent verbatim.
    pub summary: String,
}
