pub mod entry;
pub mod item;
pub mod room;

pub use entry::Entry;
pub use item::Item;
pub use room::Room;
