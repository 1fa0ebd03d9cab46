use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use tracing::debug;

use crate::app::{BotError, Result};
use crate::domain::{Item, Room};
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Flush and close the underlying connection.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| BotError::LockPoisoned(e.to_string()))?;
        conn.close().map_err(|(_, e)| BotError::Database(e))?;
        debug!("Store closed");
        Ok(())
    }

    /// Look up a seen item by its external identifier.
    pub fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                "SELECT id, item_id FROM item WHERE item_id = ?1",
                params![item_id],
                |row| {
                    Ok(Item {
                        id: row.get(0)?,
                        item_id: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BotError::LockPoisoned(e.to_string()))
    }
}

impl Store for SqliteStore {
    fn has_seen(&self, item_id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM item WHERE item_id = ?1",
            params![item_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn mark_seen(&self, item_id: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO item (item_id) VALUES (?1)",
            params![item_id],
        )?;

        Ok(())
    }

    fn is_subscribed(&self, room_id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM room WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn subscribe(&self, room_id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO room (room_id) VALUES (?1)",
            params![room_id],
        )?;

        Ok(inserted > 0)
    }

    fn unsubscribe(&self, room_id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let deleted = conn.execute("DELETE FROM room WHERE room_id = ?1", params![room_id])?;

        Ok(deleted > 0)
    }

    fn list_subscribers(&self) -> Result<Vec<Room>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT room_id FROM room ORDER BY room_id")?;

        let rooms = stmt
            .query_map([], |row| {
                Ok(Room {
                    room_id: row.get(0)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rooms)
    }
}
