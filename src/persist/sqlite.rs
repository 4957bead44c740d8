//! SQLite-backed durable upload queue.
//!
//! The table is a plain key/value store: `firstKey` and `nextKey` hold the
//! queue bounds as decimal strings and every pending record lives under its
//! own decimal sequence key. Each mutation runs in one transaction, so the
//! bounds always agree with the stored entries after a crash.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

use crate::types::SeqKey;

use super::{PersistError, PersistResult, QueueError, QueueRecord, RecordQueue};

const FIRST_KEY: &str = "firstKey";
const NEXT_KEY: &str = "nextKey";

/// SQLite implementation of [`crate::persist::RecordQueue`].
pub struct SqliteQueue {
    conn: Connection,
}

impl SqliteQueue {
    /// Opens or creates a queue database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=FULL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory queue.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(Self { conn })
    }

    /// All pending records in queue order.
    pub fn pending(&self) -> PersistResult<Vec<QueueRecord>> {
        let (first, next) = bounds(&self.conn)?;
        let mut out = Vec::with_capacity(next.saturating_sub(first) as usize);
        for key in first..next {
            out.push(QueueRecord {
                key,
                payload: entry(&self.conn, key)?,
            });
        }
        Ok(out)
    }
}

impl RecordQueue for SqliteQueue {
    fn append(&mut self, payload: &str) -> PersistResult<SeqKey> {
        let tx = self.conn.transaction()?;
        let key = read_counter(&tx, NEXT_KEY)?;
        tx.execute(
            "INSERT INTO queue(key, value) VALUES (?1, ?2)",
            params![key.to_string(), payload],
        )?;
        write_counter(&tx, NEXT_KEY, key + 1)?;
        tx.commit()?;
        debug!(key, bytes = payload.len(), "queued record");
        Ok(key)
    }

    fn peek_first(&self) -> Result<QueueRecord, QueueError> {
        let (first, next) = bounds(&self.conn)?;
        if first >= next {
            return Err(QueueError::Empty);
        }
        Ok(QueueRecord {
            key: first,
            payload: entry(&self.conn, first)?,
        })
    }

    fn remove_first(&mut self) -> Result<SeqKey, QueueError> {
        let tx = self.conn.transaction()?;
        let (first, next) = bounds(&tx)?;
        if first >= next {
            return Err(QueueError::Empty);
        }
        tx.execute("DELETE FROM queue WHERE key = ?1", params![first.to_string()])?;
        write_counter(&tx, FIRST_KEY, first + 1)?;
        tx.commit()?;
        debug!(key = first, "removed head record");
        Ok(first)
    }

    fn count(&self) -> PersistResult<u64> {
        let (first, next) = bounds(&self.conn)?;
        Ok(next.saturating_sub(first))
    }
}

fn bounds(conn: &Connection) -> PersistResult<(SeqKey, SeqKey)> {
    Ok((read_counter(conn, FIRST_KEY)?, read_counter(conn, NEXT_KEY)?))
}

fn read_counter(conn: &Connection, name: &str) -> PersistResult<SeqKey> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM queue WHERE key = ?1", params![name], |row| row.get(0))
        .optional()?;
    let raw = raw.ok_or_else(|| PersistError::Message(format!("queue counter {name} missing")))?;
    raw.parse().map_err(|_| {
        PersistError::Message(format!("queue counter {name} is not a number: {raw:?}"))
    })
}

fn write_counter(tx: &Transaction<'_>, name: &str, value: SeqKey) -> PersistResult<()> {
    tx.execute(
        "UPDATE queue SET value = ?2 WHERE key = ?1",
        params![name, value.to_string()],
    )?;
    Ok(())
}

fn entry(conn: &Connection, key: SeqKey) -> PersistResult<String> {
    conn.query_row(
        "SELECT value FROM queue WHERE key = ?1",
        params![key.to_string()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| PersistError::Message(format!("queue entry {key} missing")))
}
