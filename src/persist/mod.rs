pub mod files;
pub mod sqlite;

use thiserror::Error;

use crate::types::SeqKey;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is empty")]
    Empty,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl From<rusqlite::Error> for QueueError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persist(PersistError::Sqlite(value))
    }
}

/// A queued payload and the key it lives under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub key: SeqKey,
    pub payload: String,
}

/// Durable FIFO of serialized trails awaiting upload.
///
/// Records occupy keys `[first_key, next_key)`. Implementations must make each
/// mutation atomic: a crash leaves either the old or the new state, never a
/// payload without its bookkeeping.
pub trait RecordQueue: Send {
    fn append(&mut self, payload: &str) -> PersistResult<SeqKey>;
    fn peek_first(&self) -> Result<QueueRecord, QueueError>;
    fn remove_first(&mut self) -> Result<SeqKey, QueueError>;
    fn count(&self) -> PersistResult<u64>;
}
