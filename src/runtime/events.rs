//! Upload runtime event stream payloads.

use crate::types::SeqKey;

use super::pump::{UploadAck, UploadError};

/// Events emitted by the upload pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// A record was appended to the durable queue.
    Enqueued {
        /// Key the record was stored under.
        key: SeqKey,
        /// Records now pending.
        pending: u64,
    },
    /// The server acknowledged a record and it left the queue.
    Uploaded {
        /// Key of the uploaded record.
        key: SeqKey,
        /// Server acknowledgment.
        ack: UploadAck,
        /// Records still pending.
        remaining: u64,
    },
    /// The drain stopped at this record. Sent once per failed drain.
    UploadFailed {
        /// Key of the record left at the head.
        key: SeqKey,
        /// Last failure.
        error: UploadError,
    },
    /// The head record was dropped without upload.
    Discarded {
        /// Key of the dropped record.
        key: SeqKey,
    },
    /// The queue was emptied.
    Drained {
        /// Records left after the drain.
        remaining: u64,
    },
}
