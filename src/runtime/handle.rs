use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::{trail::Trail, types::SeqKey};

use super::{
    events::UploadEvent,
    pump::{DrainReport, PumpError, UploadPump},
};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Pump(#[from] PumpError),
    #[error("uploader task is gone")]
    ChannelClosed,
}

impl From<crate::persist::PersistError> for RuntimeError {
    fn from(value: crate::persist::PersistError) -> Self {
        Self::Pump(PumpError::Persist(value))
    }
}

/// Cloneable handle to the uploader task.
///
/// Commands run one at a time on that task, so a drain requested while another
/// is in flight waits for it instead of uploading the same head twice.
#[derive(Clone)]
pub struct UploaderHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<UploadEvent>,
}

enum Command {
    Enqueue {
        payload: String,
        resp: oneshot::Sender<Result<SeqKey, RuntimeError>>,
    },
    Drain {
        resp: oneshot::Sender<Result<DrainReport, RuntimeError>>,
    },
    Pending {
        resp: oneshot::Sender<Result<u64, RuntimeError>>,
    },
    DiscardHead {
        resp: oneshot::Sender<Result<Option<SeqKey>, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

pub fn spawn_uploader(pump: UploadPump) -> UploaderHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(64);
    let events_tx = pump.events();

    tokio::spawn(async move {
        let mut pump = pump;
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &mut pump).await {
                break;
            }
        }
        debug!("uploader task stopped");
    });

    UploaderHandle { cmd_tx, events_tx }
}

impl UploaderHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events_tx.subscribe()
    }

    pub async fn enqueue(&self, payload: impl Into<String>) -> Result<SeqKey, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Enqueue {
                payload: payload.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn enqueue_trail(&self, trail: &Trail) -> Result<SeqKey, RuntimeError> {
        let payload = trail.to_json().map_err(PumpError::from)?;
        self.enqueue(payload).await
    }

    pub async fn drain(&self) -> Result<DrainReport, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Drain { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn pending(&self) -> Result<u64, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Pending { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn discard_head(&self) -> Result<Option<SeqKey>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::DiscardHead { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

async fn handle_command(cmd: Command, pump: &mut UploadPump) -> bool {
    match cmd {
        Command::Enqueue { payload, resp } => {
            let _ = resp.send(pump.enqueue(&payload).map_err(RuntimeError::from));
        }
        Command::Drain { resp } => {
            let _ = resp.send(pump.drain().await.map_err(RuntimeError::from));
        }
        Command::Pending { resp } => {
            let _ = resp.send(pump.pending().map_err(RuntimeError::from));
        }
        Command::DiscardHead { resp } => {
            let _ = resp.send(pump.discard_head().map_err(RuntimeError::from));
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}
