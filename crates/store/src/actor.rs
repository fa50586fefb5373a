//! Single-writer ownership of the snapshot store.
//!
//! One task owns the `SnapshotStore` and drains a command channel, so
//! in-process ledger operations can never interleave their reload/write
//! cycles. Each operation still reloads from disk, so snapshots replaced
//! by external processes between commands are picked up.

use chrono::NaiveDateTime;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use kudos_core::ledger::RankingRow;
use kudos_core::UserId;

use crate::store::{RecordOutcome, SnapshotStore};

const COMMAND_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("ledger store task is no longer running")]
pub struct LedgerClosed;

enum Command {
    WeeklyGivenCount {
        user: UserId,
        now: NaiveDateTime,
        reply: oneshot::Sender<usize>,
    },
    RecordPraise {
        from: UserId,
        to: UserId,
        message: String,
        now: NaiveDateTime,
        reply: oneshot::Sender<RecordOutcome>,
    },
    TotalReceivedCount {
        user: UserId,
        reply: oneshot::Sender<usize>,
    },
    Ranking {
        reply: oneshot::Sender<Vec<RankingRow>>,
    },
}

/// Cloneable handle to the owning task. All methods fail with
/// `LedgerClosed` once the task has stopped; they never panic.
#[derive(Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<Command>,
}

impl LedgerHandle {
    /// Spawns the owning task on the current runtime.
    pub fn spawn(store: SnapshotStore) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(store, receiver));
        Self { commands }
    }

    pub async fn weekly_given_count(
        &self,
        user: UserId,
        now: NaiveDateTime,
    ) -> Result<usize, LedgerClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::WeeklyGivenCount { user, now, reply })
            .await
            .map_err(|_| LedgerClosed)?;
        response.await.map_err(|_| LedgerClosed)
    }

    pub async fn record_praise(
        &self,
        from: UserId,
        to: UserId,
        message: String,
        now: NaiveDateTime,
    ) -> Result<RecordOutcome, LedgerClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::RecordPraise { from, to, message, now, reply })
            .await
            .map_err(|_| LedgerClosed)?;
        response.await.map_err(|_| LedgerClosed)
    }

    pub async fn total_received_count(&self, user: UserId) -> Result<usize, LedgerClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::TotalReceivedCount { user, reply })
            .await
            .map_err(|_| LedgerClosed)?;
        response.await.map_err(|_| LedgerClosed)
    }

    pub async fn ranking(&self) -> Result<Vec<RankingRow>, LedgerClosed> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::Ranking { reply }).await.map_err(|_| LedgerClosed)?;
        response.await.map_err(|_| LedgerClosed)
    }
}

async fn run(store: SnapshotStore, mut commands: mpsc::Receiver<Command>) {
    info!(
        event_name = "store.ledger.task_started",
        path = %store.path().display(),
        "ledger store task started"
    );

    while let Some(command) = commands.recv().await {
        match command {
            Command::WeeklyGivenCount { user, now, reply } => {
                let _ = reply.send(store.weekly_given_count(&user, now).await);
            }
            Command::RecordPraise { from, to, message, now, reply } => {
                let _ = reply.send(store.record_praise(&from, &to, &message, now).await);
            }
            Command::TotalReceivedCount { user, reply } => {
                let _ = reply.send(store.total_received_count(&user).await);
            }
            Command::Ranking { reply } => {
                let _ = reply.send(store.ranking().await);
            }
        }
    }

    info!(event_name = "store.ledger.task_stopped", "ledger store task stopped");
}
