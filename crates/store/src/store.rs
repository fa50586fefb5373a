use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{error, warn};

use kudos_core::ledger::{self, RankingRow};
use kudos_core::{Ledgers, UserId};

use crate::snapshot::{read_snapshot, write_snapshot, StorageError};

/// Outcome of a praise append. `persisted` is false when the in-memory
/// mutation succeeded but the snapshot write failed; the praise then
/// survives only until the next reload and the caller is expected to warn
/// the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The recipient's lifetime received count, including this praise.
    pub recipient_received_total: usize,
    pub persisted: bool,
}

/// Ledger operations over one snapshot path. Every operation reloads the
/// snapshot before computing, so writes by external processes between
/// operations are picked up, and writes the whole document back after a
/// mutation.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot, failing open: a corrupt or unreadable file
    /// degrades to "no history" instead of taking the bot down.
    pub async fn load(&self) -> Ledgers {
        match read_snapshot(&self.path).await {
            Ok(ledgers) => ledgers,
            Err(error) => {
                error!(
                    event_name = "store.snapshot.load_failed",
                    path = %self.path.display(),
                    error = %error,
                    "snapshot unreadable; continuing with empty ledgers"
                );
                Ledgers::new()
            }
        }
    }

    /// Like `load` but surfaces the failure; used by readiness checks that
    /// must distinguish "empty" from "broken".
    pub async fn try_load(&self) -> Result<Ledgers, StorageError> {
        read_snapshot(&self.path).await
    }

    /// Whole-file replacement of the snapshot. Persistence is best effort:
    /// a failure is logged and reported as `false`, never propagated.
    pub async fn save(&self, ledgers: &Ledgers) -> bool {
        match write_snapshot(&self.path, ledgers).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "store.snapshot.save_failed",
                    path = %self.path.display(),
                    error = %error,
                    "snapshot write failed; latest mutation is unpersisted"
                );
                false
            }
        }
    }

    /// Praises `user` has given since the most recent Monday 00:00 local
    /// time relative to `now`. Absent user counts as zero.
    pub async fn weekly_given_count(&self, user: &UserId, now: NaiveDateTime) -> usize {
        let ledgers = self.load().await;
        ledger::weekly_given_count(&ledgers, user, now)
    }

    /// Appends the mirrored praise entries and persists. No quota check
    /// happens here; that gate belongs to the command orchestrator.
    pub async fn record_praise(
        &self,
        from: &UserId,
        to: &UserId,
        message: &str,
        now: NaiveDateTime,
    ) -> RecordOutcome {
        let mut ledgers = self.load().await;
        ledger::record_praise(&mut ledgers, from, to, message, now);
        let recipient_received_total = ledger::total_received_count(&ledgers, to);
        let persisted = self.save(&ledgers).await;
        RecordOutcome { recipient_received_total, persisted }
    }

    pub async fn total_received_count(&self, user: &UserId) -> usize {
        let ledgers = self.load().await;
        ledger::total_received_count(&ledgers, user)
    }

    pub async fn ranking(&self) -> Vec<RankingRow> {
        let ledgers = self.load().await;
        ledger::ranking(&ledgers)
    }
}
