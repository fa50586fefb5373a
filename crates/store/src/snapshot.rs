//! JSON snapshot codec.
//!
//! Document shape: a top-level map from user id to
//! `{received: [{from_user, message, timestamp}], given: [{to_user,
//! message, timestamp}]}`. Timestamps are ISO-8601 local wall-clock time
//! without an offset. Users whose two lists are both empty are never
//! written and are dropped on read, so "absent" and "empty" stay
//! equivalent across round-trips.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use kudos_core::{Ledgers, PraiseEntry, UserId, UserLedger};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("could not read snapshot `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse snapshot `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("could not serialize snapshot for `{path}`: {source}")]
    Serialize { path: PathBuf, source: serde_json::Error },
    #[error("could not write snapshot staging file `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("could not replace snapshot `{path}`: {source}")]
    Replace { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserDocument {
    #[serde(default)]
    received: Vec<ReceivedDocument>,
    #[serde(default)]
    given: Vec<GivenDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReceivedDocument {
    from_user: String,
    message: String,
    timestamp: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct GivenDocument {
    to_user: String,
    message: String,
    timestamp: NaiveDateTime,
}

/// Reads and decodes the snapshot. A missing file is a fresh install and
/// yields empty ledgers; any other failure is surfaced for the caller to
/// fail open on.
pub async fn read_snapshot(path: &Path) -> Result<Ledgers, StorageError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Ledgers::new());
        }
        Err(source) => return Err(StorageError::Read { path: path.to_path_buf(), source }),
    };

    let document: BTreeMap<String, UserDocument> = serde_json::from_str(&raw)
        .map_err(|source| StorageError::Parse { path: path.to_path_buf(), source })?;

    Ok(from_document(document))
}

/// Encodes and replaces the snapshot as a whole: the document is written
/// to a staging file next to the target and renamed over it, so a
/// concurrent reader never observes a partial file.
pub async fn write_snapshot(path: &Path, ledgers: &Ledgers) -> Result<(), StorageError> {
    let document = to_document(ledgers);
    let payload = serde_json::to_vec_pretty(&document)
        .map_err(|source| StorageError::Serialize { path: path.to_path_buf(), source })?;

    let staging = staging_path(path);
    fs::write(&staging, &payload)
        .await
        .map_err(|source| StorageError::Write { path: staging.clone(), source })?;
    fs::rename(&staging, path)
        .await
        .map_err(|source| StorageError::Replace { path: path.to_path_buf(), source })?;

    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name =
        path.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn from_document(document: BTreeMap<String, UserDocument>) -> Ledgers {
    let mut ledgers = Ledgers::new();
    for (user_id, user) in document {
        // Entries with both lists empty are treated as not existing.
        if user.received.is_empty() && user.given.is_empty() {
            continue;
        }
        ledgers.insert(
            UserId(user_id),
            UserLedger {
                received: user
                    .received
                    .into_iter()
                    .map(|praise| PraiseEntry {
                        counterpart: UserId(praise.from_user),
                        message: praise.message,
                        timestamp: praise.timestamp,
                    })
                    .collect(),
                given: user
                    .given
                    .into_iter()
                    .map(|praise| PraiseEntry {
                        counterpart: UserId(praise.to_user),
                        message: praise.message,
                        timestamp: praise.timestamp,
                    })
                    .collect(),
            },
        );
    }
    ledgers
}

fn to_document(ledgers: &Ledgers) -> BTreeMap<&str, UserDocument> {
    ledgers
        .iter()
        .filter(|(_, ledger)| !ledger.is_empty())
        .map(|(user_id, ledger)| {
            let user = UserDocument {
                received: ledger
                    .received
                    .iter()
                    .map(|praise| ReceivedDocument {
                        from_user: praise.counterpart.0.clone(),
                        message: praise.message.clone(),
                        timestamp: praise.timestamp,
                    })
                    .collect(),
                given: ledger
                    .given
                    .iter()
                    .map(|praise| GivenDocument {
                        to_user: praise.counterpart.0.clone(),
                        message: praise.message.clone(),
                        timestamp: praise.timestamp,
                    })
                    .collect(),
            };
            (user_id.as_str(), user)
        })
        .collect()
}
