//! Durable praise ledger storage.
//!
//! The entire ledger lives in one JSON snapshot file. Every logical
//! operation reloads the snapshot from disk first (so snapshots written by
//! other processes are picked up) and writes the full document back after
//! a mutation. All in-process operations are serialized through a single
//! owning task (`actor`), so two praise recordings can never interleave
//! their reload/write cycles.
//!
//! - `snapshot` - the JSON document codec and atomic whole-file replace
//! - `store` - the reload-then-write operation set over one snapshot path
//! - `actor` - the single-writer task and its cloneable handle

pub mod actor;
pub mod snapshot;
pub mod store;

pub use actor::{LedgerClosed, LedgerHandle};
pub use snapshot::StorageError;
pub use store::{RecordOutcome, SnapshotStore};
