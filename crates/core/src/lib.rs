pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;

pub use domain::{Ledgers, PraiseEntry, UserId, UserLedger};
pub use errors::ValidationError;
pub use ledger::{ranking, record_praise, total_received_count, week_start, weekly_given_count, RankingRow};
