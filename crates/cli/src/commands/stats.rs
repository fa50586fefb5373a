use kudos_core::config::{AppConfig, LoadOptions};
use kudos_core::ledger;
use kudos_store::SnapshotStore;

use super::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("failed to initialize async runtime: {error}"),
            }
        }
    };

    // Fail-open like the bot: a corrupt snapshot prints as empty standings.
    let store = SnapshotStore::new(&config.storage.snapshot_path);
    let ledgers = runtime.block_on(store.load());
    let rows = ledger::ranking(&ledgers);

    let mut lines =
        vec![format!("praise standings ({})", config.storage.snapshot_path.display())];
    if rows.is_empty() {
        lines.push("no praises recorded yet".to_string());
    } else {
        for (position, row) in rows.iter().enumerate() {
            lines.push(format!(
                "{:>3}. {}: {} received + {} given = {} total",
                position + 1,
                row.user,
                row.received,
                row.given,
                row.total
            ));
        }
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}
