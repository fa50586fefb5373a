//! Pure ledger computation: mirrored appends, the weekly quota window, and
//! the derived ranking. No I/O lives here; persistence wraps these
//! functions in the store crate.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};

use crate::domain::{Ledgers, PraiseEntry, UserId};

/// Start of the quota window: the most recent Monday at 00:00:00 local
/// time at or before `now`. Recomputed from wall-clock time on every
/// query, never cached.
pub fn week_start(now: NaiveDateTime) -> NaiveDateTime {
    let monday = now.date() - Duration::days(i64::from(now.weekday().num_days_from_monday()));
    monday.and_time(NaiveTime::MIN)
}

/// Appends the praise to both sides of the edge: once to the recipient's
/// `received` list and once to the giver's `given` list, sharing the same
/// message and timestamp. Quota enforcement is the caller's concern;
/// calling twice appends twice.
pub fn record_praise(
    ledgers: &mut Ledgers,
    from: &UserId,
    to: &UserId,
    message: &str,
    now: NaiveDateTime,
) {
    ledgers.entry(to.clone()).or_default().received.push(PraiseEntry {
        counterpart: from.clone(),
        message: message.to_owned(),
        timestamp: now,
    });
    ledgers.entry(from.clone()).or_default().given.push(PraiseEntry {
        counterpart: to.clone(),
        message: message.to_owned(),
        timestamp: now,
    });
}

/// Number of praises `user` has given at or after the current week start.
/// Absent user counts as zero; the lookup never materializes an entry.
pub fn weekly_given_count(ledgers: &Ledgers, user: &UserId, now: NaiveDateTime) -> usize {
    let Some(ledger) = ledgers.get(user) else {
        return 0;
    };
    let start = week_start(now);
    ledger.given.iter().filter(|praise| praise.timestamp >= start).count()
}

/// Lifetime count of praises `user` has received. Absent user counts as
/// zero.
pub fn total_received_count(ledgers: &Ledgers, user: &UserId) -> usize {
    ledgers.get(user).map(|ledger| ledger.received.len()).unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankingRow {
    pub user: UserId,
    pub received: usize,
    pub given: usize,
    pub total: usize,
}

/// Derives the standings. The universe is the union of ledger owners with
/// any entries and every counterpart appearing in any entry, so a user who
/// has only ever been praised still ranks even without a ledger key of
/// their own. Sorted descending by total (received + given); ties break by
/// ascending user id so the order is deterministic.
pub fn ranking(ledgers: &Ledgers) -> Vec<RankingRow> {
    let mut universe = BTreeSet::new();
    for (user, ledger) in ledgers {
        if !ledger.is_empty() {
            universe.insert(user.clone());
        }
        for praise in ledger.given.iter().chain(ledger.received.iter()) {
            universe.insert(praise.counterpart.clone());
        }
    }

    let mut rows: Vec<RankingRow> = universe
        .into_iter()
        .map(|user| {
            let (received, given) = ledgers
                .get(&user)
                .map(|ledger| (ledger.received.len(), ledger.given.len()))
                .unwrap_or((0, 0));
            RankingRow { user, received, given, total: received + given }
        })
        .collect();

    rows.sort_by(|left, right| {
        right.total.cmp(&left.total).then_with(|| left.user.cmp(&right.user))
    });
    rows
}
