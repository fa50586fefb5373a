use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use tokio::time::sleep;
use tracing::info;

use kudos_core::config::LeaderboardConfig;
use kudos_slack::service::PraiseService;

/// Spawns the recurring standings broadcast: every `schedule_days` days at
/// `post_time` local time. The broadcast itself never fails the task; it
/// logs and waits for the next slot.
pub fn spawn(service: Arc<PraiseService>, config: LeaderboardConfig) {
    tokio::spawn(async move {
        loop {
            let delay = delay_until_next_post(
                Local::now().naive_local(),
                config.schedule_days,
                config.post_time_of_day(),
            );
            info!(
                event_name = "leaderboard.scheduled",
                delay_secs = delay.as_secs(),
                channel_name = %config.channel_name,
                "next standings broadcast scheduled"
            );
            sleep(delay).await;
            service.broadcast_leaderboard(&config.channel_name).await;
        }
    });
}

/// The next firing is `schedule_days` from now, pinned to `post_time`
/// local wall-clock time.
fn delay_until_next_post(
    now: NaiveDateTime,
    schedule_days: u32,
    post_time: NaiveTime,
) -> Duration {
    let next = (now.date() + ChronoDuration::days(i64::from(schedule_days))).and_time(post_time);
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}
