//! The command orchestrator: validates praise requests, gates them on the
//! weekly quota, drives the ledger store, and dispatches notifications.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tracing::{error, info, warn};

use kudos_core::{UserId, ValidationError};
use kudos_store::LedgerHandle;

use crate::api::{ChatClient, DirectoryClient};
use crate::blocks::{self, MessageTemplate};
use crate::commands::{CommandContext, CommandRouteError, PraiseCommandService};
use crate::mentions::{self, ResolvedMention};

pub struct PraiseService {
    ledger: LedgerHandle,
    directory: Arc<dyn DirectoryClient>,
    chat: Arc<dyn ChatClient>,
    weekly_limit: u32,
}

impl PraiseService {
    pub fn new(
        ledger: LedgerHandle,
        directory: Arc<dyn DirectoryClient>,
        chat: Arc<dyn ChatClient>,
        weekly_limit: u32,
    ) -> Self {
        Self { ledger, directory, chat, weekly_limit }
    }

    /// Records one praise per mention and posts one notification each to
    /// the originating channel. The quota was already checked against the
    /// store once for this invocation; inside the loop it is only
    /// decremented in memory. The `given >= remaining` guard re-bounds the
    /// loop against concurrent requests from the same user racing the
    /// reload.
    async fn deliver_praises(
        &self,
        requester: &UserId,
        mentions: &[ResolvedMention],
        message: &str,
        ctx: &CommandContext,
        remaining: u32,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        let now = Local::now().naive_local();
        let mut given_this_call = 0u32;

        for mention in mentions {
            if mention.user_id == *requester {
                info!(
                    event_name = "praise.self_mention.skipped",
                    user_id = %requester,
                    correlation_id = %ctx.request_id,
                    "self-mention skipped without consuming quota"
                );
                continue;
            }

            if given_this_call >= remaining {
                warn!(
                    event_name = "praise.quota.partial_stop",
                    user_id = %requester,
                    correlation_id = %ctx.request_id,
                    recorded = given_this_call,
                    "quota exhausted mid-loop; remaining mentions dropped"
                );
                return Ok(Some(blocks::partial_limit_notice()));
            }

            let outcome = self
                .ledger
                .record_praise(
                    requester.clone(),
                    mention.user_id.clone(),
                    message.to_owned(),
                    now,
                )
                .await
                .map_err(|error| CommandRouteError::Service(error.to_string()))?;
            given_this_call += 1;

            info!(
                event_name = "praise.recorded",
                from_user = %requester,
                to_user = %mention.user_id,
                recipient_total = outcome.recipient_received_total,
                persisted = outcome.persisted,
                correlation_id = %ctx.request_id,
                "praise recorded"
            );

            let notification = blocks::praise_notification(
                requester.as_str(),
                &mention.mention,
                message,
                outcome.recipient_received_total,
                remaining - given_this_call,
                outcome.persisted,
            );

            // Recorded praises are not rolled back when a later
            // notification in the same batch fails.
            self.chat.post_message(&ctx.channel_id, &notification).await.map_err(|error| {
                error!(
                    event_name = "praise.notification.failed",
                    channel_id = %ctx.channel_id,
                    correlation_id = %ctx.request_id,
                    error = %error,
                    "notification delivery failed; aborting command"
                );
                CommandRouteError::Service(error.to_string())
            })?;
        }

        Ok(None)
    }

    /// Ranking rows whose user still resolves in the directory; a failed
    /// lookup drops that row rather than failing the standings, since the
    /// ledger reads already succeeded.
    async fn visible_rows(
        &self,
        rows: Vec<kudos_core::ledger::RankingRow>,
    ) -> Vec<kudos_core::ledger::RankingRow> {
        let mut visible = Vec::with_capacity(rows.len());
        for row in rows {
            match self.directory.lookup_user(row.user.as_str()).await {
                Ok(_) => visible.push(row),
                Err(error) => warn!(
                    event_name = "standings.lookup_failed",
                    user_id = %row.user,
                    error = %error,
                    "skipping standings row for unresolvable user"
                ),
            }
        }
        visible
    }

    /// Resolves the broadcast channel by name and posts the standings.
    /// Every failure path logs and returns; the scheduled broadcast must
    /// never take the bot down.
    pub async fn broadcast_leaderboard(&self, channel_name: &str) {
        let channels = match self.chat.list_channels().await {
            Ok(channels) => channels,
            Err(error) => {
                error!(
                    event_name = "leaderboard.channel_listing_failed",
                    error = %error,
                    "could not list channels for the standings broadcast"
                );
                return;
            }
        };

        let Some(channel) = channels.into_iter().find(|channel| channel.name == channel_name)
        else {
            warn!(
                event_name = "leaderboard.channel_missing",
                channel_name,
                "broadcast channel not found; skipping standings post"
            );
            return;
        };

        let rows = match self.ledger.ranking().await {
            Ok(rows) => rows,
            Err(error) => {
                error!(
                    event_name = "leaderboard.ranking_failed",
                    error = %error,
                    "ledger store unavailable for the standings broadcast"
                );
                return;
            }
        };
        let visible = self.visible_rows(rows).await;
        let message = blocks::standings_message(&visible);

        match self.chat.post_message(&channel.id, &message).await {
            Ok(()) => info!(
                event_name = "leaderboard.posted",
                channel_id = %channel.id,
                channel_name,
                entries = visible.len(),
                "standings broadcast posted"
            ),
            Err(error) => error!(
                event_name = "leaderboard.post_failed",
                channel_id = %channel.id,
                error = %error,
                "standings broadcast failed"
            ),
        }
    }
}

#[async_trait]
impl PraiseCommandService for PraiseService {
    async fn praise(
        &self,
        text: &str,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        let requester = UserId(ctx.user_id.clone());

        if text.is_empty() {
            return Ok(Some(blocks::rejection_message(&ValidationError::EmptyCommand)));
        }

        let mentions = mentions::parse_mentions(text, self.directory.as_ref()).await;
        let Some(last_mention) = mentions.last() else {
            return Ok(Some(blocks::rejection_message(&ValidationError::NoResolvableMentions)));
        };

        let now = Local::now().naive_local();
        let used = self
            .ledger
            .weekly_given_count(requester.clone(), now)
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;
        let used = u32::try_from(used).unwrap_or(u32::MAX);

        info!(
            event_name = "praise.quota.checked",
            user_id = %requester,
            used,
            limit = self.weekly_limit,
            correlation_id = %ctx.request_id,
            "weekly quota recomputed"
        );

        if used >= self.weekly_limit {
            return Ok(Some(blocks::rejection_message(&ValidationError::WeeklyLimitReached {
                limit: self.weekly_limit,
                used,
            })));
        }
        let remaining = self.weekly_limit - used;

        // All-or-nothing gate: a request naming more people than the quota
        // allows records nothing.
        if mentions.len() > remaining as usize {
            return Ok(Some(blocks::rejection_message(&ValidationError::TooManyMentions {
                requested: mentions.len(),
                remaining,
            })));
        }

        let message = mentions::praise_message(text, last_mention.end);
        if message.is_empty() {
            return Ok(Some(blocks::rejection_message(&ValidationError::EmptyMessage)));
        }

        self.deliver_praises(&requester, &mentions, message, ctx, remaining).await
    }

    async fn stats(
        &self,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandRouteError> {
        let rows = self
            .ledger
            .ranking()
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;
        let visible = self.visible_rows(rows).await;
        Ok(Some(blocks::standings_message(&visible)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::PraiseService;
    use crate::api::{
        ChannelInfo, ChatClient, CollaboratorError, DirectoryClient, MemberRecord, UserInfo,
    };
    use crate::blocks::MessageTemplate;
    use crate::commands::{CommandContext, PraiseCommandService};
    use kudos_core::UserId;
    use kudos_store::{LedgerHandle, SnapshotStore};

    struct FakeDirectory {
        members: Vec<MemberRecord>,
        unresolvable: Vec<String>,
    }

    impl FakeDirectory {
        fn with_ids(ids: &[&str]) -> Self {
            let members = ids
                .iter()
                .map(|id| MemberRecord { id: (*id).to_owned(), ..MemberRecord::default() })
                .collect();
            Self { members, unresolvable: Vec::new() }
        }
    }

    #[async_trait]
    impl DirectoryClient for FakeDirectory {
        async fn lookup_user(&self, user_id: &str) -> Result<UserInfo, CollaboratorError> {
            if self.unresolvable.iter().any(|gone| gone == user_id)
                || !self.members.iter().any(|member| member.id == user_id)
            {
                return Err(CollaboratorError::Directory(format!("no such user {user_id}")));
            }
            Ok(UserInfo {
                id: user_id.to_owned(),
                active: true,
                display_name: user_id.to_owned(),
            })
        }

        async fn list_users(&self) -> Result<Vec<MemberRecord>, CollaboratorError> {
            Ok(self.members.clone())
        }
    }

    #[derive(Default)]
    struct RecordingChat {
        posts: Mutex<Vec<(String, MessageTemplate)>>,
        channels: Vec<ChannelInfo>,
        fail_posts: bool,
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn post_message(
            &self,
            channel_id: &str,
            message: &MessageTemplate,
        ) -> Result<(), CollaboratorError> {
            if self.fail_posts {
                return Err(CollaboratorError::Messaging("chat offline".to_owned()));
            }
            self.posts.lock().expect("lock").push((channel_id.to_owned(), message.clone()));
            Ok(())
        }

        async fn list_channels(&self) -> Result<Vec<ChannelInfo>, CollaboratorError> {
            Ok(self.channels.clone())
        }
    }

    struct Fixture {
        service: PraiseService,
        ledger: LedgerHandle,
        chat: Arc<RecordingChat>,
        _dir: TempDir,
    }

    fn fixture_with(directory: FakeDirectory, chat: RecordingChat, limit: u32) -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        let ledger = LedgerHandle::spawn(SnapshotStore::new(dir.path().join("kudos_data.json")));
        let chat = Arc::new(chat);
        let service = PraiseService::new(
            ledger.clone(),
            Arc::new(directory),
            chat.clone(),
            limit,
        );
        Fixture { service, ledger, chat, _dir: dir }
    }

    fn fixture(ids: &[&str], limit: u32) -> Fixture {
        fixture_with(FakeDirectory::with_ids(ids), RecordingChat::default(), limit)
    }

    fn ctx() -> CommandContext {
        CommandContext {
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            request_id: "req-1".to_owned(),
        }
    }

    fn now() -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    #[tokio::test]
    async fn single_praise_records_and_notifies_the_channel() {
        let fixture = fixture(&["U1", "U2"], 3);

        let reply = fixture.service.praise("<@U2> great work", &ctx()).await.expect("praise");
        assert!(reply.is_none(), "notifications replace the direct reply");

        let posts = fixture.chat.posts.lock().expect("lock");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, "C1");
        assert!(posts[0].1.fallback_text.contains("<@U1>"));
        assert!(posts[0].1.fallback_text.contains("great work"));
        drop(posts);

        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U1"), now()).await.expect("count"),
            1
        );
        assert_eq!(
            fixture.ledger.total_received_count(UserId::from("U2")).await.expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn empty_text_and_unresolvable_mentions_reject_without_recording() {
        let fixture = fixture(&["U1", "U2"], 3);

        let reply = fixture.service.praise("", &ctx()).await.expect("praise");
        assert!(reply.expect("usage reply").fallback_text.contains("mention one or more people"));

        let reply = fixture.service.praise("just words, no mentions", &ctx()).await.expect("praise");
        assert!(reply.expect("rejection").fallback_text.contains("valid users"));

        assert!(fixture.chat.posts.lock().expect("lock").is_empty());
        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U1"), now()).await.expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn empty_message_after_mentions_rejects_without_recording() {
        let fixture = fixture(&["U1", "U2"], 3);

        let reply = fixture.service.praise("<@U2>", &ctx()).await.expect("praise");
        assert!(reply.expect("rejection").fallback_text.contains("praise message"));
        assert_eq!(
            fixture.ledger.total_received_count(UserId::from("U2")).await.expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn quota_boundary_rejects_at_limit_and_allows_one_below() {
        let fixture = fixture(&["U1", "U2", "U3", "U4"], 3);

        // Use up two of three praises.
        fixture.service.praise("<@U2> one", &ctx()).await.expect("praise");
        fixture.service.praise("<@U3> two", &ctx()).await.expect("praise");

        // Two mentions exceed the single remaining praise: whole request
        // rejected, nothing recorded.
        let reply = fixture.service.praise("<@U2> <@U4> both", &ctx()).await.expect("praise");
        assert!(reply.expect("rejection").fallback_text.contains("1 more praise(s)"));
        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U1"), now()).await.expect("count"),
            2
        );

        // One mention fits exactly.
        let reply = fixture.service.praise("<@U4> three", &ctx()).await.expect("praise");
        assert!(reply.is_none());

        // The next attempt is over the limit.
        let reply = fixture.service.praise("<@U2> four", &ctx()).await.expect("praise");
        assert!(reply.expect("rejection").fallback_text.contains("weekly limit of 3"));
        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U1"), now()).await.expect("count"),
            3
        );
    }

    #[tokio::test]
    async fn full_quota_batch_is_recorded_and_a_fourth_mention_rejects_the_request() {
        let fixture = fixture(&["U1", "U2", "U3", "U4", "U5"], 3);

        let reply = fixture
            .service
            .praise("<@U2> <@U3> <@U4> shipped it together", &ctx())
            .await
            .expect("praise");
        assert!(reply.is_none());
        assert_eq!(fixture.chat.posts.lock().expect("lock").len(), 3);
        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U1"), now()).await.expect("count"),
            3
        );

        // Fresh requester with four mentions: rejected pre-loop.
        let four = CommandContext { user_id: "U5".to_owned(), ..ctx() };
        let reply = fixture
            .service
            .praise("<@U1> <@U2> <@U3> <@U4> everyone", &four)
            .await
            .expect("praise");
        assert!(reply.expect("rejection").fallback_text.contains("3 more praise(s)"));
        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U5"), now()).await.expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn self_mentions_are_skipped_without_consuming_quota() {
        let fixture = fixture(&["U1", "U2"], 3);

        let reply =
            fixture.service.praise("<@U1> <@U2> team effort", &ctx()).await.expect("praise");
        assert!(reply.is_none());

        // Only the praise to U2 was recorded and announced.
        assert_eq!(fixture.chat.posts.lock().expect("lock").len(), 1);
        assert_eq!(
            fixture.ledger.weekly_given_count(UserId::from("U1"), now()).await.expect("count"),
            1
        );
        assert_eq!(
            fixture.ledger.total_received_count(UserId::from("U1")).await.expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn notification_failure_aborts_without_rolling_back_the_record() {
        let chat = RecordingChat { fail_posts: true, ..RecordingChat::default() };
        let fixture = fixture_with(FakeDirectory::with_ids(&["U1", "U2"]), chat, 3);

        let result = fixture.service.praise("<@U2> great work", &ctx()).await;
        assert!(result.is_err(), "collaborator failure aborts the command");

        // The praise recorded before the failed notification stays.
        assert_eq!(
            fixture.ledger.total_received_count(UserId::from("U2")).await.expect("count"),
            1
        );
    }

    #[tokio::test]
    async fn stats_renders_rows_and_skips_unresolvable_users() {
        let mut directory = FakeDirectory::with_ids(&["U1", "U2", "U3"]);
        directory.unresolvable.push("U3".to_owned());
        let fixture = fixture_with(directory, RecordingChat::default(), 3);

        fixture.service.praise("<@U2> nice", &ctx()).await.expect("praise");
        let ghost = CommandContext { user_id: "U3".to_owned(), ..ctx() };
        fixture.service.praise("<@U2> also nice", &ghost).await.expect("praise");

        let reply = fixture.service.stats(&ctx()).await.expect("stats").expect("standings");
        let rendered = serde_json::to_string(&reply).expect("serialize");
        assert!(rendered.contains("<@U2>: 2 received + 0 given = 2 total"));
        assert!(rendered.contains("<@U1>: 0 received + 1 given = 1 total"));
        // U3 gave a praise but no longer resolves in the directory.
        assert!(!rendered.contains("<@U3>"));
    }

    #[tokio::test]
    async fn stats_on_an_empty_ledger_renders_the_sentinel() {
        let fixture = fixture(&["U1"], 3);
        let reply = fixture.service.stats(&ctx()).await.expect("stats").expect("standings");
        assert!(reply.fallback_text.contains("statistics of praises"));
        let rendered = serde_json::to_string(&reply).expect("serialize");
        assert!(rendered.contains("No praises have been given yet"));
    }

    #[tokio::test]
    async fn broadcast_posts_standings_to_the_named_channel() {
        let chat = RecordingChat {
            channels: vec![
                ChannelInfo { id: "C7".to_owned(), name: "random".to_owned() },
                ChannelInfo { id: "C9".to_owned(), name: "general".to_owned() },
            ],
            ..RecordingChat::default()
        };
        let fixture = fixture_with(FakeDirectory::with_ids(&["U1", "U2"]), chat, 3);

        fixture.service.praise("<@U2> nice", &ctx()).await.expect("praise");
        fixture.service.broadcast_leaderboard("general").await;

        let posts = fixture.chat.posts.lock().expect("lock");
        let broadcast = posts.last().expect("broadcast post");
        assert_eq!(broadcast.0, "C9");
        assert!(broadcast.1.fallback_text.contains("Current Standings"));
    }

    #[tokio::test]
    async fn broadcast_with_missing_channel_is_a_logged_no_op() {
        let fixture = fixture(&["U1", "U2"], 3);
        fixture.service.broadcast_leaderboard("general").await;
        assert!(fixture.chat.posts.lock().expect("lock").is_empty());
    }
}
